/*! Error types for window operations. */

use super::{BackendKind, Rect, WindowRef};

/// Errors that can occur during window operations.
///
/// Callers can always tell apart "not available on this platform"
/// ([`Unsupported`](Self::Unsupported)), "failed this time"
/// ([`BackendTransientFailure`](Self::BackendTransientFailure)) and
/// "the window is gone" ([`InvalidHandle`](Self::InvalidHandle)).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WinctlError {
  #[error("Window {0} no longer exists")]
  InvalidHandle(WindowRef),

  #[error("Operation '{operation}' is not supported by the {backend} backend")]
  Unsupported {
    backend: BackendKind,
    operation: &'static str,
  },

  #[error("Permission denied: {0}")]
  PermissionDenied(String),

  #[error("Backend call failed (retryable): {0}")]
  BackendTransientFailure(String),

  #[error("Degenerate rect {0}: width and height must be at least 1")]
  InvalidRect(Rect),

  #[error("No windowing backend available: {0}")]
  NoBackend(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl WinctlError {
  pub const fn unsupported(backend: BackendKind, operation: &'static str) -> Self {
    Self::Unsupported { backend, operation }
  }

  pub fn transient(reason: impl Into<String>) -> Self {
    Self::BackendTransientFailure(reason.into())
  }

  /// Whether retrying the same call later may succeed.
  pub const fn is_transient(&self) -> bool {
    matches!(self, Self::BackendTransientFailure(_))
  }

  pub const fn is_invalid_handle(&self) -> bool {
    matches!(self, Self::InvalidHandle(_))
  }
}

/// Result type for window operations.
pub type WinctlResult<T> = Result<T, WinctlError>;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::WindowHandle;

  #[test]
  fn classification() {
    let gone = WinctlError::InvalidHandle(WindowRef::new(WindowHandle::X11(1), None, ""));
    assert!(gone.is_invalid_handle());
    assert!(!gone.is_transient());

    assert!(WinctlError::transient("BadAlloc").is_transient());
    assert!(!WinctlError::unsupported(BackendKind::MacOs, "send_behind").is_transient());
  }

  #[test]
  fn messages_name_the_backend_and_operation() {
    let err = WinctlError::unsupported(BackendKind::MacOs, "set_accepts_input");
    assert_eq!(
      err.to_string(),
      "Operation 'set_accepts_input' is not supported by the macOS backend"
    );
  }
}
