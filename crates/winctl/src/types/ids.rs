/*! Identity types for windows and applications.

A [`WindowRef`] is compared by its platform handle only. The cached title and
owning process ride along for display purposes and may go stale.
*/

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Operating-system process identifier.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Display,
  From,
  Into,
  Serialize,
  Deserialize,
)]
pub struct ProcessId(pub u32);

/// Backend-specific handle of one OS window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(tag = "backend", content = "id")]
pub enum WindowHandle {
  /// Win32 `HWND`, stored as its integer value.
  #[display("hwnd:{_0:#x}")]
  Win32(isize),
  /// X11 window id.
  #[display("x11:{_0:#x}")]
  X11(u32),
  /// Window-server window number (`kCGWindowNumber`).
  #[display("cg:{window_id}")]
  Mac { window_id: u32 },
}

impl WindowHandle {
  /// The handle as an unsigned integer, for display and lookup.
  #[allow(clippy::cast_sign_loss)]
  pub const fn raw(&self) -> u64 {
    match *self {
      WindowHandle::Win32(hwnd) => hwnd as usize as u64,
      WindowHandle::X11(id) | WindowHandle::Mac { window_id: id } => id as u64,
    }
  }
}

/// Reference to one top-level OS window.
///
/// Not owned by this crate: the OS may destroy the window at any time, after
/// which every operation on the reference fails with
/// [`WinctlError::InvalidHandle`](crate::WinctlError::InvalidHandle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRef {
  pub handle: WindowHandle,
  /// Owning process, when the platform exposes one.
  pub process_id: Option<ProcessId>,
  /// Title at the time the reference was produced. Use
  /// [`Winctl::title`](crate::Winctl::title) for the current one.
  pub cached_title: String,
}

impl WindowRef {
  pub fn new(handle: WindowHandle, process_id: Option<ProcessId>, title: impl Into<String>) -> Self {
    Self {
      handle,
      process_id,
      cached_title: title.into(),
    }
  }

  /// Whether a live window owned by `pid` can still be this window.
  ///
  /// Handles are recycled, so a handle that now belongs to another process
  /// is a different window. Refs without a process id cannot be checked.
  pub fn is_owned_by(&self, pid: ProcessId) -> bool {
    match self.process_id {
      Some(expected) => expected == pid,
      None => true,
    }
  }
}

impl PartialEq for WindowRef {
  fn eq(&self, other: &Self) -> bool {
    self.handle == other.handle
  }
}

impl Eq for WindowRef {}

impl Hash for WindowRef {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.handle.hash(state);
  }
}

impl std::fmt::Display for WindowRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.handle.fmt(f)
  }
}

/// Reference to one running application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRef {
  pub process_id: ProcessId,
  pub name: String,
}

impl AppRef {
  pub fn new(process_id: ProcessId, name: impl Into<String>) -> Self {
    Self {
      process_id,
      name: name.into(),
    }
  }
}

impl PartialEq for AppRef {
  fn eq(&self, other: &Self) -> bool {
    self.process_id == other.process_id
  }
}

impl Eq for AppRef {}

impl Hash for AppRef {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.process_id.hash(state);
  }
}

impl std::fmt::Display for AppRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} (pid {})", self.name, self.process_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn window_refs_compare_by_handle_only() {
    let a = WindowRef::new(WindowHandle::X11(0x40_0001), Some(ProcessId(10)), "Notepad");
    let b = WindowRef::new(WindowHandle::X11(0x40_0001), None, "Notepad - renamed");
    assert_eq!(a, b, "same handle must compare equal despite stale title");

    let mut set = HashSet::new();
    set.insert(a);
    assert!(set.contains(&b), "hash must agree with equality");
  }

  #[test]
  fn different_backends_never_collide() {
    let x11 = WindowRef::new(WindowHandle::X11(7), None, "");
    let mac = WindowRef::new(WindowHandle::Mac { window_id: 7 }, None, "");
    assert_ne!(x11, mac);
  }

  #[test]
  fn raw_round_trips_positive_hwnd() {
    assert_eq!(WindowHandle::Win32(0x1234).raw(), 0x1234);
    assert_eq!(WindowHandle::Mac { window_id: 99 }.raw(), 99);
  }

  #[test]
  fn app_refs_compare_by_pid() {
    let a = AppRef::new(ProcessId(42), "firefox");
    let b = AppRef::new(ProcessId(42), "Firefox");
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "firefox (pid 42)");
  }

  #[test]
  fn ownership_check_needs_a_known_pid() {
    let known = WindowRef::new(WindowHandle::X11(7), Some(ProcessId(10)), "");
    assert!(known.is_owned_by(ProcessId(10)));
    assert!(!known.is_owned_by(ProcessId(11)), "recycled handle");

    let unknown = WindowRef::new(WindowHandle::X11(7), None, "");
    assert!(unknown.is_owned_by(ProcessId(11)));
  }

  #[test]
  fn handle_display_is_backend_tagged() {
    assert_eq!(WindowHandle::X11(0x2a).to_string(), "x11:0x2a");
    assert_eq!(WindowHandle::Win32(0x10).to_string(), "hwnd:0x10");
    assert_eq!(WindowHandle::Mac { window_id: 5 }.to_string(), "cg:5");
  }
}
