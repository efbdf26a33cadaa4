/*! Polled window and backend state. */

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Whether a window is asking for the user's attention.
///
/// Always polled, never cached: no backend pushes this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
  /// Confirmed not alerting.
  None,
  /// Blinking taskbar button, bouncing/badged Dock tile, urgency hint.
  AttentionRequested,
  /// The backend cannot tell. Distinct from `None` so a blind spot is never
  /// mistaken for a confirmed quiet window.
  Unknown,
}

impl AlertState {
  /// Combine per-window states into one state for their application.
  pub fn aggregate(states: impl IntoIterator<Item = AlertState>) -> AlertState {
    let mut any_unknown = false;
    let mut any = false;
    for state in states {
      any = true;
      match state {
        AlertState::AttentionRequested => return AlertState::AttentionRequested,
        AlertState::Unknown => any_unknown = true,
        AlertState::None => {}
      }
    }
    if any_unknown || !any {
      AlertState::Unknown
    } else {
      AlertState::None
    }
  }
}

/// Visibility and sizing state of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct WindowState {
  /// Mapped/shown. Minimized windows still count as visible.
  pub visible: bool,
  pub minimized: bool,
  pub maximized: bool,
  /// Foreground / focused window.
  pub active: bool,
}

/// Which native windowing system a backend drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum BackendKind {
  #[display("Win32")]
  Win32,
  #[display("X11")]
  X11,
  #[display("macOS")]
  MacOs,
}

/// Per-backend capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
  /// `all_windows` is ordered front to back.
  pub provides_stack_order: bool,
  /// One-shot lower to the bottom (and so persistent bottom assertions).
  pub send_behind: bool,
  /// Input acceptance can be toggled.
  pub accepts_input: bool,
  /// Alert state can be read for background windows. When false,
  /// [`AlertState::Unknown`] is the usual answer.
  pub alert_state: bool,
  /// `set_visible` hides one window. When false it hides the whole
  /// application.
  pub per_window_visibility: bool,
  /// `client_rect` and `frame_extents` are available.
  pub client_area: bool,
}
