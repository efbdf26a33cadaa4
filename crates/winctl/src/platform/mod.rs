/*!
Platform backends.

Exactly one backend is compiled in per target OS and picked at runtime by
[`NativeBackend::detect`]:

- `win32` - Win32 / GDI via the `windows` crate
- `x11` - X11 via `x11rb` (EWMH/ICCCM hints, SHAPE extension)
- `macos` - window server list, `NSWorkspace` and `osascript`
*/

mod traits;

pub use traits::Backend;

#[cfg(target_os = "windows")]
mod win32;
#[cfg(target_os = "windows")]
pub use win32::Win32Backend;

#[cfg(target_os = "linux")]
mod x11;
#[cfg(target_os = "linux")]
pub use self::x11::X11Backend;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::MacBackend;

#[cfg(test)]
pub(crate) mod fake;

use crate::types::{
  AlertState, AppRef, BackendKind, Capabilities, FrameExtents, Point, Rect, Screen, WindowRef,
  WindowState, WinctlResult, ZOrderMode,
};

/// The backend for the running platform.
#[derive(Debug)]
pub enum NativeBackend {
  #[cfg(target_os = "windows")]
  Win32(Win32Backend),
  #[cfg(target_os = "linux")]
  X11(X11Backend),
  #[cfg(target_os = "macos")]
  MacOs(MacBackend),
}

impl NativeBackend {
  /// Connect to the windowing system of the running platform.
  ///
  /// Fails with [`NoBackend`](crate::WinctlError::NoBackend) when none is
  /// reachable (no `DISPLAY`, unsupported OS).
  pub fn detect() -> WinctlResult<Self> {
    #[cfg(target_os = "windows")]
    {
      Ok(Self::Win32(Win32Backend::new()))
    }
    #[cfg(target_os = "linux")]
    {
      X11Backend::connect().map(Self::X11)
    }
    #[cfg(target_os = "macos")]
    {
      Ok(Self::MacOs(MacBackend::new()))
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
      Err(crate::WinctlError::NoBackend(format!(
        "no windowing backend for {}",
        std::env::consts::OS
      )))
    }
  }
}

macro_rules! dispatch {
  ($self:ident, $backend:ident => $call:expr) => {
    match *$self {
      #[cfg(target_os = "windows")]
      NativeBackend::Win32(ref $backend) => $call,
      #[cfg(target_os = "linux")]
      NativeBackend::X11(ref $backend) => $call,
      #[cfg(target_os = "macos")]
      NativeBackend::MacOs(ref $backend) => $call,
    }
  };
}

impl Backend for NativeBackend {
  fn kind(&self) -> BackendKind {
    dispatch!(self, b => b.kind())
  }

  fn capabilities(&self) -> Capabilities {
    dispatch!(self, b => b.capabilities())
  }

  fn all_windows(&self) -> WinctlResult<Vec<WindowRef>> {
    dispatch!(self, b => b.all_windows())
  }

  fn all_apps(&self) -> WinctlResult<Vec<AppRef>> {
    dispatch!(self, b => b.all_apps())
  }

  fn windows_of_app(&self, app: &AppRef) -> WinctlResult<Vec<WindowRef>> {
    dispatch!(self, b => b.windows_of_app(app))
  }

  fn active_window(&self) -> WinctlResult<Option<WindowRef>> {
    dispatch!(self, b => b.active_window())
  }

  fn window_at(&self, point: Point) -> WinctlResult<Option<WindowRef>> {
    dispatch!(self, b => b.window_at(point))
  }

  fn is_alive(&self, window: &WindowRef) -> bool {
    dispatch!(self, b => b.is_alive(window))
  }

  fn title(&self, window: &WindowRef) -> WinctlResult<String> {
    dispatch!(self, b => b.title(window))
  }

  fn app_of(&self, window: &WindowRef) -> WinctlResult<AppRef> {
    dispatch!(self, b => b.app_of(window))
  }

  fn rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    dispatch!(self, b => b.rect(window))
  }

  fn set_rect(&self, window: &WindowRef, rect: Rect) -> WinctlResult<()> {
    dispatch!(self, b => b.set_rect(window, rect))
  }

  fn client_rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    dispatch!(self, b => b.client_rect(window))
  }

  fn frame_extents(&self, window: &WindowRef) -> WinctlResult<FrameExtents> {
    dispatch!(self, b => b.frame_extents(window))
  }

  fn screens(&self) -> WinctlResult<Vec<Screen>> {
    dispatch!(self, b => b.screens())
  }

  fn cursor_position(&self) -> WinctlResult<Point> {
    dispatch!(self, b => b.cursor_position())
  }

  fn state(&self, window: &WindowRef) -> WinctlResult<WindowState> {
    dispatch!(self, b => b.state(window))
  }

  fn set_visible(&self, window: &WindowRef, visible: bool) -> WinctlResult<()> {
    dispatch!(self, b => b.set_visible(window, visible))
  }

  fn minimize(&self, window: &WindowRef) -> WinctlResult<()> {
    dispatch!(self, b => b.minimize(window))
  }

  fn maximize(&self, window: &WindowRef) -> WinctlResult<()> {
    dispatch!(self, b => b.maximize(window))
  }

  fn restore(&self, window: &WindowRef) -> WinctlResult<()> {
    dispatch!(self, b => b.restore(window))
  }

  fn close(&self, window: &WindowRef) -> WinctlResult<()> {
    dispatch!(self, b => b.close(window))
  }

  fn activate(&self, window: &WindowRef) -> WinctlResult<()> {
    dispatch!(self, b => b.activate(window))
  }

  fn raise_to_top(&self, window: &WindowRef) -> WinctlResult<()> {
    dispatch!(self, b => b.raise_to_top(window))
  }

  fn lower_to_bottom(&self, window: &WindowRef) -> WinctlResult<()> {
    dispatch!(self, b => b.lower_to_bottom(window))
  }

  fn enforce_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    dispatch!(self, b => b.enforce_z_order(window, mode))
  }

  fn release_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    dispatch!(self, b => b.release_z_order(window, mode))
  }

  fn set_accepts_input(&self, window: &WindowRef, accepts: bool) -> WinctlResult<()> {
    dispatch!(self, b => b.set_accepts_input(window, accepts))
  }

  fn alert_state(&self, window: &WindowRef) -> WinctlResult<AlertState> {
    dispatch!(self, b => b.alert_state(window))
  }

  fn app_alert_state(&self, app: &AppRef) -> WinctlResult<AlertState> {
    dispatch!(self, b => b.app_alert_state(app))
  }
}
