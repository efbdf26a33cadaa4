/*!
Backend abstraction.

One implementation per native windowing system. Core code (the facade and
the z-order controller) only talks to this trait, never to platform types.

Every per-window method fails with [`WinctlError::InvalidHandle`] once the
window is gone and with [`WinctlError::Unsupported`] when the backend has no
way to perform the operation at all.
*/

use crate::types::{
  AlertState, AppRef, BackendKind, Capabilities, FrameExtents, Point, Rect, Screen, WindowRef,
  WindowState, WinctlError, WinctlResult, ZOrderMode,
};

/// Primitive window operations for one windowing system.
///
/// Implementations are shared between the caller's thread and every
/// enforcement thread, so all methods take `&self`.
pub trait Backend: Send + Sync + 'static {
  fn kind(&self) -> BackendKind;

  fn capabilities(&self) -> Capabilities;

  /// Every top-level application window. Front to back when
  /// [`Capabilities::provides_stack_order`] is set.
  fn all_windows(&self) -> WinctlResult<Vec<WindowRef>>;

  fn all_apps(&self) -> WinctlResult<Vec<AppRef>>;

  fn windows_of_app(&self, app: &AppRef) -> WinctlResult<Vec<WindowRef>> {
    Ok(
      self
        .all_windows()?
        .into_iter()
        .filter(|w| w.process_id == Some(app.process_id))
        .collect(),
    )
  }

  /// Foreground (focused) window, if any.
  fn active_window(&self) -> WinctlResult<Option<WindowRef>>;

  /// Topmost window containing `point`.
  ///
  /// The default walks the stack front to back. Backends without a stack
  /// order refuse instead of guessing.
  fn window_at(&self, point: Point) -> WinctlResult<Option<WindowRef>> {
    if !self.capabilities().provides_stack_order {
      return Err(WinctlError::unsupported(self.kind(), "window_at"));
    }
    for window in self.all_windows()? {
      match self.rect(&window) {
        Ok(rect) if rect.contains(point) => return Ok(Some(window)),
        Ok(_) | Err(WinctlError::InvalidHandle(_)) => {}
        Err(e) => return Err(e),
      }
    }
    Ok(None)
  }

  fn is_alive(&self, window: &WindowRef) -> bool;

  /// Current title, read from the OS.
  fn title(&self, window: &WindowRef) -> WinctlResult<String>;

  /// Application owning the window.
  fn app_of(&self, window: &WindowRef) -> WinctlResult<AppRef>;

  /// Screen rect. Minimized windows report their last restored geometry.
  fn rect(&self, window: &WindowRef) -> WinctlResult<Rect>;

  fn set_rect(&self, window: &WindowRef, rect: Rect) -> WinctlResult<()>;

  /// Screen rect of the area inside the window decorations.
  fn client_rect(&self, window: &WindowRef) -> WinctlResult<Rect>;

  /// Decorations around the client area. Defaults to the difference between
  /// [`rect`](Backend::rect) and [`client_rect`](Backend::client_rect).
  fn frame_extents(&self, window: &WindowRef) -> WinctlResult<FrameExtents> {
    Ok(FrameExtents::between(
      self.rect(window)?,
      self.client_rect(window)?,
    ))
  }

  /// Every attached display.
  fn screens(&self) -> WinctlResult<Vec<Screen>>;

  /// Pointer position in desktop coordinates.
  fn cursor_position(&self) -> WinctlResult<Point>;

  fn state(&self, window: &WindowRef) -> WinctlResult<WindowState>;

  fn set_visible(&self, window: &WindowRef, visible: bool) -> WinctlResult<()>;

  fn minimize(&self, window: &WindowRef) -> WinctlResult<()>;

  fn maximize(&self, window: &WindowRef) -> WinctlResult<()>;

  fn restore(&self, window: &WindowRef) -> WinctlResult<()>;

  /// Ask the window to close. The owning app may refuse or prompt.
  fn close(&self, window: &WindowRef) -> WinctlResult<()>;

  /// Give the window keyboard focus and bring it forward.
  fn activate(&self, window: &WindowRef) -> WinctlResult<()>;

  /// One-shot raise above all normal windows.
  fn raise_to_top(&self, window: &WindowRef) -> WinctlResult<()>;

  /// One-shot lower below all normal windows.
  fn lower_to_bottom(&self, window: &WindowRef) -> WinctlResult<()>;

  /// One enforcement tick of a z-order assertion.
  ///
  /// Backends with a native sticky flag (Win32 `HWND_TOPMOST`, EWMH
  /// `_NET_WM_STATE_ABOVE`) set it here as well as restacking.
  fn enforce_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    match mode {
      ZOrderMode::Top => self.raise_to_top(window),
      ZOrderMode::Bottom => self.lower_to_bottom(window),
    }
  }

  /// Undo whatever sticky flag `enforce_z_order` set.
  fn release_z_order(&self, _window: &WindowRef, _mode: ZOrderMode) -> WinctlResult<()> {
    Ok(())
  }

  /// Let the window receive (or pass through) mouse and keyboard input
  /// without changing its visibility or position.
  fn set_accepts_input(&self, window: &WindowRef, accepts: bool) -> WinctlResult<()>;

  fn alert_state(&self, window: &WindowRef) -> WinctlResult<AlertState>;

  /// Alert state of a whole application. Defaults to aggregating its windows.
  fn app_alert_state(&self, app: &AppRef) -> WinctlResult<AlertState> {
    let mut states = Vec::new();
    for window in self.windows_of_app(app)? {
      match self.alert_state(&window) {
        Ok(state) => states.push(state),
        Err(WinctlError::InvalidHandle(_)) => {}
        Err(e) => return Err(e),
      }
    }
    Ok(AlertState::aggregate(states))
  }
}
