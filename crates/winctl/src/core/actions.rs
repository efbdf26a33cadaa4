/*!
Write operations: geometry, visibility, z-order and input acceptance.

State transitions (minimize, maximize, restore, visibility) are idempotent:
the current `WindowState` is read first and no native call is made when the
window is already where the caller wants it.
*/

use super::Winctl;
use crate::platform::Backend;
use crate::types::{Point, Rect, WindowRef, WinctlError, WinctlResult, ZOrderAssertion, ZOrderMode};

impl<B: Backend> Winctl<B> {
  // === Geometry ===

  /// Move and resize in one call. Degenerate rects are refused before
  /// touching the OS.
  pub fn set_rect(&self, window: &WindowRef, rect: Rect) -> WinctlResult<()> {
    if rect.is_degenerate() {
      return Err(WinctlError::InvalidRect(rect));
    }
    self.ensure_alive(window)?;
    self.backend().set_rect(window, rect)
  }

  pub fn move_to(&self, window: &WindowRef, origin: Point) -> WinctlResult<()> {
    let rect = self.rect(window)?;
    self.set_rect(window, rect.moved_to(origin))
  }

  pub fn move_by(&self, window: &WindowRef, dx: i32, dy: i32) -> WinctlResult<()> {
    let rect = self.rect(window)?;
    self.set_rect(window, rect.translated(dx, dy))
  }

  pub fn resize_to(&self, window: &WindowRef, width: u32, height: u32) -> WinctlResult<()> {
    let rect = self.rect(window)?;
    self.set_rect(window, rect.resized(width, height))
  }

  /// Grow or shrink. Shrinking to nothing is `InvalidRect`.
  pub fn resize_by(&self, window: &WindowRef, dw: i32, dh: i32) -> WinctlResult<()> {
    let rect = self.rect(window)?;
    self.set_rect(window, rect.resized_by(dw, dh))
  }

  // === State transitions ===

  pub fn set_visible(&self, window: &WindowRef, visible: bool) -> WinctlResult<()> {
    if self.state(window)?.visible == visible {
      return Ok(());
    }
    self.backend().set_visible(window, visible)
  }

  pub fn minimize(&self, window: &WindowRef) -> WinctlResult<()> {
    if self.state(window)?.minimized {
      return Ok(());
    }
    self.backend().minimize(window)
  }

  pub fn maximize(&self, window: &WindowRef) -> WinctlResult<()> {
    let state = self.state(window)?;
    if state.maximized && !state.minimized {
      return Ok(());
    }
    self.backend().maximize(window)
  }

  /// Undo minimize or maximize.
  pub fn restore(&self, window: &WindowRef) -> WinctlResult<()> {
    let state = self.state(window)?;
    if !state.minimized && !state.maximized {
      return Ok(());
    }
    self.backend().restore(window)
  }

  /// Ask the window to close. The app may still refuse.
  pub fn close(&self, window: &WindowRef) -> WinctlResult<()> {
    self.ensure_alive(window)?;
    self.backend().close(window)
  }

  /// Focus the window and bring it to the front.
  pub fn activate(&self, window: &WindowRef) -> WinctlResult<()> {
    self.ensure_alive(window)?;
    self.backend().activate(window)
  }

  // === Z-order ===

  /// One-shot raise. Does not persist.
  pub fn bring_to_front(&self, window: &WindowRef) -> WinctlResult<()> {
    self.ensure_alive(window)?;
    self.backend().raise_to_top(window)
  }

  /// One-shot lower behind every normal window.
  pub fn send_behind(&self, window: &WindowRef) -> WinctlResult<()> {
    self.ensure_alive(window)?;
    if !self.capabilities().send_behind {
      return Err(WinctlError::unsupported(self.backend_kind(), "send_behind"));
    }
    self.backend().lower_to_bottom(window)
  }

  /// Keep the window above all others until cancelled, replacing any
  /// existing assertion on it.
  pub fn assert_always_on_top(&self, window: &WindowRef) -> WinctlResult<ZOrderAssertion> {
    self.zorder().assert(window, ZOrderMode::Top)
  }

  /// Keep the window below all others until cancelled, replacing any
  /// existing assertion on it.
  pub fn assert_always_on_bottom(&self, window: &WindowRef) -> WinctlResult<ZOrderAssertion> {
    self.zorder().assert(window, ZOrderMode::Bottom)
  }

  /// Stop the assertion on `window`, if any, and wait for its task to exit.
  ///
  /// Returns whether an assertion was running.
  pub fn cancel_assertion(&self, window: &WindowRef) -> WinctlResult<bool> {
    self.zorder().cancel(window)
  }

  // === Input ===

  /// Let the window take input (`true`) or pass clicks through (`false`).
  /// Visibility and position are untouched.
  pub fn set_accepts_input(&self, window: &WindowRef, accepts: bool) -> WinctlResult<()> {
    self.ensure_alive(window)?;
    self.backend().set_accepts_input(window, accepts)
  }
}
