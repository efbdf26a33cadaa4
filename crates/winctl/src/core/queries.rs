/*!
Read operations: enumeration, geometry, state and alert polling.

Enumeration is a snapshot. Windows that vanish between listing and a
follow-up read are skipped by the search helpers rather than failing the
whole query.
*/

use super::Winctl;
use crate::platform::Backend;
use crate::types::{
  AlertState, AppRef, FrameExtents, Point, Rect, Screen, TitleMatch, WindowRef, WindowState,
  WinctlError, WinctlResult, ZOrderAssertion,
};

/// Turn "window vanished" into `None`, keep every other error.
fn skip_vanished<T>(result: WinctlResult<T>) -> WinctlResult<Option<T>> {
  match result {
    Ok(v) => Ok(Some(v)),
    Err(WinctlError::InvalidHandle(_)) => Ok(None),
    Err(e) => Err(e),
  }
}

impl<B: Backend> Winctl<B> {
  // === Enumeration ===

  /// Every top-level application window.
  ///
  /// Front to back when [`Capabilities::provides_stack_order`](crate::Capabilities)
  /// is set; unordered otherwise.
  pub fn all_windows(&self) -> WinctlResult<Vec<WindowRef>> {
    self.backend().all_windows()
  }

  pub fn all_apps(&self) -> WinctlResult<Vec<AppRef>> {
    self.backend().all_apps()
  }

  /// Windows currently owned by `app`. Queried live.
  pub fn windows_of_app(&self, app: &AppRef) -> WinctlResult<Vec<WindowRef>> {
    self.backend().windows_of_app(app)
  }

  /// Current titles, in order. Fails on the first window that is gone.
  pub fn titles_of(&self, windows: &[WindowRef]) -> WinctlResult<Vec<String>> {
    windows.iter().map(|w| self.title(w)).collect()
  }

  pub fn names_of(&self, apps: &[AppRef]) -> Vec<String> {
    apps.iter().map(|a| a.name.clone()).collect()
  }

  /// The foreground window, if any.
  pub fn active_window(&self) -> WinctlResult<Option<WindowRef>> {
    self.backend().active_window()
  }

  /// Current titles of every window. Windows closing mid-query are left out.
  pub fn all_titles(&self) -> WinctlResult<Vec<String>> {
    let mut titles = Vec::new();
    for window in self.all_windows()? {
      if let Some(title) = skip_vanished(self.backend().title(&window))? {
        titles.push(title);
      }
    }
    Ok(titles)
  }

  /// Windows whose current title passes `filter`.
  pub fn windows_with_title(&self, filter: &TitleMatch) -> WinctlResult<Vec<WindowRef>> {
    let apps = filter.app_filter();
    let mut found = Vec::new();
    for window in self.all_windows()? {
      if !apps.is_empty() {
        match skip_vanished(self.backend().app_of(&window))? {
          Some(app) if apps.contains(&app.name) => {}
          _ => continue,
        }
      }
      if let Some(title) = skip_vanished(self.backend().title(&window))? {
        if filter.matches(&title) {
          found.push(WindowRef { cached_title: title, ..window });
        }
      }
    }
    Ok(found)
  }

  /// Applications whose name passes `filter`.
  pub fn apps_with_name(&self, filter: &TitleMatch) -> WinctlResult<Vec<AppRef>> {
    Ok(
      self
        .all_apps()?
        .into_iter()
        .filter(|app| filter.matches(&app.name))
        .collect(),
    )
  }

  /// Every application with the current titles of its windows.
  pub fn apps_windows_titles(&self) -> WinctlResult<Vec<(AppRef, Vec<String>)>> {
    let mut out = Vec::new();
    for app in self.all_apps()? {
      let mut titles = Vec::new();
      for window in self.windows_of_app(&app)? {
        if let Some(title) = skip_vanished(self.backend().title(&window))? {
          titles.push(title);
        }
      }
      out.push((app, titles));
    }
    Ok(out)
  }

  /// Every window whose rect contains `point`, in enumeration order.
  pub fn windows_at(&self, point: Point) -> WinctlResult<Vec<WindowRef>> {
    let mut found = Vec::new();
    for window in self.all_windows()? {
      if let Some(rect) = skip_vanished(self.backend().rect(&window))? {
        if rect.contains(point) {
          found.push(window);
        }
      }
    }
    Ok(found)
  }

  /// The topmost window at `point`.
  ///
  /// Backends that cannot order windows return `Unsupported` rather than
  /// guess.
  pub fn window_at(&self, point: Point) -> WinctlResult<Option<WindowRef>> {
    self.backend().window_at(point)
  }

  /// Look a window up by its raw handle value.
  pub fn find_window(&self, raw: u64) -> WinctlResult<Option<WindowRef>> {
    Ok(self.all_windows()?.into_iter().find(|w| w.handle.raw() == raw))
  }

  // === Per-window reads ===

  pub fn is_alive(&self, window: &WindowRef) -> bool {
    self.backend().is_alive(window)
  }

  /// Current title, never the cached one.
  pub fn title(&self, window: &WindowRef) -> WinctlResult<String> {
    self.ensure_alive(window)?;
    self.backend().title(window)
  }

  pub fn app_of(&self, window: &WindowRef) -> WinctlResult<AppRef> {
    self.ensure_alive(window)?;
    self.backend().app_of(window)
  }

  /// Screen rect. A minimized window reports its last restored geometry.
  pub fn rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    self.ensure_alive(window)?;
    self.backend().rect(window)
  }

  pub fn state(&self, window: &WindowRef) -> WinctlResult<WindowState> {
    self.ensure_alive(window)?;
    self.backend().state(window)
  }

  /// The area inside the window decorations, in screen coordinates.
  pub fn client_rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    self.ensure_alive(window)?;
    self.ensure_client_area()?;
    self.backend().client_rect(window)
  }

  /// Thickness of the decorations around the client area.
  pub fn frame_extents(&self, window: &WindowRef) -> WinctlResult<FrameExtents> {
    self.ensure_alive(window)?;
    self.ensure_client_area()?;
    self.backend().frame_extents(window)
  }

  fn ensure_client_area(&self) -> WinctlResult<()> {
    if self.capabilities().client_area {
      Ok(())
    } else {
      Err(WinctlError::unsupported(self.backend_kind(), "client_rect"))
    }
  }

  // === Screens ===

  pub fn screens(&self) -> WinctlResult<Vec<Screen>> {
    self.backend().screens()
  }

  /// The screen called `name`, or the primary screen when `name` is `None`.
  pub fn screen(&self, name: Option<&str>) -> WinctlResult<Option<Screen>> {
    Ok(Screen::find(&self.screens()?, name).cloned())
  }

  /// The screen showing the largest part of `window`.
  pub fn screen_of(&self, window: &WindowRef) -> WinctlResult<Option<Screen>> {
    let rect = self.rect(window)?;
    Ok(Screen::showing(&self.screens()?, rect).cloned())
  }

  pub fn cursor_position(&self) -> WinctlResult<Point> {
    self.backend().cursor_position()
  }

  // === Alerts ===

  /// Poll whether the window is requesting attention.
  pub fn alert_state(&self, window: &WindowRef) -> WinctlResult<AlertState> {
    self.ensure_alive(window)?;
    self.backend().alert_state(window)
  }

  /// Poll whether any window of `app` (or its Dock tile) requests attention.
  pub fn app_alert_state(&self, app: &AppRef) -> WinctlResult<AlertState> {
    self.backend().app_alert_state(app)
  }

  // === Assertions ===

  /// The assertion on `window`, including one that stopped on its own.
  pub fn assertion(&self, window: &WindowRef) -> Option<ZOrderAssertion> {
    self.zorder().get(window)
  }

  pub fn active_assertions(&self) -> Vec<ZOrderAssertion> {
    self.zorder().active()
  }
}
