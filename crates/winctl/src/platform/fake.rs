/*!
Scripted in-memory backend for tests.

Windows live in a front-to-back list. Counters and failure injection let
tests observe exactly which native calls the core code made.
*/

use crate::platform::Backend;
use crate::types::{
  AlertState, AppRef, BackendKind, Capabilities, FrameExtents, Point, ProcessId, Rect, Screen,
  WindowHandle, WindowRef, WindowState, WinctlError, WinctlResult, ZOrderMode,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Geometry Win32 reports for an iconic window.
const MINIMIZED_RECT: Rect = Rect::new(-32000, -32000, 160, 28);

/// Title bar and borders of every fake window.
pub(crate) const FRAME: FrameExtents = FrameExtents {
  left: 1,
  top: 30,
  right: 1,
  bottom: 1,
};

#[derive(Debug, Clone)]
struct FakeWindow {
  id: u32,
  title: String,
  app: AppRef,
  rect: Rect,
  restored: Rect,
  state: WindowState,
  accepts_input: bool,
  alert: AlertState,
  alive: bool,
  sticky: Option<ZOrderMode>,
}

#[derive(Debug)]
struct FakeState {
  kind: BackendKind,
  capabilities: Capabilities,
  /// Front to back.
  windows: Vec<FakeWindow>,
  next_id: u32,
  enforcements: HashMap<(u32, ZOrderMode), u64>,
  failing_enforcements: u32,
  mutations: u64,
  screens: Vec<Screen>,
  cursor: Point,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeBackend {
  state: Arc<Mutex<FakeState>>,
}

pub(crate) const FULL_CAPABILITIES: Capabilities = Capabilities {
  provides_stack_order: true,
  send_behind: true,
  accepts_input: true,
  alert_state: true,
  per_window_visibility: true,
  client_area: true,
};

impl FakeBackend {
  pub(crate) fn new() -> Self {
    Self::with_capabilities(BackendKind::X11, FULL_CAPABILITIES)
  }

  pub(crate) fn with_capabilities(kind: BackendKind, capabilities: Capabilities) -> Self {
    Self {
      state: Arc::new(Mutex::new(FakeState {
        kind,
        capabilities,
        windows: Vec::new(),
        next_id: 1,
        enforcements: HashMap::new(),
        failing_enforcements: 0,
        mutations: 0,
        screens: vec![Screen {
          name: "primary".to_owned(),
          primary: true,
          rect: Rect::new(0, 0, 1920, 1080),
          work_area: Rect::new(0, 0, 1920, 1040),
        }],
        cursor: Point::default(),
      })),
    }
  }

  /// Open a window at the back of the stack.
  pub(crate) fn open(&self, title: &str, app: &AppRef, rect: Rect) -> WindowRef {
    let mut state = self.state.lock();
    let id = state.next_id;
    state.next_id += 1;
    state.windows.push(FakeWindow {
      id,
      title: title.to_owned(),
      app: app.clone(),
      rect,
      restored: rect,
      state: WindowState {
        visible: true,
        ..WindowState::default()
      },
      accepts_input: true,
      alert: AlertState::None,
      alive: true,
      sticky: None,
    });
    WindowRef::new(WindowHandle::X11(id), Some(app.process_id), title)
  }

  /// Simulate the OS destroying the window.
  pub(crate) fn destroy(&self, window: &WindowRef) {
    let mut state = self.state.lock();
    if let Some(w) = find_mut(&mut state, window) {
      w.alive = false;
    }
  }

  /// Simulate the OS handing a destroyed window's handle to a new window
  /// of another process. Returns a ref to the newcomer.
  pub(crate) fn reuse(&self, window: &WindowRef, title: &str, app: &AppRef) -> WindowRef {
    let mut state = self.state.lock();
    if let Some(w) = find_mut(&mut state, window) {
      w.title = title.to_owned();
      w.app = app.clone();
      w.alive = true;
      w.sticky = None;
    }
    WindowRef::new(window.handle, Some(app.process_id), title)
  }

  pub(crate) fn add_screen(&self, screen: Screen) {
    self.state.lock().screens.push(screen);
  }

  pub(crate) fn move_cursor(&self, to: Point) {
    self.state.lock().cursor = to;
  }

  pub(crate) fn rename(&self, window: &WindowRef, title: &str) {
    let mut state = self.state.lock();
    if let Some(w) = find_mut(&mut state, window) {
      w.title = title.to_owned();
    }
  }

  pub(crate) fn set_alert(&self, window: &WindowRef, alert: AlertState) {
    let mut state = self.state.lock();
    if let Some(w) = find_mut(&mut state, window) {
      w.alert = alert;
    }
  }

  pub(crate) fn focus(&self, window: &WindowRef) {
    let mut state = self.state.lock();
    for w in &mut state.windows {
      w.state.active = w.id == id_of(window);
    }
  }

  /// Make the next `count` enforcement calls fail transiently.
  pub(crate) fn fail_enforcements(&self, count: u32) {
    self.state.lock().failing_enforcements = count;
  }

  pub(crate) fn enforcements(&self, window: &WindowRef, mode: ZOrderMode) -> u64 {
    let state = self.state.lock();
    state
      .enforcements
      .get(&(id_of(window), mode))
      .copied()
      .unwrap_or(0)
  }

  /// Number of state-changing native calls made so far.
  pub(crate) fn mutations(&self) -> u64 {
    self.state.lock().mutations
  }

  pub(crate) fn sticky(&self, window: &WindowRef) -> Option<ZOrderMode> {
    let mut state = self.state.lock();
    find_mut(&mut state, window).and_then(|w| w.sticky)
  }

  pub(crate) fn accepts_input(&self, window: &WindowRef) -> bool {
    let mut state = self.state.lock();
    find_mut(&mut state, window).is_some_and(|w| w.accepts_input)
  }

  /// Ids front to back, live windows only.
  pub(crate) fn stack(&self) -> Vec<u32> {
    let state = self.state.lock();
    state.windows.iter().filter(|w| w.alive).map(|w| w.id).collect()
  }

  fn with_live<T>(
    &self,
    window: &WindowRef,
    f: impl FnOnce(&mut FakeWindow) -> WinctlResult<T>,
  ) -> WinctlResult<T> {
    let mut state = self.state.lock();
    match find_mut(&mut state, window) {
      Some(w) if w.alive && window.is_owned_by(w.app.process_id) => f(w),
      _ => Err(WinctlError::InvalidHandle(window.clone())),
    }
  }

  fn mutate(
    &self,
    window: &WindowRef,
    f: impl FnOnce(&mut FakeWindow),
  ) -> WinctlResult<()> {
    self.with_live(window, |w| {
      f(w);
      Ok(())
    })?;
    self.state.lock().mutations += 1;
    Ok(())
  }

  fn restack(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    let mut state = self.state.lock();
    let id = id_of(window);
    let found = state
      .windows
      .iter()
      .position(|w| w.id == id && w.alive && window.is_owned_by(w.app.process_id));
    let Some(pos) = found else {
      return Err(WinctlError::InvalidHandle(window.clone()));
    };
    let w = state.windows.remove(pos);
    match mode {
      ZOrderMode::Top => state.windows.insert(0, w),
      ZOrderMode::Bottom => state.windows.push(w),
    }
    state.mutations += 1;
    Ok(())
  }
}

fn id_of(window: &WindowRef) -> u32 {
  if let WindowHandle::X11(id) = window.handle {
    id
  } else {
    0
  }
}

fn find_mut<'a>(state: &'a mut FakeState, window: &WindowRef) -> Option<&'a mut FakeWindow> {
  let id = id_of(window);
  state.windows.iter_mut().find(|w| w.id == id)
}

impl FakeWindow {
  fn to_ref(&self) -> WindowRef {
    WindowRef::new(
      WindowHandle::X11(self.id),
      Some(self.app.process_id),
      self.title.clone(),
    )
  }
}

impl Backend for FakeBackend {
  fn kind(&self) -> BackendKind {
    self.state.lock().kind
  }

  fn capabilities(&self) -> Capabilities {
    self.state.lock().capabilities
  }

  fn all_windows(&self) -> WinctlResult<Vec<WindowRef>> {
    let state = self.state.lock();
    Ok(
      state
        .windows
        .iter()
        .filter(|w| w.alive)
        .map(FakeWindow::to_ref)
        .collect(),
    )
  }

  fn all_apps(&self) -> WinctlResult<Vec<AppRef>> {
    let state = self.state.lock();
    let mut apps: Vec<AppRef> = Vec::new();
    for w in state.windows.iter().filter(|w| w.alive) {
      if !apps.contains(&w.app) {
        apps.push(w.app.clone());
      }
    }
    Ok(apps)
  }

  fn active_window(&self) -> WinctlResult<Option<WindowRef>> {
    let state = self.state.lock();
    Ok(
      state
        .windows
        .iter()
        .find(|w| w.alive && w.state.active)
        .map(FakeWindow::to_ref),
    )
  }

  fn is_alive(&self, window: &WindowRef) -> bool {
    self.with_live(window, |_| Ok(())).is_ok()
  }

  fn title(&self, window: &WindowRef) -> WinctlResult<String> {
    self.with_live(window, |w| Ok(w.title.clone()))
  }

  fn app_of(&self, window: &WindowRef) -> WinctlResult<AppRef> {
    self.with_live(window, |w| Ok(w.app.clone()))
  }

  fn rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    self.with_live(window, |w| {
      Ok(if w.state.minimized { w.restored } else { w.rect })
    })
  }

  fn set_rect(&self, window: &WindowRef, rect: Rect) -> WinctlResult<()> {
    self.mutate(window, |w| {
      w.rect = rect;
      w.restored = rect;
    })
  }

  fn client_rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    if !self.capabilities().client_area {
      return Err(WinctlError::unsupported(self.kind(), "client_rect"));
    }
    Ok(FRAME.inside(self.rect(window)?))
  }

  fn screens(&self) -> WinctlResult<Vec<Screen>> {
    Ok(self.state.lock().screens.clone())
  }

  fn cursor_position(&self) -> WinctlResult<Point> {
    Ok(self.state.lock().cursor)
  }

  fn state(&self, window: &WindowRef) -> WinctlResult<WindowState> {
    self.with_live(window, |w| Ok(w.state))
  }

  /// Without per-window visibility the whole app is hidden, like macOS.
  fn set_visible(&self, window: &WindowRef, visible: bool) -> WinctlResult<()> {
    let pid = self.app_of(window)?.process_id;
    if self.capabilities().per_window_visibility {
      return self.mutate(window, |w| w.state.visible = visible);
    }
    let mut state = self.state.lock();
    for w in state.windows.iter_mut().filter(|w| w.app.process_id == pid) {
      w.state.visible = visible;
    }
    state.mutations += 1;
    Ok(())
  }

  fn minimize(&self, window: &WindowRef) -> WinctlResult<()> {
    self.mutate(window, |w| {
      if !w.state.minimized {
        w.restored = w.rect;
      }
      w.rect = MINIMIZED_RECT;
      w.state.minimized = true;
    })
  }

  fn maximize(&self, window: &WindowRef) -> WinctlResult<()> {
    self.mutate(window, |w| {
      if w.state.minimized {
        w.rect = w.restored;
      }
      w.state.minimized = false;
      w.state.maximized = true;
    })
  }

  fn restore(&self, window: &WindowRef) -> WinctlResult<()> {
    self.mutate(window, |w| {
      w.rect = w.restored;
      w.state.minimized = false;
      w.state.maximized = false;
    })
  }

  fn close(&self, window: &WindowRef) -> WinctlResult<()> {
    self.mutate(window, |w| w.alive = false)
  }

  fn activate(&self, window: &WindowRef) -> WinctlResult<()> {
    self.with_live(window, |_| Ok(()))?;
    self.focus(window);
    self.restack(window, ZOrderMode::Top)
  }

  fn raise_to_top(&self, window: &WindowRef) -> WinctlResult<()> {
    self.restack(window, ZOrderMode::Top)
  }

  fn lower_to_bottom(&self, window: &WindowRef) -> WinctlResult<()> {
    if !self.capabilities().send_behind {
      return Err(WinctlError::unsupported(self.kind(), "send_behind"));
    }
    self.restack(window, ZOrderMode::Bottom)
  }

  fn enforce_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    {
      let mut state = self.state.lock();
      if state.failing_enforcements > 0 {
        state.failing_enforcements -= 1;
        return Err(WinctlError::transient("injected failure"));
      }
    }
    self.restack(window, mode)?;
    let mut state = self.state.lock();
    *state.enforcements.entry((id_of(window), mode)).or_insert(0) += 1;
    if let Some(w) = find_mut(&mut state, window) {
      w.sticky = Some(mode);
    }
    Ok(())
  }

  fn release_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    self.with_live(window, |w| {
      if w.sticky == Some(mode) {
        w.sticky = None;
      }
      Ok(())
    })
  }

  fn set_accepts_input(&self, window: &WindowRef, accepts: bool) -> WinctlResult<()> {
    if !self.capabilities().accepts_input {
      return Err(WinctlError::unsupported(self.kind(), "set_accepts_input"));
    }
    self.mutate(window, |w| w.accepts_input = accepts)
  }

  fn alert_state(&self, window: &WindowRef) -> WinctlResult<AlertState> {
    self.with_live(window, |w| Ok(w.alert))
  }
}

/// Shorthand for test apps.
pub(crate) fn app(pid: u32, name: &str) -> AppRef {
  AppRef::new(ProcessId(pid), name)
}
