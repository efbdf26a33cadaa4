/*!
macOS backend.

- Windows and their numbers come from the window server list; it cannot
  order minimized or other-space windows, so no stack order is reported
  and `window_at` is unsupported.
- Geometry, minimize, raise and close go through System Events
  (Accessibility), scripted with `osascript`. Both Accessibility and
  Automation permission for the calling process are required.
- Visibility is per application (`NSRunningApplication` hide/unhide).
- Window-server titles need Screen Recording permission. Without it every
  title is empty, and titles are matched in from System Events by pid and
  frame.
- Restore puts back the frame saved by `maximize`; a window zoomed by the
  user is restored through its zoom button.
- Screens and the mouse come from AppKit, flipped into top-left origin
  coordinates. The client area is not exposed by Accessibility.
- There is no way to keep a window below others, so bottom assertions and
  `send_behind` are unsupported. Input pass-through is unsupported too.
- Alerts read the app's Dock tile badge.

# Module Structure

- `window_list.rs` - `CGWindowListCopyWindowInfo` parsing
- `apps.rs` - `NSWorkspace` / `NSRunningApplication`
- `script.rs` - `osascript` runner and the JXA sources
*/

mod apps;
mod script;
mod window_list;

use self::script::{DockReply, ListedWindow, ScreensReply, Target, WindowReply};
use self::window_list::CgWindow;
use crate::platform::Backend;
use crate::types::{
  AlertState, AppRef, BackendKind, Capabilities, Point, ProcessId, Rect, Screen, WindowHandle,
  WindowRef, WindowState, WinctlError, WinctlResult,
};
use objc2_core_graphics::{CGDisplayBounds, CGMainDisplayID};
use parking_lot::Mutex;
use std::collections::HashMap;

const CAPABILITIES: Capabilities = Capabilities {
  provides_stack_order: false,
  send_behind: false,
  accepts_input: false,
  alert_state: true,
  per_window_visibility: false,
  client_area: false,
};

/// Slack when deciding whether a frame fills the display. Height allows
/// for the menu bar and the Dock.
const FILL_SLACK_X: u32 = 8;
const FILL_SLACK_Y: u32 = 120;

#[derive(Debug, Default)]
pub struct MacBackend {
  /// Frames of windows we maximized, keyed by window number.
  restore_frames: Mutex<HashMap<u32, Rect>>,
}

impl MacBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn lookup(window: &WindowRef) -> WinctlResult<CgWindow> {
    let WindowHandle::Mac { window_id } = window.handle else {
      return Err(WinctlError::InvalidHandle(window.clone()));
    };
    window_list::lookup(window_id)
      .filter(|cg| window.is_owned_by(ProcessId(cg.pid)))
      .ok_or_else(|| WinctlError::InvalidHandle(window.clone()))
  }

  /// The window-server list with titles filled in where it withheld them.
  fn titled_windows() -> Vec<CgWindow> {
    let mut windows = window_list::all();
    if needs_titles(&windows) {
      match script::run_jxa::<Vec<ListedWindow>>(script::titles_script()) {
        Ok(listed) => fill_titles(&mut windows, &listed),
        Err(e) => log::debug!("No window titles from System Events: {e}"),
      }
    }
    windows
  }

  fn window_ref(cg: &CgWindow) -> WindowRef {
    WindowRef::new(
      WindowHandle::Mac { window_id: cg.id },
      Some(ProcessId(cg.pid)),
      cg.title.clone(),
    )
  }

  /// Run `body` against the Accessibility window backing `cg`.
  fn script(window: &WindowRef, cg: &CgWindow, body: &str) -> WinctlResult<WindowReply> {
    let target = Target {
      pid: cg.pid,
      title: cg.title.clone(),
      bounds: cg.bounds,
    };
    let reply: WindowReply = script::run_jxa(&script::window_script(&target, body))?;
    if reply.found {
      return Ok(reply);
    }
    if window_list::lookup(cg.id).is_none() {
      return Err(WinctlError::InvalidHandle(window.clone()));
    }
    Err(WinctlError::transient(format!(
      "{window}: no Accessibility window of pid {} matches",
      cg.pid
    )))
  }

  fn set_frame(window: &WindowRef, cg: &CgWindow, rect: Rect) -> WinctlResult<()> {
    Self::script(window, cg, &script::set_frame_body(rect)).map(drop)
  }

  fn dock_alert(app_name: &str) -> AlertState {
    match script::run_jxa::<DockReply>(&script::dock_script(app_name)) {
      Ok(reply) => classify_badge(&reply),
      Err(e) => {
        log::debug!("Dock unreachable for {app_name:?}: {e}");
        AlertState::Unknown
      }
    }
  }
}

fn main_display() -> Rect {
  window_list::to_rect(CGDisplayBounds(CGMainDisplayID()))
}

/// Every visible app window is untitled: the window server is withholding
/// titles.
fn needs_titles(windows: &[CgWindow]) -> bool {
  let mut shown = windows
    .iter()
    .filter(|w| w.on_screen && w.is_app_window())
    .peekable();
  shown.peek().is_some() && shown.all(|w| w.title.is_empty())
}

fn fill_titles(windows: &mut [CgWindow], listed: &[ListedWindow]) {
  for window in windows.iter_mut().filter(|w| w.title.is_empty()) {
    if let Some(found) = listed.iter().find(|l| l.matches(window.pid, window.bounds)) {
      window.title.clone_from(&found.title);
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
enum RestoreStep {
  /// Put back a frame saved by `maximize`.
  Frame(Rect),
  /// Press the zoom button of a window zoomed by other means.
  Zoom,
  Nothing,
}

fn restore_step(was_minimized: bool, saved: Option<Rect>, filling: bool) -> RestoreStep {
  match saved {
    Some(frame) => RestoreStep::Frame(frame),
    None if !was_minimized && filling => RestoreStep::Zoom,
    None => RestoreStep::Nothing,
  }
}

/// Convert a Cocoa `x, y, width, height` (y up from the bottom of the
/// primary screen) into top-left origin coordinates.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn flip_rect(primary_height: f64, [x, y, width, height]: [f64; 4]) -> Rect {
  Rect::new(
    x.round() as i32,
    (primary_height - y - height).round() as i32,
    width.max(0.0).round() as u32,
    height.max(0.0).round() as u32,
  )
}

#[allow(clippy::cast_possible_truncation)]
fn flip_point(primary_height: f64, [x, y]: [f64; 2]) -> Point {
  Point::new(x.round() as i32, (primary_height - y).round() as i32)
}

/// Height of the menu-bar screen, which AppKit lists first.
fn primary_height(reply: &ScreensReply) -> f64 {
  reply.screens.first().map_or(0.0, |s| s.frame[3])
}

fn screens_from(reply: &ScreensReply) -> Vec<Screen> {
  let height = primary_height(reply);
  reply
    .screens
    .iter()
    .enumerate()
    .map(|(i, s)| Screen {
      name: if s.name.is_empty() {
        format!("Display {}", i + 1)
      } else {
        s.name.clone()
      },
      primary: i == 0,
      rect: flip_rect(height, s.frame),
      work_area: flip_rect(height, s.visible),
    })
    .collect()
}

/// Whether `frame` covers `display`, give or take the menu bar and Dock.
fn fills(display: Rect, frame: Rect) -> bool {
  frame.width.saturating_add(FILL_SLACK_X) >= display.width
    && frame.height.saturating_add(FILL_SLACK_Y) >= display.height
}

fn classify_badge(reply: &DockReply) -> AlertState {
  if !reply.tile {
    return AlertState::Unknown;
  }
  match reply.badge.as_deref() {
    Some(badge) if !badge.trim().is_empty() => AlertState::AttentionRequested,
    _ => AlertState::None,
  }
}

impl Backend for MacBackend {
  fn kind(&self) -> BackendKind {
    BackendKind::MacOs
  }

  fn capabilities(&self) -> Capabilities {
    CAPABILITIES
  }

  fn all_windows(&self) -> WinctlResult<Vec<WindowRef>> {
    Ok(
      Self::titled_windows()
        .iter()
        .filter(|w| w.is_app_window())
        .map(Self::window_ref)
        .collect(),
    )
  }

  fn all_apps(&self) -> WinctlResult<Vec<AppRef>> {
    Ok(apps::regular_apps())
  }

  fn active_window(&self) -> WinctlResult<Option<WindowRef>> {
    let Some(pid) = apps::frontmost_pid() else {
      return Ok(None);
    };
    let Some(cg) = window_list::all()
      .into_iter()
      .find(|w| w.pid == pid && w.on_screen && w.is_app_window())
    else {
      return Ok(None);
    };
    let mut window = Self::window_ref(&cg);
    if window.title.is_empty() {
      window.title = self.title(&window).unwrap_or_default();
    }
    Ok(Some(window))
  }

  fn is_alive(&self, window: &WindowRef) -> bool {
    Self::lookup(window).is_ok()
  }

  fn title(&self, window: &WindowRef) -> WinctlResult<String> {
    let cg = Self::lookup(window)?;
    if !cg.title.is_empty() {
      return Ok(cg.title);
    }
    let reply = Self::script(window, &cg, script::title_body())?;
    Ok(reply.title.unwrap_or_default())
  }

  fn app_of(&self, window: &WindowRef) -> WinctlResult<AppRef> {
    let cg = Self::lookup(window)?;
    let name = apps::name_of(cg.pid).unwrap_or(cg.owner);
    Ok(AppRef::new(ProcessId(cg.pid), name))
  }

  fn rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    Ok(Self::lookup(window)?.bounds)
  }

  fn set_rect(&self, window: &WindowRef, rect: Rect) -> WinctlResult<()> {
    let cg = Self::lookup(window)?;
    Self::set_frame(window, &cg, rect)?;
    self.restore_frames.lock().remove(&cg.id);
    Ok(())
  }

  fn client_rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    Self::lookup(window)?;
    Err(WinctlError::unsupported(self.kind(), "client_rect"))
  }

  fn screens(&self) -> WinctlResult<Vec<Screen>> {
    let reply: ScreensReply = script::run_jxa(script::screens_script())?;
    Ok(screens_from(&reply))
  }

  fn cursor_position(&self) -> WinctlResult<Point> {
    let reply: ScreensReply = script::run_jxa(script::screens_script())?;
    Ok(flip_point(primary_height(&reply), reply.mouse))
  }

  fn state(&self, window: &WindowRef) -> WinctlResult<WindowState> {
    let cg = Self::lookup(window)?;
    let reply = Self::script(window, &cg, script::state_body())?;
    let hidden = apps::is_hidden(cg.pid).unwrap_or(false);
    Ok(WindowState {
      visible: !hidden,
      minimized: reply.minimized.unwrap_or(false),
      maximized: fills(main_display(), cg.bounds),
      active: reply.frontmost.unwrap_or(false) && reply.main.unwrap_or(false),
    })
  }

  fn set_visible(&self, window: &WindowRef, visible: bool) -> WinctlResult<()> {
    let cg = Self::lookup(window)?;
    if apps::set_hidden(cg.pid, !visible) {
      Ok(())
    } else {
      Err(WinctlError::transient(format!(
        "{window}: pid {} refused to {}",
        cg.pid,
        if visible { "unhide" } else { "hide" }
      )))
    }
  }

  fn minimize(&self, window: &WindowRef) -> WinctlResult<()> {
    let cg = Self::lookup(window)?;
    Self::script(window, &cg, &script::set_minimized_body(true)).map(drop)
  }

  fn maximize(&self, window: &WindowRef) -> WinctlResult<()> {
    let cg = Self::lookup(window)?;
    let reply = Self::script(window, &cg, script::state_body())?;
    if reply.minimized.unwrap_or(false) {
      Self::script(window, &cg, &script::set_minimized_body(false))?;
    }
    Self::set_frame(window, &cg, main_display())?;
    self.restore_frames.lock().entry(cg.id).or_insert(cg.bounds);
    Ok(())
  }

  fn restore(&self, window: &WindowRef) -> WinctlResult<()> {
    let cg = Self::lookup(window)?;
    let reply = Self::script(window, &cg, script::state_body())?;
    let minimized = reply.minimized.unwrap_or(false);
    if minimized {
      Self::script(window, &cg, &script::set_minimized_body(false))?;
    }
    let saved = self.restore_frames.lock().remove(&cg.id);
    match restore_step(minimized, saved, fills(main_display(), cg.bounds)) {
      RestoreStep::Frame(frame) => Self::set_frame(window, &cg, frame),
      RestoreStep::Zoom => {
        if Self::script(window, &cg, script::zoom_body())?.ok {
          Ok(())
        } else {
          Err(WinctlError::transient(format!(
            "{window} fills the display and has no zoom button"
          )))
        }
      }
      RestoreStep::Nothing => Ok(()),
    }
  }

  fn close(&self, window: &WindowRef) -> WinctlResult<()> {
    let cg = Self::lookup(window)?;
    let reply = Self::script(window, &cg, script::close_body())?;
    if reply.ok {
      self.restore_frames.lock().remove(&cg.id);
      Ok(())
    } else {
      Err(WinctlError::transient(format!("{window} has no close button")))
    }
  }

  fn activate(&self, window: &WindowRef) -> WinctlResult<()> {
    let cg = Self::lookup(window)?;
    if !apps::activate(cg.pid) {
      log::debug!("{window}: activateWithOptions refused, raising anyway");
    }
    Self::script(window, &cg, &script::raise_body(true)).map(drop)
  }

  fn raise_to_top(&self, window: &WindowRef) -> WinctlResult<()> {
    let cg = Self::lookup(window)?;
    Self::script(window, &cg, &script::raise_body(false)).map(drop)
  }

  fn lower_to_bottom(&self, window: &WindowRef) -> WinctlResult<()> {
    Self::lookup(window)?;
    Err(WinctlError::unsupported(self.kind(), "send_behind"))
  }

  fn set_accepts_input(&self, window: &WindowRef, _accepts: bool) -> WinctlResult<()> {
    Self::lookup(window)?;
    Err(WinctlError::unsupported(self.kind(), "set_accepts_input"))
  }

  fn alert_state(&self, window: &WindowRef) -> WinctlResult<AlertState> {
    let cg = Self::lookup(window)?;
    let name = apps::name_of(cg.pid).unwrap_or(cg.owner);
    Ok(Self::dock_alert(&name))
  }

  /// The Dock badge belongs to the app, so no per-window aggregation.
  fn app_alert_state(&self, app: &AppRef) -> WinctlResult<AlertState> {
    Ok(Self::dock_alert(&app.name))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  mod badges {
    use super::*;

    fn reply(tile: bool, badge: Option<&str>) -> DockReply {
      DockReply {
        tile,
        badge: badge.map(str::to_owned),
      }
    }

    #[test]
    fn badge_requests_attention() {
      assert_eq!(
        classify_badge(&reply(true, Some("3"))),
        AlertState::AttentionRequested
      );
      assert_eq!(
        classify_badge(&reply(true, Some("•"))),
        AlertState::AttentionRequested
      );
    }

    #[test]
    fn empty_badge_is_quiet() {
      assert_eq!(classify_badge(&reply(true, None)), AlertState::None);
      assert_eq!(classify_badge(&reply(true, Some(" "))), AlertState::None);
    }

    #[test]
    fn missing_tile_is_unknown() {
      assert_eq!(classify_badge(&reply(false, None)), AlertState::Unknown);
    }
  }

  mod maximized {
    use super::*;

    const DISPLAY: Rect = Rect::new(0, 0, 1512, 982);

    #[test]
    fn frame_below_menu_bar_fills() {
      assert!(fills(DISPLAY, Rect::new(0, 38, 1512, 944)));
    }

    #[test]
    fn ordinary_window_does_not_fill() {
      assert!(!fills(DISPLAY, Rect::new(100, 100, 800, 600)));
      assert!(!fills(DISPLAY, Rect::new(0, 38, 1512, 600)));
    }
  }

  mod restoring {
    use super::*;

    const SAVED: Rect = Rect::new(100, 100, 800, 600);

    #[test]
    fn saved_frame_wins() {
      assert_eq!(restore_step(false, Some(SAVED), true), RestoreStep::Frame(SAVED));
      assert_eq!(restore_step(true, Some(SAVED), false), RestoreStep::Frame(SAVED));
    }

    #[test]
    fn user_zoomed_window_is_unzoomed() {
      assert_eq!(restore_step(false, None, true), RestoreStep::Zoom);
    }

    #[test]
    fn unminimizing_is_enough() {
      assert_eq!(restore_step(true, None, true), RestoreStep::Nothing);
      assert_eq!(restore_step(false, None, false), RestoreStep::Nothing);
    }
  }

  mod titles {
    use super::*;

    fn cg(id: u32, pid: u32, title: &str, bounds: Rect) -> CgWindow {
      CgWindow {
        id,
        pid,
        owner: "Mail".to_owned(),
        title: title.to_owned(),
        bounds,
        layer: 0,
        on_screen: true,
      }
    }

    fn listed(pid: u32, title: &str, bounds: Rect) -> ListedWindow {
      ListedWindow {
        pid,
        title: title.to_owned(),
        x: bounds.x,
        y: bounds.y,
        width: bounds.width,
        height: bounds.height,
      }
    }

    #[test]
    fn withheld_titles_are_detected() {
      let frame = Rect::new(0, 25, 900, 700);
      assert!(needs_titles(&[cg(1, 7, "", frame), cg(2, 8, "", frame)]));
      assert!(!needs_titles(&[cg(1, 7, "", frame), cg(2, 8, "Inbox", frame)]));
      assert!(!needs_titles(&[]));
    }

    #[test]
    fn titles_match_by_pid_and_frame() {
      let a = Rect::new(0, 25, 900, 700);
      let b = Rect::new(200, 200, 640, 480);
      let mut windows = vec![cg(1, 7, "", a), cg(2, 7, "", b), cg(3, 9, "", a)];
      fill_titles(
        &mut windows,
        &[listed(7, "Drafts", b), listed(7, "Inbox", a)],
      );
      assert_eq!(windows[0].title, "Inbox");
      assert_eq!(windows[1].title, "Drafts");
      assert_eq!(windows[2].title, "");
    }
  }

  mod screens {
    use super::*;

    #[test]
    fn cocoa_coordinates_are_flipped() {
      let reply: ScreensReply = script::parse_reply(
        r#"{"screens":[
          {"name":"Built-in","frame":[0,0,1512,982],"visible":[0,0,1512,944]},
          {"name":"","frame":[1512,-98,1920,1080],"visible":[1512,-98,1920,1055]}
        ],"mouse":[100,900]}"#,
      )
      .unwrap();
      let screens = screens_from(&reply);
      assert!(screens[0].primary);
      assert_eq!(screens[0].rect, Rect::new(0, 0, 1512, 982));
      assert_eq!(screens[0].work_area, Rect::new(0, 38, 1512, 944));
      assert_eq!(screens[1].name, "Display 2");
      assert_eq!(screens[1].rect, Rect::new(1512, 0, 1920, 1080));
      assert_eq!(screens[1].work_area, Rect::new(1512, 25, 1920, 1055));
      assert_eq!(flip_point(primary_height(&reply), reply.mouse), Point::new(100, 82));
    }
  }

  #[test]
  fn foreign_handles_are_invalid() {
    let w = WindowRef::new(WindowHandle::X11(1), None, "");
    assert!(matches!(
      MacBackend::lookup(&w),
      Err(WinctlError::InvalidHandle(_))
    ));
    assert!(!MacBackend::new().is_alive(&w));
  }
}
