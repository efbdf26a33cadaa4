/*!
`osascript` round-trips.

Every script is JavaScript for Automation and returns one JSON object, so
replies are parsed with `serde_json` instead of scraping AppleScript's
record syntax. The child is killed after [`SCRIPT_TIMEOUT`].

Window scripts locate the Accessibility window of a process by matching
its frame against the window-server bounds (within [`MATCH_MARGIN`]
points), then by title, then by being the only window.

Without Screen Recording permission the window server hands out no titles,
so titles are read from System Events instead ([`titles_script`]).
*/

use crate::types::{Rect, WinctlError, WinctlResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

pub(super) const SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

const MATCH_MARGIN: u32 = 2;

/// osascript errors meaning Automation/Accessibility access was refused.
const PERMISSION_MARKERS: &[&str] = &["-1719", "-1743", "-25211", "not allowed assistive access"];

/// Where to find a window through System Events.
#[derive(Debug, Clone)]
pub(super) struct Target {
  pub(super) pid: u32,
  pub(super) title: String,
  pub(super) bounds: Rect,
}

/// Reply shared by every window script.
#[derive(Debug, Default, Deserialize)]
pub(super) struct WindowReply {
  /// The process and window were found.
  pub(super) found: bool,
  #[serde(default)]
  pub(super) minimized: Option<bool>,
  #[serde(default)]
  pub(super) main: Option<bool>,
  #[serde(default)]
  pub(super) frontmost: Option<bool>,
  #[serde(default)]
  pub(super) title: Option<String>,
  /// The action itself could be carried out (e.g. a close button exists).
  #[serde(default = "default_true")]
  pub(super) ok: bool,
}

const fn default_true() -> bool {
  true
}

#[derive(Debug, Deserialize)]
pub(super) struct DockReply {
  /// The app has a Dock tile.
  pub(super) tile: bool,
  #[serde(default)]
  pub(super) badge: Option<String>,
}

/// One window of [`titles_script`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(super) struct ListedWindow {
  pub(super) pid: u32,
  pub(super) title: String,
  pub(super) x: i32,
  pub(super) y: i32,
  pub(super) width: u32,
  pub(super) height: u32,
}

impl ListedWindow {
  /// Same process and the same frame, within the match margin.
  pub(super) fn matches(&self, pid: u32, bounds: Rect) -> bool {
    let near = |a: i64, b: i64| (a - b).unsigned_abs() <= u64::from(MATCH_MARGIN);
    self.pid == pid
      && near(i64::from(self.x), i64::from(bounds.x))
      && near(i64::from(self.y), i64::from(bounds.y))
      && near(i64::from(self.width), i64::from(bounds.width))
      && near(i64::from(self.height), i64::from(bounds.height))
  }
}

/// Reply of [`screens_script`], in Cocoa coordinates (origin bottom-left
/// of the primary screen, y up).
#[derive(Debug, Deserialize)]
pub(super) struct ScreensReply {
  pub(super) screens: Vec<CocoaScreen>,
  pub(super) mouse: [f64; 2],
}

#[derive(Debug, Deserialize)]
pub(super) struct CocoaScreen {
  #[serde(default)]
  pub(super) name: String,
  /// `x, y, width, height`
  pub(super) frame: [f64; 4],
  pub(super) visible: [f64; 4],
}

/// Run a JXA script and parse its JSON reply.
pub(super) fn run_jxa<T: DeserializeOwned>(source: &str) -> WinctlResult<T> {
  let mut command = Command::new("osascript");
  command.args(["-l", "JavaScript", "-e", source]);
  let output = run_with_timeout(command, SCRIPT_TIMEOUT)?;
  if !output.status.success() {
    return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
  }
  parse_reply(&String::from_utf8_lossy(&output.stdout))
}

pub(super) fn parse_reply<T: DeserializeOwned>(stdout: &str) -> WinctlResult<T> {
  serde_json::from_str(stdout.trim())
    .map_err(|e| WinctlError::transient(format!("malformed osascript reply ({e}): {stdout:?}")))
}

fn classify_failure(stderr: &str) -> WinctlError {
  let stderr = stderr.trim();
  if PERMISSION_MARKERS.iter().any(|m| stderr.contains(m)) {
    WinctlError::PermissionDenied(format!("osascript: {stderr}"))
  } else {
    WinctlError::transient(format!("osascript: {stderr}"))
  }
}

/// Spawn `command`, collect its output, kill it once `timeout` elapses.
pub(super) fn run_with_timeout(mut command: Command, timeout: Duration) -> WinctlResult<Output> {
  let mut child = command
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|e| WinctlError::transient(format!("spawn {command:?}: {e}")))?;

  // Drain pipes on their own threads so a chatty child cannot block on a full pipe
  let stdout = child.stdout.take().map(drain);
  let stderr = child.stderr.take().map(drain);

  let deadline = Instant::now() + timeout;
  let status = loop {
    match child.try_wait() {
      Ok(Some(status)) => break status,
      Ok(None) if Instant::now() >= deadline => {
        let _ = child.kill();
        let _ = child.wait();
        return Err(WinctlError::transient(format!(
          "osascript timed out after {timeout:?}"
        )));
      }
      Ok(None) => std::thread::sleep(POLL_INTERVAL),
      Err(e) => return Err(WinctlError::transient(format!("wait for osascript: {e}"))),
    }
  };

  Ok(Output {
    status,
    stdout: collect(stdout),
    stderr: collect(stderr),
  })
}

fn drain(mut pipe: impl Read + Send + 'static) -> std::thread::JoinHandle<Vec<u8>> {
  std::thread::spawn(move || {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    buf
  })
}

fn collect(reader: Option<std::thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
  reader
    .and_then(|handle| handle.join().ok())
    .unwrap_or_default()
}

/// JavaScript literal for `value`.
fn js_string(value: &str) -> String {
  serde_json::Value::from(value).to_string()
}

/// Wrap `body` in a script that binds `proc` and `win` for `target`.
///
/// `body` runs only when the window was found and must `return` a JSON
/// string with `found: true`.
pub(super) fn window_script(target: &Target, body: &str) -> String {
  let Rect {
    x,
    y,
    width,
    height,
  } = target.bounds;
  let title = js_string(&target.title);
  let pid = target.pid;
  format!(
    r#"(() => {{
  const se = Application("System Events");
  const procs = se.processes.whose({{ unixId: {pid} }})();
  if (procs.length === 0) return JSON.stringify({{ found: false }});
  const proc = procs[0];
  const wins = proc.windows();
  const near = (a, b) => Math.abs(a - b) <= {MATCH_MARGIN};
  let win = wins.find((w) => {{
    const [px, py] = w.position();
    const [sw, sh] = w.size();
    return near(px, {x}) && near(py, {y}) && near(sw, {width}) && near(sh, {height});
  }});
  if (!win && {title} !== "") win = wins.find((w) => w.name() === {title});
  if (!win && wins.length === 1) win = wins[0];
  if (!win) return JSON.stringify({{ found: false }});
  {body}
}})()"#
  )
}

pub(super) fn state_body() -> &'static str {
  r#"return JSON.stringify({
    found: true,
    minimized: win.attributes.byName("AXMinimized").value(),
    main: win.attributes.byName("AXMain").value(),
    frontmost: proc.frontmost(),
  });"#
}

pub(super) fn set_frame_body(rect: Rect) -> String {
  format!(
    r#"win.position = [{}, {}];
  win.size = [{}, {}];
  return JSON.stringify({{ found: true }});"#,
    rect.x, rect.y, rect.width, rect.height
  )
}

pub(super) fn set_minimized_body(minimized: bool) -> String {
  format!(
    r#"win.attributes.byName("AXMinimized").value = {minimized};
  return JSON.stringify({{ found: true }});"#
  )
}

pub(super) fn raise_body(focus: bool) -> String {
  format!(
    r#"if ({focus}) proc.frontmost = true;
  win.actions.byName("AXRaise").perform();
  return JSON.stringify({{ found: true }});"#
  )
}

pub(super) fn title_body() -> &'static str {
  r#"return JSON.stringify({ found: true, title: win.name() || "" });"#
}

/// Press the green zoom button, toggling between the user and standard frame.
pub(super) fn zoom_body() -> &'static str {
  r#"const buttons = win.buttons.whose({ subrole: "AXZoomButton" })();
  if (buttons.length === 0) return JSON.stringify({ found: true, ok: false });
  buttons[0].click();
  return JSON.stringify({ found: true });"#
}

pub(super) fn close_body() -> &'static str {
  r#"const buttons = win.buttons.whose({ subrole: "AXCloseButton" })();
  if (buttons.length === 0) return JSON.stringify({ found: true, ok: false });
  buttons[0].click();
  return JSON.stringify({ found: true });"#
}

/// Read the Dock tile of `app_name`.
pub(super) fn dock_script(app_name: &str) -> String {
  let name = js_string(app_name);
  format!(
    r#"(() => {{
  const dock = Application("System Events").processes.byName("Dock");
  const tiles = dock.lists[0].uiElements.whose({{ name: {name} }})();
  if (tiles.length === 0) return JSON.stringify({{ tile: false }});
  let badge = null;
  try {{ badge = tiles[0].attributes.byName("AXStatusLabel").value(); }} catch (e) {{}}
  return JSON.stringify({{ tile: true, badge: badge }});
}})()"#
  )
}

/// Every window of every foreground process, with its title and frame.
pub(super) fn titles_script() -> &'static str {
  r#"(() => {
  const se = Application("System Events");
  const out = [];
  se.processes.whose({ backgroundOnly: false })().forEach((p) => {
    try {
      const pid = p.unixId();
      p.windows().forEach((w) => {
        const [x, y] = w.position();
        const [width, height] = w.size();
        out.push({
          pid: pid,
          title: w.name() || "",
          x: Math.round(x),
          y: Math.round(y),
          width: Math.max(0, Math.round(width)),
          height: Math.max(0, Math.round(height)),
        });
      });
    } catch (e) {}
  });
  return JSON.stringify(out);
})()"#
}

/// Screen frames and the mouse location, straight from AppKit.
pub(super) fn screens_script() -> &'static str {
  r#"(() => {
  ObjC.import("AppKit");
  const rect = (r) => [r.origin.x, r.origin.y, r.size.width, r.size.height];
  const screens = $.NSScreen.screens;
  const out = [];
  for (let i = 0; i < screens.count; i++) {
    const s = screens.objectAtIndex(i);
    out.push({
      name: ObjC.unwrap(s.localizedName) || "",
      frame: rect(s.frame),
      visible: rect(s.visibleFrame),
    });
  }
  const m = $.NSEvent.mouseLocation;
  return JSON.stringify({ screens: out, mouse: [m.x, m.y] });
})()"#
}

#[cfg(test)]
mod tests {
  use super::*;

  mod replies {
    use super::*;

    #[test]
    fn missing_fields_default() {
      let reply: WindowReply = parse_reply("{\"found\":true}\n").unwrap();
      assert!(reply.found);
      assert!(reply.ok);
      assert_eq!(reply.minimized, None);
    }

    #[test]
    fn full_state_reply() {
      let reply: WindowReply =
        parse_reply(r#"{"found":true,"minimized":false,"main":true,"frontmost":true}"#).unwrap();
      assert_eq!(reply.minimized, Some(false));
      assert_eq!(reply.main, Some(true));
    }

    #[test]
    fn garbage_is_transient_not_panic() {
      let err = parse_reply::<WindowReply>("execution error: oops").unwrap_err();
      assert!(err.is_transient());
    }

    #[test]
    fn listed_windows_parse() {
      let listed: Vec<ListedWindow> =
        parse_reply(r#"[{"pid":7,"title":"Inbox","x":0,"y":25,"width":900,"height":700}]"#)
          .unwrap();
      assert_eq!(listed[0].title, "Inbox");
      assert!(listed[0].matches(7, Rect::new(1, 25, 900, 701)));
      assert!(!listed[0].matches(8, Rect::new(0, 25, 900, 700)));
      assert!(!listed[0].matches(7, Rect::new(0, 25, 900, 640)));
    }

    #[test]
    fn screens_reply_parses() {
      let reply: ScreensReply = parse_reply(
        r#"{"screens":[{"name":"Built-in","frame":[0,0,1512,982],"visible":[0,0,1512,944]}],"mouse":[10.5,20]}"#,
      )
      .unwrap();
      assert_eq!(reply.screens[0].name, "Built-in");
      assert_eq!(reply.mouse, [10.5, 20.0]);
    }

    #[test]
    fn dock_reply_null_badge() {
      let reply: DockReply = parse_reply(r#"{"tile":true,"badge":null}"#).unwrap();
      assert!(reply.tile);
      assert_eq!(reply.badge, None);
    }
  }

  mod failures {
    use super::*;

    #[test]
    fn assistive_access_is_permission_denied() {
      let err = classify_failure("execution error: osascript is not allowed assistive access. (-25211)");
      assert!(matches!(err, WinctlError::PermissionDenied(_)));
    }

    #[test]
    fn other_errors_are_transient() {
      assert!(classify_failure("execution error: Can't get window 1. (-1728)").is_transient());
    }
  }

  mod scripts {
    use super::*;

    #[test]
    fn titles_are_escaped() {
      let target = Target {
        pid: 42,
        title: "say \"hi\"\n".to_owned(),
        bounds: Rect::new(1, 2, 3, 4),
      };
      let script = window_script(&target, "return 1;");
      assert!(script.contains(r#"w.name() === "say \"hi\"\n""#));
      assert!(script.contains("unixId: 42"));
      assert!(script.contains("near(sh, 4)"));
    }

    #[test]
    fn empty_title_never_matches_by_name() {
      let target = Target {
        pid: 42,
        title: String::new(),
        bounds: Rect::new(1, 2, 3, 4),
      };
      let script = window_script(&target, "return 1;");
      assert!(script.contains(r#"if (!win && "" !== "")"#));
    }

    #[test]
    fn frame_body_sets_position_and_size() {
      let body = set_frame_body(Rect::new(-10, 20, 300, 400));
      assert!(body.contains("[-10, 20]"));
      assert!(body.contains("[300, 400]"));
    }
  }

  mod timeout {
    use super::*;

    #[test]
    fn kills_slow_children() {
      let mut command = Command::new("sleep");
      command.arg("5");
      let started = Instant::now();
      let err = run_with_timeout(command, Duration::from_millis(100)).unwrap_err();
      assert!(err.is_transient());
      assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn collects_output() {
      let mut command = Command::new("echo");
      command.arg("{\"found\":false}");
      let output = run_with_timeout(command, SCRIPT_TIMEOUT).unwrap();
      let reply: WindowReply = parse_reply(&String::from_utf8_lossy(&output.stdout)).unwrap();
      assert!(!reply.found);
    }
  }
}
