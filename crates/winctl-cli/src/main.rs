/*!
`winctl` command-line tool.

Every command prints JSON on stdout. Failures are logged (set `RUST_LOG`
for more detail) and turn into a non-zero exit code.
*/

mod cli;

use clap::Parser;
use cli::{Action, Cli, Command, Handle, Pin, TitleFilter};
use serde::Serialize;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use winctl::{
  AlertState, AppRef, AssertionState, FrameExtents, Point, Rect, WindowRef, WindowState, Winctl,
  WinctlError, WinctlResult, ZOrderMode,
};

/// How often a pin without `--seconds` checks its assertion is still alive.
const PIN_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct WindowSummary {
  handle: u64,
  window: WindowRef,
  title: String,
  rect: Rect,
}

#[derive(Debug, Serialize)]
struct WindowDetails {
  handle: u64,
  title: String,
  app: AppRef,
  rect: Rect,
  state: WindowState,
  alert: AlertState,
  /// Name of the screen showing most of the window.
  screen: Option<String>,
  /// Client area and decorations, where the backend exposes them.
  client: Option<Rect>,
  frame: Option<FrameExtents>,
}

#[derive(Debug, Serialize)]
struct AppSummary {
  app: AppRef,
  titles: Vec<String>,
  alert: AlertState,
}

fn main() -> ExitCode {
  env_logger::init();
  let cli = Cli::parse();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      log::error!("{e}");
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> WinctlResult<()> {
  let mut builder = Winctl::builder();
  if let Some(ms) = cli.tick_ms {
    builder = builder.tick_interval(Duration::from_millis(ms));
  }
  let winctl = builder.build()?;

  match cli.command {
    Command::Info => print(&serde_json::json!({
      "backend": winctl.backend_kind(),
      "capabilities": winctl.capabilities(),
      "tick_ms": u64::try_from(winctl.tick_interval().as_millis()).unwrap_or(u64::MAX),
    })),
    Command::List(filter) => {
      let windows = match filter.to_match() {
        Some(m) => winctl.windows_with_title(&m)?,
        None => winctl.all_windows()?,
      };
      print(&summaries(&winctl, windows))
    }
    Command::Apps(filter) => apps(&winctl, &filter),
    Command::Active => {
      let window = winctl.active_window()?;
      print(&window.map(|w| summaries(&winctl, vec![w])))
    }
    Command::Screens { name } => {
      let screens = match name.as_deref() {
        None => winctl.screens()?,
        Some("primary") => winctl.screen(None)?.into_iter().collect(),
        Some(name) => winctl.screen(Some(name))?.into_iter().collect(),
      };
      print(&screens)
    }
    Command::Cursor => print(&winctl.cursor_position()?),
    Command::At { x, y } => {
      let windows = winctl.windows_at(Point::new(x, y))?;
      print(&summaries(&winctl, windows))
    }
    Command::Show { window } => {
      let window = resolve(&winctl, window)?;
      print(&WindowDetails {
        handle: window.handle.raw(),
        title: winctl.title(&window)?,
        app: winctl.app_of(&window)?,
        rect: winctl.rect(&window)?,
        state: winctl.state(&window)?,
        alert: winctl.alert_state(&window)?,
        screen: winctl.screen_of(&window)?.map(|s| s.name),
        client: optional(winctl.client_rect(&window))?,
        frame: optional(winctl.frame_extents(&window))?,
      })
    }
    Command::Place {
      window,
      x,
      y,
      width,
      height,
    } => {
      let window = resolve(&winctl, window)?;
      winctl.set_rect(&window, Rect::new(x, y, width, height))?;
      print(&winctl.rect(&window)?)
    }
    Command::Do { window, action } => {
      let window = resolve(&winctl, window)?;
      perform(&winctl, &window, action)?;
      if action == Action::Close {
        return Ok(());
      }
      print(&winctl.state(&window)?)
    }
    Command::PinTop(pin) => pin_window(&winctl, &pin, ZOrderMode::Top),
    Command::PinBottom(pin) => pin_window(&winctl, &pin, ZOrderMode::Bottom),
    Command::AcceptInput { window, accepts } => {
      let window = resolve(&winctl, window)?;
      winctl.set_accepts_input(&window, accepts)
    }
  }
}

/// `None` for reads the backend cannot do, other errors pass through.
fn optional<T>(result: WinctlResult<T>) -> WinctlResult<Option<T>> {
  match result {
    Ok(v) => Ok(Some(v)),
    Err(WinctlError::Unsupported { .. }) => Ok(None),
    Err(e) => Err(e),
  }
}

fn resolve(winctl: &Winctl, handle: Handle) -> WinctlResult<WindowRef> {
  winctl.find_window(handle.0)?.ok_or_else(|| {
    WinctlError::Internal(format!("no window with handle {:#x}", handle.0))
  })
}

/// Summaries for `windows`, skipping any that vanished mid-listing.
fn summaries(winctl: &Winctl, windows: Vec<WindowRef>) -> Vec<WindowSummary> {
  windows
    .into_iter()
    .filter_map(|window| {
      let title = winctl.title(&window).ok()?;
      let rect = winctl.rect(&window).ok()?;
      Some(WindowSummary {
        handle: window.handle.raw(),
        window,
        title,
        rect,
      })
    })
    .collect()
}

fn apps(winctl: &Winctl, filter: &TitleFilter) -> WinctlResult<()> {
  let apps = match filter.to_match() {
    Some(m) => winctl.apps_with_name(&m)?,
    None => winctl.all_apps()?,
  };
  let mut out = Vec::with_capacity(apps.len());
  for app in apps {
    let titles = winctl
      .windows_of_app(&app)?
      .into_iter()
      .filter_map(|w| winctl.title(&w).ok())
      .collect();
    let alert = winctl.app_alert_state(&app)?;
    out.push(AppSummary { app, titles, alert });
  }
  print(&out)
}

fn perform(winctl: &Winctl, window: &WindowRef, action: Action) -> WinctlResult<()> {
  match action {
    Action::Minimize => winctl.minimize(window),
    Action::Maximize => winctl.maximize(window),
    Action::Restore => winctl.restore(window),
    Action::Hide => winctl.set_visible(window, false),
    Action::Unhide => winctl.set_visible(window, true),
    Action::Close => winctl.close(window),
    Action::Activate => winctl.activate(window),
    Action::Raise => winctl.bring_to_front(window),
    Action::Lower => winctl.send_behind(window),
  }
}

fn pin_window(winctl: &Winctl, pin: &Pin, mode: ZOrderMode) -> WinctlResult<()> {
  let window = resolve(winctl, pin.window)?;
  let assertion = match mode {
    ZOrderMode::Top => winctl.assert_always_on_top(&window)?,
    ZOrderMode::Bottom => winctl.assert_always_on_bottom(&window)?,
  };
  log::info!("pinned {window} to {mode}");
  print(&assertion)?;

  let deadline = pin.seconds.map(|s| Instant::now() + Duration::from_secs(s));
  loop {
    let wait = match deadline {
      Some(deadline) => {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
          break;
        }
        left.min(PIN_POLL)
      }
      None => PIN_POLL,
    };
    std::thread::sleep(wait);
    let running = matches!(
      winctl.assertion(&window),
      Some(a) if a.state == AssertionState::Active
    );
    if !running {
      log::warn!("{window} is gone, assertion stopped");
      return Ok(());
    }
  }

  let final_state = winctl.assertion(&window);
  winctl.cancel_assertion(&window)?;
  print(&final_state)
}

fn print<T: Serialize>(value: &T) -> WinctlResult<()> {
  let json = serde_json::to_string_pretty(value)
    .map_err(|e| WinctlError::Internal(format!("serialize output: {e}")))?;
  println!("{json}");
  Ok(())
}
