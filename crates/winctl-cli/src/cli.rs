/*! Command-line arguments. */

use clap::{Args, Parser, Subcommand, ValueEnum};
use winctl::{MatchCondition, TitleMatch};

/// Inspect and control top-level windows. Output is JSON.
#[derive(Debug, Parser)]
#[command(name = "winctl", version, about)]
pub(crate) struct Cli {
  /// Z-order enforcement interval in milliseconds (clamped to 20..=1000).
  #[arg(long, env = "WINCTL_TICK_MS", global = true)]
  pub(crate) tick_ms: Option<u64>,

  #[command(subcommand)]
  pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
  /// Backend name and capability flags.
  Info,
  /// List windows, front to back where the backend knows the order.
  List(TitleFilter),
  /// List running applications with their window titles.
  Apps(TitleFilter),
  /// The focused window.
  Active,
  /// Attached displays with their work areas.
  Screens {
    /// Only the display with this name; `primary` for the primary display.
    #[arg(long)]
    name: Option<String>,
  },
  /// Mouse pointer position.
  Cursor,
  /// Windows under a screen point, topmost first.
  At { x: i32, y: i32 },
  /// Title, app, geometry, state and alert state of one window.
  Show { window: Handle },
  /// Move and resize a window.
  Place {
    window: Handle,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
  },
  /// One-shot state change.
  Do { window: Handle, action: Action },
  /// Keep a window above all others until interrupted or `--seconds` pass.
  PinTop(Pin),
  /// Keep a window below all others until interrupted or `--seconds` pass.
  PinBottom(Pin),
  /// Let a window receive input, or make it click-through.
  AcceptInput {
    window: Handle,
    #[arg(action = clap::ArgAction::Set)]
    accepts: bool,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Action {
  Minimize,
  Maximize,
  Restore,
  Hide,
  Unhide,
  Close,
  Activate,
  Raise,
  Lower,
}

#[derive(Debug, Args)]
pub(crate) struct Pin {
  pub(crate) window: Handle,
  /// Stop after this many seconds instead of waiting for Ctrl-C.
  #[arg(long)]
  pub(crate) seconds: Option<u64>,
}

#[derive(Debug, Args)]
pub(crate) struct TitleFilter {
  /// Only entries whose title (or app name) matches.
  #[arg(long)]
  pub(crate) title: Option<String>,
  /// How `--title` is compared.
  #[arg(long, value_enum, default_value_t = Condition::Contains)]
  pub(crate) condition: Condition,
  #[arg(short = 'i', long)]
  pub(crate) ignore_case: bool,
  /// Restrict to windows of these apps (repeatable).
  #[arg(long = "app")]
  pub(crate) apps: Vec<String>,
}

impl TitleFilter {
  pub(crate) fn to_match(&self) -> Option<TitleMatch> {
    let pattern = self.title.as_deref()?;
    let mut m = TitleMatch::new(self.condition.into(), pattern).in_apps(self.apps.iter().cloned());
    if self.ignore_case {
      m = m.ignore_case();
    }
    Some(m)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Condition {
  Is,
  Contains,
  StartsWith,
  EndsWith,
  IsNot,
  NotContains,
  NotStartsWith,
  NotEndsWith,
}

impl From<Condition> for MatchCondition {
  fn from(c: Condition) -> Self {
    match c {
      Condition::Is => Self::Is,
      Condition::Contains => Self::Contains,
      Condition::StartsWith => Self::StartsWith,
      Condition::EndsWith => Self::EndsWith,
      Condition::IsNot => Self::IsNot,
      Condition::NotContains => Self::NotContains,
      Condition::NotStartsWith => Self::NotStartsWith,
      Condition::NotEndsWith => Self::NotEndsWith,
    }
  }
}

/// Raw window handle as printed by `list`, decimal or `0x` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Handle(pub(crate) u64);

impl std::str::FromStr for Handle {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
      Some(hex) => u64::from_str_radix(hex, 16),
      None => s.parse(),
    };
    parsed
      .map(Handle)
      .map_err(|e| format!("invalid window handle {s:?}: {e}"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn cli_is_well_formed() {
    Cli::command().debug_assert();
  }

  mod handles {
    use super::*;

    #[test]
    fn decimal_and_hex() {
      assert_eq!("4194305".parse::<Handle>().unwrap(), Handle(4_194_305));
      assert_eq!("0x400001".parse::<Handle>().unwrap(), Handle(0x40_0001));
    }

    #[test]
    fn garbage_is_rejected() {
      assert!("hwnd".parse::<Handle>().is_err());
      assert!("0x".parse::<Handle>().is_err());
    }
  }

  mod parsing {
    use super::*;

    #[test]
    fn pin_with_duration() {
      let cli = Cli::try_parse_from(["winctl", "pin-top", "0x2a", "--seconds", "3"]).unwrap();
      let Command::PinTop(pin) = cli.command else {
        panic!("expected pin-top");
      };
      assert_eq!(pin.window, Handle(42));
      assert_eq!(pin.seconds, Some(3));
    }

    #[test]
    fn accept_input_takes_a_bool() {
      let cli = Cli::try_parse_from(["winctl", "accept-input", "7", "false"]).unwrap();
      assert!(matches!(
        cli.command,
        Command::AcceptInput {
          accepts: false,
          ..
        }
      ));
    }

    #[test]
    fn screens_by_name() {
      let cli = Cli::try_parse_from(["winctl", "screens", "--name", "HDMI-1"]).unwrap();
      assert!(matches!(cli.command, Command::Screens { name: Some(ref n) } if n == "HDMI-1"));
      let cli = Cli::try_parse_from(["winctl", "screens"]).unwrap();
      assert!(matches!(cli.command, Command::Screens { name: None }));
    }

    #[test]
    fn filter_builds_title_match() {
      let cli =
        Cli::try_parse_from(["winctl", "list", "--title", "NOTEPAD", "-i", "--app", "notepad"])
          .unwrap();
      let Command::List(filter) = cli.command else {
        panic!("expected list");
      };
      let m = filter.to_match().unwrap();
      assert!(m.matches("Untitled - Notepad"));
    }

    #[test]
    fn no_title_means_no_filter() {
      let cli = Cli::try_parse_from(["winctl", "apps"]).unwrap();
      let Command::Apps(filter) = cli.command else {
        panic!("expected apps");
      };
      assert!(filter.to_match().is_none());
    }
  }
}
