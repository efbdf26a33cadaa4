/*! Public view of z-order assertions. */

use super::WindowRef;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Which end of the stack an assertion pins a window to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZOrderMode {
  #[display("top")]
  Top,
  #[display("bottom")]
  Bottom,
}

/// Lifecycle of one assertion. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionState {
  Active,
  Stopped,
}

/// Snapshot of a z-order assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZOrderAssertion {
  pub window: WindowRef,
  pub mode: ZOrderMode,
  pub state: AssertionState,
  /// Successful enforcement ticks so far, including the initial one.
  pub enforcements: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn modes_display_lowercase() {
    assert_eq!(ZOrderMode::Top.to_string(), "top");
    assert_eq!(ZOrderMode::Bottom.to_string(), "bottom");
  }
}
