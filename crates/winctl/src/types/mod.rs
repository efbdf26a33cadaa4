/*! Core types for winctl. */

#![allow(missing_docs)]

mod error;
mod geometry;
mod ids;
mod screen;
mod title_match;
mod window;
mod zorder;

pub use error::{WinctlError, WinctlResult};
pub use geometry::{Point, Rect};
pub use ids::{AppRef, ProcessId, WindowHandle, WindowRef};
pub use screen::{FrameExtents, Screen};
pub use title_match::{MatchCondition, TitleMatch};
pub use window::{AlertState, BackendKind, Capabilities, WindowState};
pub use zorder::{AssertionState, ZOrderAssertion, ZOrderMode};
