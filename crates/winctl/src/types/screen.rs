/*! Displays and window frame geometry. */

use super::{Point, Rect};
use serde::{Deserialize, Serialize};

/// One display attached to the desktop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
  /// Backend display name (`\\.\DISPLAY1`, RandR output, `NSScreen` name).
  pub name: String,
  pub primary: bool,
  /// Full display bounds in desktop coordinates.
  pub rect: Rect,
  /// Part of the display windows may use: no taskbar, panels, menu bar or
  /// Dock.
  pub work_area: Rect,
}

impl Screen {
  /// The screen showing most of `rect`, falling back to the one holding its
  /// center and then to the primary screen.
  pub fn showing(screens: &[Screen], rect: Rect) -> Option<&Screen> {
    let best = screens
      .iter()
      .map(|s| (s.rect.overlap_area(&rect), s))
      .filter(|(area, _)| *area > 0)
      .max_by_key(|(area, _)| *area)
      .map(|(_, s)| s);
    best
      .or_else(|| screens.iter().find(|s| s.rect.contains(rect.center())))
      .or_else(|| screens.iter().find(|s| s.primary))
  }

  /// The screen named `name`, or the primary one when `name` is `None`.
  pub fn find<'a>(screens: &'a [Screen], name: Option<&str>) -> Option<&'a Screen> {
    match name {
      Some(name) => screens.iter().find(|s| s.name == name),
      None => screens.iter().find(|s| s.primary),
    }
  }

  pub const fn contains(&self, point: Point) -> bool {
    self.rect.contains(point)
  }
}

/// Decoration thickness around a window's client area, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameExtents {
  pub left: u32,
  pub top: u32,
  pub right: u32,
  pub bottom: u32,
}

impl FrameExtents {
  /// Extents between an outer `frame` and the `client` area inside it.
  /// A client edge poking outside the frame counts as zero.
  pub fn between(frame: Rect, client: Rect) -> Self {
    let inset =
      |outer: i32, inner: i32| u32::try_from(i64::from(inner) - i64::from(outer)).unwrap_or(0);
    Self {
      left: inset(frame.x, client.x),
      top: inset(frame.y, client.y),
      right: inset(client.right(), frame.right()),
      bottom: inset(client.bottom(), frame.bottom()),
    }
  }

  /// `rect` grown by these extents on every side.
  pub fn around(&self, rect: Rect) -> Rect {
    Rect::new(
      rect.x.saturating_sub(signed(self.left)),
      rect.y.saturating_sub(signed(self.top)),
      rect.width.saturating_add(self.left).saturating_add(self.right),
      rect.height.saturating_add(self.top).saturating_add(self.bottom),
    )
  }

  /// What is left of `frame` once these extents are taken off.
  pub fn inside(&self, frame: Rect) -> Rect {
    Rect::new(
      frame.x.saturating_add(signed(self.left)),
      frame.y.saturating_add(signed(self.top)),
      frame.width.saturating_sub(self.left).saturating_sub(self.right),
      frame.height.saturating_sub(self.top).saturating_sub(self.bottom),
    )
  }
}

fn signed(v: u32) -> i32 {
  i32::try_from(v).unwrap_or(i32::MAX)
}
