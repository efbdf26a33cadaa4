/*! Geometry types for screen coordinates. */

use serde::{Deserialize, Serialize};

/// Window rectangle in screen coordinates.
///
/// Width and height are unsigned, so a negative size cannot be expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
  pub x: i32,
  pub y: i32,
  pub width: u32,
  pub height: u32,
}

impl Rect {
  pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// Build from left/top/right/bottom edges. Inverted edges collapse to zero size.
  #[allow(clippy::cast_sign_loss)]
  pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
    let width = if right > left { (right as i64 - left as i64) as u32 } else { 0 };
    let height = if bottom > top { (bottom as i64 - top as i64) as u32 } else { 0 };
    Self::new(left, top, width, height)
  }

  #[allow(clippy::cast_possible_truncation)]
  pub const fn right(&self) -> i32 {
    (self.x as i64 + self.width as i64) as i32
  }

  #[allow(clippy::cast_possible_truncation)]
  pub const fn bottom(&self) -> i32 {
    (self.y as i64 + self.height as i64) as i32
  }

  /// True if the rect has no area a window could occupy.
  pub const fn is_degenerate(&self) -> bool {
    self.width < 1 || self.height < 1
  }

  /// Check if a point lies inside, edges inclusive.
  pub const fn contains(&self, point: Point) -> bool {
    point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
  }

  /// Check if two rects match within a margin of error (in pixels).
  pub const fn matches(&self, other: &Rect, margin: u32) -> bool {
    self.x.abs_diff(other.x) <= margin
      && self.y.abs_diff(other.y) <= margin
      && self.width.abs_diff(other.width) <= margin
      && self.height.abs_diff(other.height) <= margin
  }

  /// Same size, origin moved to `origin`.
  #[must_use]
  pub const fn moved_to(self, origin: Point) -> Self {
    Self::new(origin.x, origin.y, self.width, self.height)
  }

  /// Same size, origin shifted by the given offsets.
  #[must_use]
  pub const fn translated(self, dx: i32, dy: i32) -> Self {
    Self::new(
      self.x.saturating_add(dx),
      self.y.saturating_add(dy),
      self.width,
      self.height,
    )
  }

  /// Same origin, new size.
  #[must_use]
  pub const fn resized(self, width: u32, height: u32) -> Self {
    Self::new(self.x, self.y, width, height)
  }

  /// Same origin, size grown (or shrunk) by the given deltas. Shrinking past
  /// zero saturates at zero.
  #[must_use]
  pub const fn resized_by(self, dw: i32, dh: i32) -> Self {
    Self::new(
      self.x,
      self.y,
      self.width.saturating_add_signed(dw),
      self.height.saturating_add_signed(dh),
    )
  }

  pub const fn origin(&self) -> Point {
    Point::new(self.x, self.y)
  }

  #[allow(clippy::cast_possible_truncation)]
  pub const fn center(&self) -> Point {
    Point::new(
      (self.x as i64 + self.width as i64 / 2) as i32,
      (self.y as i64 + self.height as i64 / 2) as i32,
    )
  }

  /// The part of `self` inside `other`, `None` when they do not overlap.
  #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
  pub fn intersection(&self, other: &Rect) -> Option<Rect> {
    let left = i64::from(self.x.max(other.x));
    let top = i64::from(self.y.max(other.y));
    let right = i64::from(self.right().min(other.right()));
    let bottom = i64::from(self.bottom().min(other.bottom()));
    if right <= left || bottom <= top {
      return None;
    }
    Some(Rect::new(
      left as i32,
      top as i32,
      (right - left) as u32,
      (bottom - top) as u32,
    ))
  }

  /// Area shared with `other`, zero when they do not overlap.
  pub fn overlap_area(&self, other: &Rect) -> u64 {
    self
      .intersection(other)
      .map_or(0, |r| u64::from(r.width) * u64::from(r.height))
  }
}

impl std::fmt::Display for Rect {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
  }
}

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
  pub x: i32,
  pub y: i32,
}

impl Point {
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }
}


#[cfg(test)]
mod proptests {
  use super::*;
  use proptest::prelude::*;

  fn coord() -> impl Strategy<Value = i32> {
    -10000..10000i32
  }

  fn dimension() -> impl Strategy<Value = u32> {
    0..5000u32
  }

  proptest! {
    /// Rect::matches is reflexive for any margin
    #[test]
    fn matches_reflexive(x in coord(), y in coord(), w in dimension(), h in dimension(), m in 0..100u32) {
      let r = Rect::new(x, y, w, h);
      prop_assert!(r.matches(&r, m));
    }

    /// Rect::matches is symmetric
    #[test]
    fn matches_symmetric(
      x1 in coord(), y1 in coord(), w1 in dimension(), h1 in dimension(),
      x2 in coord(), y2 in coord(), w2 in dimension(), h2 in dimension(),
      m in 0..100u32
    ) {
      let a = Rect::new(x1, y1, w1, h1);
      let b = Rect::new(x2, y2, w2, h2);
      prop_assert_eq!(a.matches(&b, m), b.matches(&a, m));
    }

    /// Corners are always contained
    #[test]
    fn corners_contained(x in coord(), y in coord(), w in dimension(), h in dimension()) {
      let r = Rect::new(x, y, w, h);
      prop_assert!(r.contains(Point::new(r.x, r.y)));
      prop_assert!(r.contains(Point::new(r.right(), r.bottom())));
    }

    /// from_edges inverts right()/bottom()
    #[test]
    fn edges_round_trip(x in coord(), y in coord(), w in dimension(), h in dimension()) {
      let r = Rect::new(x, y, w, h);
      prop_assert_eq!(Rect::from_edges(r.x, r.y, r.right(), r.bottom()), r);
    }

    /// Degenerate exactly when one side is zero
    #[test]
    fn degenerate_iff_zero_side(w in dimension(), h in dimension()) {
      let r = Rect::new(0, 0, w, h);
      prop_assert_eq!(r.is_degenerate(), w == 0 || h == 0);
    }
  }
}
