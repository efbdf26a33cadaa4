/*!
The `Winctl` facade.

# Module Structure

- `mod.rs` - Winctl struct, builder, construction
- `queries.rs` - enumeration, geometry and state reads, alert polling
- `actions.rs` - geometry writes, visibility, z-order, input acceptance

Every per-window operation validates its `WindowRef` against the live OS
first, so a stale reference fails with `InvalidHandle` instead of acting
on whatever window later reuses the handle.

# Example

```ignore
use winctl::Winctl;

let winctl = Winctl::new()?;
let window = winctl.active_window()?.expect("a focused window");
winctl.assert_always_on_top(&window)?;
// ...
winctl.cancel_assertion(&window)?;
```
*/

mod actions;
mod queries;

use crate::platform::{Backend, NativeBackend};
use crate::types::{BackendKind, Capabilities, WindowRef, WinctlError, WinctlResult};
use crate::zorder::{self, ZOrderController};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct WinctlConfig {
  pub(crate) tick: Duration,
}

impl Default for WinctlConfig {
  fn default() -> Self {
    Self {
      tick: zorder::DEFAULT_TICK,
    }
  }
}

/// Builder for configuring a [`Winctl`] instance.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// let winctl = winctl::Winctl::builder()
///   .tick_interval(Duration::from_millis(100))
///   .build()?;
/// # Ok::<(), winctl::WinctlError>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
#[must_use = "Builder does nothing until .build() is called"]
pub struct WinctlBuilder {
  config: WinctlConfig,
}

impl WinctlBuilder {
  /// How often z-order assertions re-assert. Clamped to 20 ms ..= 1 s.
  /// Default: 500 ms.
  pub fn tick_interval(mut self, tick: Duration) -> Self {
    self.config.tick = zorder::clamp_tick(tick);
    self
  }

  /// Connect to the running platform's windowing system.
  pub fn build(self) -> WinctlResult<Winctl> {
    let backend = NativeBackend::detect()?;
    Ok(self.build_with_backend(backend))
  }

  /// Build over an explicit backend.
  pub fn build_with_backend<B: Backend>(self, backend: B) -> Winctl<B> {
    let backend = Arc::new(backend);
    log::debug!(
      "winctl using {} backend, tick {:?}",
      backend.kind(),
      self.config.tick
    );
    Winctl {
      inner: Arc::new(Inner {
        zorder: ZOrderController::new(Arc::clone(&backend), self.config.tick),
        backend,
      }),
    }
  }
}

struct Inner<B: Backend> {
  backend: Arc<B>,
  zorder: ZOrderController<B>,
}

/// Window control over one backend.
///
/// Clone is cheap (Arc bump). Z-order assertions run until cancelled or
/// until the last clone is dropped, which stops and joins every task.
pub struct Winctl<B: Backend = NativeBackend> {
  inner: Arc<Inner<B>>,
}

impl<B: Backend> Clone for Winctl<B> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<B: Backend> std::fmt::Debug for Winctl<B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Winctl")
      .field("backend", &self.inner.backend.kind())
      .field("zorder", &self.inner.zorder)
      .finish()
  }
}

impl Winctl {
  /// Connect with default options.
  ///
  /// For custom configuration, use [`Winctl::builder()`].
  pub fn new() -> WinctlResult<Self> {
    Self::builder().build()
  }

  pub fn builder() -> WinctlBuilder {
    WinctlBuilder::default()
  }
}

impl<B: Backend> Winctl<B> {
  pub fn backend_kind(&self) -> BackendKind {
    self.inner.backend.kind()
  }

  pub fn capabilities(&self) -> Capabilities {
    self.inner.backend.capabilities()
  }

  /// Effective z-order enforcement interval.
  pub fn tick_interval(&self) -> Duration {
    self.inner.zorder.tick()
  }

  fn backend(&self) -> &B {
    &self.inner.backend
  }

  fn zorder(&self) -> &ZOrderController<B> {
    &self.inner.zorder
  }

  fn ensure_alive(&self, window: &WindowRef) -> WinctlResult<()> {
    if self.backend().is_alive(window) {
      Ok(())
    } else {
      Err(WinctlError::InvalidHandle(window.clone()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::fake::FakeBackend;

  #[test]
  fn builder_clamps_tick() {
    let winctl = Winctl::builder()
      .tick_interval(Duration::from_millis(1))
      .build_with_backend(FakeBackend::new());
    assert_eq!(winctl.tick_interval(), zorder::MIN_TICK);

    let winctl = Winctl::builder()
      .tick_interval(Duration::from_secs(10))
      .build_with_backend(FakeBackend::new());
    assert_eq!(winctl.tick_interval(), zorder::MAX_TICK);
  }

  #[test]
  fn default_tick_is_half_a_second() {
    let winctl = Winctl::builder().build_with_backend(FakeBackend::new());
    assert_eq!(winctl.tick_interval(), Duration::from_millis(500));
  }

  #[test]
  fn clones_share_assertions() {
    let fake = FakeBackend::new();
    let w = fake.open(
      "Editor",
      &crate::platform::fake::app(1, "editor"),
      crate::Rect::new(0, 0, 100, 100),
    );
    let a = Winctl::builder().build_with_backend(fake);
    let b = a.clone();
    a.assert_always_on_top(&w).unwrap();
    assert_eq!(b.active_assertions().len(), 1);
    assert!(b.cancel_assertion(&w).unwrap());
    assert!(a.active_assertions().is_empty());
  }
}
