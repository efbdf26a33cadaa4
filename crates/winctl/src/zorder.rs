/*!
Z-order assertions.

No backend offers a reliable sticky "always on top / bottom" flag, so
persistence is modelled as continuous re-assertion: each active assertion
owns one background thread that re-issues the native raise or lower every
tick until it is cancelled, replaced, or the window disappears.

Lock order: the assertion map lock is held for the whole of every
assert/cancel call (including joining the old thread). Enforcement threads
never touch the map, so joining under the lock cannot deadlock.
*/

use crate::platform::Backend;
use crate::types::{
  AssertionState, WindowRef, WinctlError, WinctlResult, ZOrderAssertion, ZOrderMode,
};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub(crate) const MIN_TICK: Duration = Duration::from_millis(20);
pub(crate) const MAX_TICK: Duration = Duration::from_secs(1);
pub(crate) const DEFAULT_TICK: Duration = Duration::from_millis(500);

/// Clamp an enforcement interval into `[MIN_TICK, MAX_TICK]`.
pub(crate) fn clamp_tick(tick: Duration) -> Duration {
  tick.clamp(MIN_TICK, MAX_TICK)
}

/// Interruptible stop flag.
#[derive(Debug, Default)]
struct StopSignal {
  stopped: Mutex<bool>,
  cvar: Condvar,
}

impl StopSignal {
  fn stop(&self) {
    *self.stopped.lock() = true;
    self.cvar.notify_all();
  }

  fn is_stopped(&self) -> bool {
    *self.stopped.lock()
  }

  /// Sleep for `timeout` or until stopped. Returns true if stopped.
  fn wait(&self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut stopped = self.stopped.lock();
    while !*stopped {
      if self.cvar.wait_until(&mut stopped, deadline).timed_out() {
        break;
      }
    }
    *stopped
  }
}

/// State shared between an assertion and its enforcement thread.
#[derive(Debug, Default)]
struct Shared {
  stop: StopSignal,
  enforcements: AtomicU64,
  /// Set by the thread when it exits on its own.
  finished: AtomicBool,
}

/// One running (or self-stopped) assertion. Stops and joins on drop.
struct ActiveAssertion {
  window: WindowRef,
  mode: ZOrderMode,
  shared: Arc<Shared>,
  thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ActiveAssertion {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ActiveAssertion")
      .field("window", &self.window)
      .field("mode", &self.mode)
      .finish_non_exhaustive()
  }
}

impl ActiveAssertion {
  fn is_running(&self) -> bool {
    !self.shared.finished.load(Ordering::SeqCst) && !self.shared.stop.is_stopped()
  }

  fn snapshot(&self) -> ZOrderAssertion {
    ZOrderAssertion {
      window: self.window.clone(),
      mode: self.mode,
      state: if self.is_running() {
        AssertionState::Active
      } else {
        AssertionState::Stopped
      },
      enforcements: self.shared.enforcements.load(Ordering::SeqCst),
    }
  }
}

impl Drop for ActiveAssertion {
  fn drop(&mut self) {
    self.shared.stop.stop();
    if let Some(t) = self.thread.take() {
      drop(t.join());
    }
  }
}

/// Owns every z-order assertion for one backend.
pub(crate) struct ZOrderController<B: Backend> {
  backend: Arc<B>,
  tick: Duration,
  assertions: Mutex<HashMap<WindowRef, ActiveAssertion>>,
  next_id: AtomicU64,
}

impl<B: Backend> std::fmt::Debug for ZOrderController<B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ZOrderController")
      .field("tick", &self.tick)
      .finish_non_exhaustive()
  }
}

impl<B: Backend> ZOrderController<B> {
  pub(crate) fn new(backend: Arc<B>, tick: Duration) -> Self {
    Self {
      backend,
      tick: clamp_tick(tick),
      assertions: Mutex::new(HashMap::new()),
      next_id: AtomicU64::new(1),
    }
  }

  pub(crate) const fn tick(&self) -> Duration {
    self.tick
  }

  /// Start enforcing `mode` for `window`, replacing any existing assertion.
  ///
  /// The first enforcement runs on the caller's thread; if it fails the error
  /// is returned, the native sticky flag is released and nothing is left
  /// running.
  pub(crate) fn assert(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<ZOrderAssertion> {
    let mut assertions = self.assertions.lock();
    assertions.retain(|_, a| a.is_running());

    if !self.backend.is_alive(window) {
      return Err(WinctlError::InvalidHandle(window.clone()));
    }
    if mode == ZOrderMode::Bottom && !self.backend.capabilities().send_behind {
      return Err(WinctlError::unsupported(
        self.backend.kind(),
        "assert_always_on_bottom",
      ));
    }

    if let Some(previous) = assertions.remove(window) {
      let previous_mode = previous.mode;
      drop(previous);
      if previous_mode != mode {
        if let Err(e) = self.backend.release_z_order(window, previous_mode) {
          log::debug!("Releasing {previous_mode} on {window} failed: {e}");
        }
      }
      log::debug!("Replaced {previous_mode} assertion on {window} with {mode}");
    }

    if let Err(e) = self.backend.enforce_z_order(window, mode) {
      // Nothing tracks the window from here on, so no flag may stay behind
      if let Err(release) = self.backend.release_z_order(window, mode) {
        log::debug!("Releasing {mode} on {window} after failed assert: {release}");
      }
      return Err(e);
    }

    let shared = Arc::new(Shared::default());
    shared.enforcements.store(1, Ordering::SeqCst);

    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let thread = {
      let backend = Arc::clone(&self.backend);
      let window = window.clone();
      let shared = Arc::clone(&shared);
      let tick = self.tick;
      thread::Builder::new()
        .name(format!("winctl-zorder-{id}"))
        .spawn(move || enforcement_loop(&*backend, &window, mode, &shared, tick))
        .map_err(|e| WinctlError::Internal(format!("failed to spawn enforcement thread: {e}")))?
    };

    let active = ActiveAssertion {
      window: window.clone(),
      mode,
      shared,
      thread: Some(thread),
    };
    let snapshot = active.snapshot();
    assertions.insert(window.clone(), active);
    log::debug!("Asserting {window} always on {mode} every {:?}", self.tick);
    Ok(snapshot)
  }

  /// Stop any assertion on `window` and release its native sticky flag.
  ///
  /// Returns whether an assertion was still running. Fails with
  /// `InvalidHandle` if the window is gone, after the task has been stopped.
  pub(crate) fn cancel(&self, window: &WindowRef) -> WinctlResult<bool> {
    let mut assertions = self.assertions.lock();
    let removed = assertions.remove(window);
    assertions.retain(|_, a| a.is_running());

    let released = removed.map(|active| {
      let was_running = active.is_running();
      let mode = active.mode;
      drop(active);
      (was_running, mode)
    });

    if !self.backend.is_alive(window) {
      return Err(WinctlError::InvalidHandle(window.clone()));
    }

    match released {
      Some((was_running, mode)) => {
        self.backend.release_z_order(window, mode)?;
        log::debug!("Cancelled {mode} assertion on {window}");
        Ok(was_running)
      }
      None => Ok(false),
    }
  }

  /// Snapshot of the assertion on `window`, including a self-stopped one.
  pub(crate) fn get(&self, window: &WindowRef) -> Option<ZOrderAssertion> {
    self.assertions.lock().get(window).map(ActiveAssertion::snapshot)
  }

  pub(crate) fn active(&self) -> Vec<ZOrderAssertion> {
    self
      .assertions
      .lock()
      .values()
      .filter(|a| a.is_running())
      .map(ActiveAssertion::snapshot)
      .collect()
  }
}

impl<B: Backend> Drop for ZOrderController<B> {
  fn drop(&mut self) {
    let assertions: Vec<ActiveAssertion> = self.assertions.get_mut().drain().map(|(_, a)| a).collect();
    for active in assertions {
      let window = active.window.clone();
      let mode = active.mode;
      drop(active);
      if self.backend.is_alive(&window) {
        if let Err(e) = self.backend.release_z_order(&window, mode) {
          log::debug!("Releasing {mode} on {window} at shutdown failed: {e}");
        }
      }
    }
  }
}

fn enforcement_loop<B: Backend + ?Sized>(
  backend: &B,
  window: &WindowRef,
  mode: ZOrderMode,
  shared: &Shared,
  tick: Duration,
) {
  while !shared.stop.wait(tick) {
    match backend.enforce_z_order(window, mode) {
      Ok(()) => {
        shared.enforcements.fetch_add(1, Ordering::SeqCst);
      }
      Err(e) if e.is_transient() => {
        log::warn!("Enforcing {mode} on {window} failed, retrying next tick: {e}");
      }
      Err(WinctlError::InvalidHandle(_)) => {
        log::debug!("{window} is gone, stopping {mode} assertion");
        break;
      }
      Err(e) => {
        log::error!("Stopping {mode} assertion on {window}: {e}");
        break;
      }
    }
  }
  shared.finished.store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::fake::{app, FakeBackend, FULL_CAPABILITIES};
  use crate::types::{BackendKind, Capabilities, Rect};

  const TICK: Duration = MIN_TICK;

  fn setup() -> (FakeBackend, ZOrderController<FakeBackend>, WindowRef) {
    let fake = FakeBackend::new();
    let w = fake.open("Editor", &app(10, "editor"), Rect::new(0, 0, 800, 600));
    let controller = ZOrderController::new(Arc::new(fake.clone()), TICK);
    (fake, controller, w)
  }

  /// Poll until `f` holds, failing after two seconds.
  fn eventually(mut f: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !f() {
      assert!(Instant::now() < deadline, "condition not reached in time");
      thread::sleep(Duration::from_millis(5));
    }
  }

  mod tick_bounds {
    use super::*;

    #[test]
    fn clamps_both_ends() {
      assert_eq!(clamp_tick(Duration::from_millis(1)), MIN_TICK);
      assert_eq!(clamp_tick(Duration::from_secs(30)), MAX_TICK);
      assert_eq!(clamp_tick(DEFAULT_TICK), DEFAULT_TICK);
    }
  }

  mod assert {
    use super::*;

    #[test]
    fn first_enforcement_is_synchronous() {
      let (fake, controller, w) = setup();
      let snapshot = controller.assert(&w, ZOrderMode::Top).unwrap();
      assert_eq!(snapshot.state, AssertionState::Active);
      assert_eq!(snapshot.enforcements, 1);
      assert!(fake.enforcements(&w, ZOrderMode::Top) >= 1);
      assert_eq!(fake.sticky(&w), Some(ZOrderMode::Top));
    }

    #[test]
    fn keeps_enforcing_every_tick() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      eventually(|| fake.enforcements(&w, ZOrderMode::Top) >= 4);
      assert!(controller.get(&w).unwrap().enforcements >= 3);
    }

    #[test]
    fn keeps_window_on_top_of_newcomers() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      let other = fake.open("Other", &app(11, "other"), Rect::new(0, 0, 10, 10));
      fake.raise_to_top(&other).unwrap();
      eventually(|| fake.stack().first() == Some(&1));
    }

    #[test]
    fn replacing_mode_leaves_exactly_one_assertion() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      controller.assert(&w, ZOrderMode::Bottom).unwrap();

      let active = controller.active();
      assert_eq!(active.len(), 1);
      assert_eq!(active[0].mode, ZOrderMode::Bottom);

      let top = fake.enforcements(&w, ZOrderMode::Top);
      eventually(|| fake.enforcements(&w, ZOrderMode::Bottom) >= 3);
      assert_eq!(fake.enforcements(&w, ZOrderMode::Top), top, "old task must be gone");
      assert_eq!(fake.sticky(&w), Some(ZOrderMode::Bottom));
    }

    #[test]
    fn first_enforcement_failure_is_returned_and_nothing_runs() {
      let (fake, controller, w) = setup();
      fake.fail_enforcements(1);
      let err = controller.assert(&w, ZOrderMode::Top).unwrap_err();
      assert!(err.is_transient());
      assert!(controller.get(&w).is_none());
      assert!(controller.active().is_empty());
    }

    #[test]
    fn failed_reassert_releases_sticky_flag() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      assert_eq!(fake.sticky(&w), Some(ZOrderMode::Top));

      // The running task may eat some injected failures before it is joined
      fake.fail_enforcements(u32::MAX);
      assert!(controller.assert(&w, ZOrderMode::Top).unwrap_err().is_transient());
      assert!(controller.get(&w).is_none());
      assert_eq!(fake.sticky(&w), None, "window left pinned with nothing tracking it");
      assert!(!controller.cancel(&w).unwrap());
    }

    #[test]
    fn dead_window_is_rejected() {
      let (fake, controller, w) = setup();
      fake.destroy(&w);
      assert!(controller.assert(&w, ZOrderMode::Top).unwrap_err().is_invalid_handle());
      assert!(controller.active().is_empty());
    }

    #[test]
    fn bottom_without_send_behind_is_unsupported() {
      let fake = FakeBackend::with_capabilities(
        BackendKind::MacOs,
        Capabilities {
          send_behind: false,
          ..FULL_CAPABILITIES
        },
      );
      let w = fake.open("Finder", &app(1, "Finder"), Rect::new(0, 0, 100, 100));
      let controller = ZOrderController::new(Arc::new(fake.clone()), TICK);
      let err = controller.assert(&w, ZOrderMode::Bottom).unwrap_err();
      assert_eq!(
        err,
        WinctlError::unsupported(BackendKind::MacOs, "assert_always_on_bottom")
      );
      assert_eq!(fake.mutations(), 0);
    }
  }

  mod cancel {
    use super::*;

    #[test]
    fn freezes_enforcement_and_releases_flag() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      eventually(|| fake.enforcements(&w, ZOrderMode::Top) >= 2);

      assert!(controller.cancel(&w).unwrap());
      let frozen = fake.enforcements(&w, ZOrderMode::Top);
      thread::sleep(TICK * 3);
      assert_eq!(fake.enforcements(&w, ZOrderMode::Top), frozen);
      assert_eq!(fake.sticky(&w), None);
      assert!(controller.get(&w).is_none());
    }

    #[test]
    fn without_assertion_returns_false() {
      let (_fake, controller, w) = setup();
      assert!(!controller.cancel(&w).unwrap());
    }

    #[test]
    fn on_dead_window_stops_task_then_fails() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      fake.destroy(&w);
      assert!(controller.cancel(&w).unwrap_err().is_invalid_handle());
      assert!(controller.active().is_empty());
    }
  }

  mod implicit_stop {
    use super::*;

    #[test]
    fn window_destroyed_mid_assertion() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      fake.destroy(&w);

      eventually(|| controller.get(&w).is_some_and(|a| a.state == AssertionState::Stopped));
      let frozen = fake.enforcements(&w, ZOrderMode::Top);
      thread::sleep(TICK * 3);
      assert_eq!(fake.enforcements(&w, ZOrderMode::Top), frozen);
      assert!(controller.active().is_empty());
    }

    #[test]
    fn transient_failures_are_retried() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      fake.fail_enforcements(3);
      eventually(|| fake.enforcements(&w, ZOrderMode::Top) >= 3);
      assert_eq!(controller.get(&w).unwrap().state, AssertionState::Active);
    }

    #[test]
    fn stopped_is_terminal_and_reassert_creates_new_assertion() {
      let (fake, controller, w) = setup();
      controller.assert(&w, ZOrderMode::Top).unwrap();
      let other = fake.open("Other", &app(11, "other"), Rect::new(0, 0, 10, 10));
      controller.assert(&other, ZOrderMode::Top).unwrap();
      fake.destroy(&other);
      eventually(|| controller.get(&other).is_some_and(|a| a.state == AssertionState::Stopped));

      let fresh = controller.assert(&w, ZOrderMode::Bottom).unwrap();
      assert_eq!(fresh.state, AssertionState::Active);
      assert_eq!(fresh.enforcements, 1);
      assert!(controller.get(&other).is_none(), "stopped entries are pruned");
    }
  }

  mod contention {
    use super::*;

    #[test]
    fn racing_asserts_and_cancels_leave_one_assertion() {
      let (fake, controller, w) = setup();
      let controller = Arc::new(controller);

      let workers: Vec<_> = (0..6)
        .map(|i| {
          let controller = Arc::clone(&controller);
          let w = w.clone();
          thread::spawn(move || {
            for round in 0..15 {
              match (i + round) % 3 {
                0 => drop(controller.assert(&w, ZOrderMode::Top)),
                1 => drop(controller.assert(&w, ZOrderMode::Bottom)),
                _ => drop(controller.cancel(&w)),
              }
            }
          })
        })
        .collect();
      for worker in workers {
        worker.join().unwrap();
      }

      let active = controller.active();
      assert!(active.len() <= 1, "more than one assertion: {active:?}");

      let count = |mode| fake.enforcements(&w, mode);
      match active.first().map(|a| a.mode) {
        Some(mode) => {
          let other = match mode {
            ZOrderMode::Top => ZOrderMode::Bottom,
            ZOrderMode::Bottom => ZOrderMode::Top,
          };
          let (running, idle) = (count(mode), count(other));
          eventually(|| count(mode) > running);
          assert_eq!(count(other), idle, "orphaned {other} enforcement");
        }
        None => {
          let before = (count(ZOrderMode::Top), count(ZOrderMode::Bottom));
          thread::sleep(TICK * 5);
          let after = (count(ZOrderMode::Top), count(ZOrderMode::Bottom));
          assert_eq!(before, after, "orphaned enforcement thread");
        }
      }
    }
  }

  #[test]
  fn drop_stops_every_task_and_releases_flags() {
    let (fake, controller, w) = setup();
    controller.assert(&w, ZOrderMode::Top).unwrap();
    drop(controller);
    let frozen = fake.enforcements(&w, ZOrderMode::Top);
    thread::sleep(TICK * 3);
    assert_eq!(fake.enforcements(&w, ZOrderMode::Top), frozen);
    assert_eq!(fake.sticky(&w), None);
  }
}
