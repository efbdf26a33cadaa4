/*! Running applications via `NSWorkspace` / `NSRunningApplication`. */

#![allow(unsafe_code)]
#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use crate::types::{AppRef, ProcessId};
use objc2::rc::Retained;
use objc2_app_kit::{
  NSApplicationActivationOptions, NSApplicationActivationPolicy, NSRunningApplication,
  NSWorkspace,
};

/// Applications with a Dock presence (regular activation policy).
pub(super) fn regular_apps() -> Vec<AppRef> {
  objc2::rc::autoreleasepool(|_pool| {
    NSWorkspace::sharedWorkspace()
      .runningApplications()
      .iter()
      .filter(|app| app.activationPolicy() == NSApplicationActivationPolicy::Regular)
      .filter_map(|app| {
        let pid = app.processIdentifier();
        (pid > 0).then(|| AppRef::new(ProcessId(pid as u32), display_name(&app)))
      })
      .collect()
  })
}

pub(super) fn frontmost_pid() -> Option<u32> {
  objc2::rc::autoreleasepool(|_pool| {
    NSWorkspace::sharedWorkspace()
      .frontmostApplication()
      .map(|app| app.processIdentifier())
      .filter(|&pid| pid > 0)
      .map(|pid| pid as u32)
  })
}

fn running(pid: u32) -> Option<Retained<NSRunningApplication>> {
  unsafe {
    objc2::msg_send![
      objc2::class!(NSRunningApplication),
      runningApplicationWithProcessIdentifier: pid as i32
    ]
  }
}

fn display_name(app: &NSRunningApplication) -> String {
  app
    .localizedName()
    .map(|name| name.to_string())
    .unwrap_or_default()
}

/// Localized name of `pid`, `None` once the process is gone.
pub(super) fn name_of(pid: u32) -> Option<String> {
  objc2::rc::autoreleasepool(|_pool| running(pid).map(|app| display_name(&app)))
}

pub(super) fn is_hidden(pid: u32) -> Option<bool> {
  objc2::rc::autoreleasepool(|_pool| running(pid).map(|app| app.isHidden()))
}

/// Hide or unhide the whole application. Returns whether the request was accepted.
pub(super) fn set_hidden(pid: u32, hidden: bool) -> bool {
  objc2::rc::autoreleasepool(|_pool| {
    running(pid).is_some_and(|app| if hidden { app.hide() } else { app.unhide() })
  })
}

pub(super) fn activate(pid: u32) -> bool {
  objc2::rc::autoreleasepool(|_pool| {
    running(pid)
      .is_some_and(|app| app.activateWithOptions(NSApplicationActivationOptions::ActivateAllWindows))
  })
}
