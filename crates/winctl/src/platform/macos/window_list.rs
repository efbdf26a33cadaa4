/*!
Window-server list (`CGWindowListCopyWindowInfo`).

The only macOS source of stable window numbers. Entries come front to back
for on-screen windows; minimized and other-space windows follow in no
useful order.
*/

#![allow(unsafe_code)]
#![allow(
  clippy::cast_possible_truncation,
  clippy::cast_sign_loss,
  clippy::ref_as_ptr
)]

use crate::types::Rect;
use objc2_core_foundation::{
  CFArray, CFBoolean, CFDictionary, CFNumber, CFNumberType, CFRetained, CFString, CGRect,
};
use objc2_core_graphics::{
  kCGNullWindowID, CGRectMakeWithDictionaryRepresentation, CGWindowListCopyWindowInfo,
  CGWindowListOption,
};
use std::ffi::c_void;

/// Owners whose layer-0 windows are system chrome, not applications.
const SKIP_OWNERS: &[&str] = &["Dock", "Window Server", "WindowManager", "Control Center"];

/// Smaller windows are status-bar popovers and drag proxies.
const MIN_SIDE: u32 = 50;

/// One entry of the window-server list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CgWindow {
  pub(super) id: u32,
  pub(super) pid: u32,
  pub(super) owner: String,
  pub(super) title: String,
  pub(super) bounds: Rect,
  pub(super) layer: i32,
  pub(super) on_screen: bool,
}

impl CgWindow {
  /// A normal-layer window of a real application.
  ///
  /// Off-screen windows only count when titled, which keeps minimized
  /// documents and drops the many invisible helper windows apps create.
  pub(super) fn is_app_window(&self) -> bool {
    self.layer == 0
      && self.pid != 0
      && self.bounds.width >= MIN_SIDE
      && self.bounds.height >= MIN_SIDE
      && !SKIP_OWNERS.contains(&self.owner.as_str())
      && (self.on_screen || !self.title.is_empty())
  }
}

/// Every window known to the window server, on-screen ones first.
pub(super) fn all() -> Vec<CgWindow> {
  let option = CGWindowListOption::OptionAll | CGWindowListOption::ExcludeDesktopElements;
  copy(option, kCGNullWindowID)
}

/// The window numbered `id`, if it still exists.
pub(super) fn lookup(id: u32) -> Option<CgWindow> {
  copy(CGWindowListOption::OptionIncludingWindow, id)
    .into_iter()
    .find(|w| w.id == id)
}

fn copy(option: CGWindowListOption, relative_to: u32) -> Vec<CgWindow> {
  // Dictionaries are autoreleased
  objc2::rc::autoreleasepool(|_pool| {
    let Some(list) = CGWindowListCopyWindowInfo(option, relative_to) else {
      return Vec::new();
    };
    let count = CFArray::count(&list);
    let mut windows = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
    for idx in 0..count {
      let dict = unsafe { CFArray::value_at_index(&list, idx) as *const CFDictionary };
      if dict.is_null() {
        continue;
      }
      let dict = unsafe { CFRetained::retain(std::ptr::NonNull::from(&*dict)) };
      if let Some(window) = parse(&dict) {
        windows.push(window);
      }
    }
    windows
  })
}

fn parse(dict: &CFDictionary) -> Option<CgWindow> {
  let id = number_value(dict, "kCGWindowNumber")?;
  let bounds = bounds_value(dict)?;
  Some(CgWindow {
    id: id as u32,
    pid: number_value(dict, "kCGWindowOwnerPID").unwrap_or(0) as u32,
    owner: string_value(dict, "kCGWindowOwnerName"),
    title: string_value(dict, "kCGWindowName"),
    bounds: to_rect(bounds),
    layer: number_value(dict, "kCGWindowLayer").unwrap_or(0),
    on_screen: bool_value(dict, "kCGWindowIsOnscreen"),
  })
}

pub(super) fn to_rect(r: CGRect) -> Rect {
  Rect::new(
    r.origin.x.round() as i32,
    r.origin.y.round() as i32,
    r.size.width.max(0.0).round() as u32,
    r.size.height.max(0.0).round() as u32,
  )
}

fn dictionary_value<T>(dict: &CFDictionary, key: &str) -> Option<*const T> {
  let key = CFString::from_str(key);
  let key_ref = key.as_ref() as *const CFString;
  if unsafe { CFDictionary::contains_ptr_key(dict, key_ref.cast()) } {
    let value = unsafe { CFDictionary::value(dict, key_ref.cast()) };
    (!value.is_null()).then_some(value.cast::<T>())
  } else {
    None
  }
}

fn number_value(dict: &CFDictionary, key: &str) -> Option<i32> {
  let number = dictionary_value::<CFNumber>(dict, key)?;
  let mut value: i32 = 0;
  let ok = unsafe {
    CFNumber::value(
      &*number,
      CFNumberType::IntType,
      std::ptr::addr_of_mut!(value).cast::<c_void>(),
    )
  };
  ok.then_some(value)
}

fn bool_value(dict: &CFDictionary, key: &str) -> bool {
  dictionary_value::<CFBoolean>(dict, key).is_some_and(|value| unsafe { CFBoolean::value(&*value) })
}

fn string_value(dict: &CFDictionary, key: &str) -> String {
  dictionary_value::<CFString>(dict, key)
    .map(|value| unsafe { (*value).to_string() })
    .unwrap_or_default()
}

fn bounds_value(dict: &CFDictionary) -> Option<CGRect> {
  let bounds = dictionary_value::<CFDictionary>(dict, "kCGWindowBounds")?;
  let mut rect = CGRect::default();
  let ok = unsafe { CGRectMakeWithDictionaryRepresentation(Some(&*bounds), &mut rect) };
  ok.then_some(rect)
}
