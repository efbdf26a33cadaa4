/*!
Win32 backend.

- Enumeration via `EnumWindows`, which yields the z-order front to back.
  Invisible, cloaked (other virtual desktop), tool and untitled windows are
  skipped.
- Always-on-top uses the native `HWND_TOPMOST` flag, re-asserted each tick
  because other topmost windows can still climb above it. There is no
  bottom-most flag, so bottom assertions re-issue `HWND_BOTTOM`.
- Input pass-through toggles `WS_EX_TRANSPARENT`, adding `WS_EX_LAYERED`
  at full opacity when the window was not already layered.
- Windows exposes no query for a flashing taskbar button: the foreground
  window reports `AlertState::None`, every other window `Unknown`.
- A handle whose owning process differs from the one recorded in the ref
  has been recycled and is treated as closed.
- Screens are the display monitors, `rect` includes the invisible resize
  borders and `client_rect` is the client area in screen coordinates.
*/

#![allow(unsafe_code)]

use crate::platform::Backend;
use crate::types::{
  AlertState, AppRef, BackendKind, Capabilities, Point, ProcessId, Rect, Screen, WindowHandle,
  WindowRef, WindowState, WinctlError, WinctlResult, ZOrderMode,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ffi::c_void;
use windows::core::BOOL;
use windows::Win32::Foundation::{
  CloseHandle, GetLastError, SetLastError, COLORREF, ERROR_ACCESS_DENIED,
  ERROR_INVALID_WINDOW_HANDLE, HWND, LPARAM, POINT, RECT, WIN32_ERROR, WPARAM,
};
use windows::Win32::Graphics::Dwm::{DwmGetWindowAttribute, DWMWA_CLOAKED};
use windows::Win32::Graphics::Gdi::{
  ClientToScreen, EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFOEXW,
};
use windows::Win32::System::ProcessStatus::K32GetModuleFileNameExW;
use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};
use windows::Win32::UI::WindowsAndMessaging::{
  EnumWindows, GetAncestor, GetClientRect, GetCursorPos, GetForegroundWindow, GetWindowLongW,
  GetWindowPlacement, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
  GetWindowThreadProcessId, IsIconic, IsWindow, IsWindowVisible, IsZoomed, PostMessageW,
  SetForegroundWindow, SetLayeredWindowAttributes, SetWindowLongW, SetWindowPos, ShowWindow,
  WindowFromPoint, GA_ROOT, GWL_EXSTYLE, HWND_BOTTOM, HWND_NOTOPMOST, HWND_TOP, HWND_TOPMOST,
  LWA_ALPHA, SET_WINDOW_POS_FLAGS, SHOW_WINDOW_CMD, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE,
  SWP_NOSIZE, SWP_NOZORDER, SW_HIDE, SW_MAXIMIZE, SW_MINIMIZE, SW_RESTORE, SW_SHOW,
  WINDOWPLACEMENT, WM_CLOSE, WS_EX_APPWINDOW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
  WS_EX_TRANSPARENT,
};

const CAPABILITIES: Capabilities = Capabilities {
  provides_stack_order: true,
  send_behind: true,
  accepts_input: true,
  alert_state: false,
  per_window_visibility: true,
  client_area: true,
};

const RESTACK_FLAGS: SET_WINDOW_POS_FLAGS =
  SET_WINDOW_POS_FLAGS(SWP_NOMOVE.0 | SWP_NOSIZE.0 | SWP_NOACTIVATE.0);

/// Shell windows that pass every style filter but are not applications.
const SKIP_TITLES: &[&str] = &["Program Manager", "Windows Input Experience"];

#[derive(Debug, Default)]
pub struct Win32Backend {
  /// Windows we made layered for input pass-through, so the flag can be
  /// removed again when input is re-enabled.
  layered_by_us: Mutex<HashSet<isize>>,
}

impl Win32Backend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Resolve a ref to a live `HWND` still owned by the ref's process.
  fn hwnd(window: &WindowRef) -> WinctlResult<HWND> {
    let WindowHandle::Win32(raw) = window.handle else {
      return Err(WinctlError::InvalidHandle(window.clone()));
    };
    let hwnd = HWND(raw as *mut c_void);
    let live = unsafe { IsWindow(Some(hwnd)) }.as_bool();
    if live && window.is_owned_by(ProcessId(process_id(hwnd))) {
      Ok(hwnd)
    } else {
      Err(WinctlError::InvalidHandle(window.clone()))
    }
  }

  fn window_ref(hwnd: HWND) -> WindowRef {
    let pid = process_id(hwnd);
    WindowRef::new(
      WindowHandle::Win32(hwnd.0 as isize),
      (pid != 0).then_some(ProcessId(pid)),
      window_text(hwnd),
    )
  }

  fn show(window: &WindowRef, cmd: SHOW_WINDOW_CMD) -> WinctlResult<()> {
    let hwnd = Self::hwnd(window)?;
    // Return value is the previous visibility, not an error flag
    let _ = unsafe { ShowWindow(hwnd, cmd) };
    Ok(())
  }

  fn restack(window: &WindowRef, after: HWND) -> WinctlResult<()> {
    let hwnd = Self::hwnd(window)?;
    unsafe { SetWindowPos(hwnd, Some(after), 0, 0, 0, 0, RESTACK_FLAGS) }
      .map_err(|e| map_error(window, &e))
  }
}

/// Classify a failed Win32 call.
fn map_error(window: &WindowRef, e: &windows::core::Error) -> WinctlError {
  let code = e.code();
  if code == ERROR_INVALID_WINDOW_HANDLE.to_hresult() {
    WinctlError::InvalidHandle(window.clone())
  } else if code == ERROR_ACCESS_DENIED.to_hresult() {
    WinctlError::PermissionDenied(format!("{window}: {e}"))
  } else {
    WinctlError::transient(format!("{window}: {e}"))
  }
}

/// Extended style for a window that should (not) take input. The layered
/// bit is only dropped when `drop_layered` says we added it.
const fn input_style(style: u32, accepts: bool, drop_layered: bool) -> u32 {
  if !accepts {
    return style | WS_EX_TRANSPARENT.0 | WS_EX_LAYERED.0;
  }
  let style = style & !WS_EX_TRANSPARENT.0;
  if drop_layered {
    style & !WS_EX_LAYERED.0
  } else {
    style
  }
}

/// `SetWindowLongW` returns the previous value, so zero only means failure
/// when the last error was set.
#[allow(clippy::cast_possible_wrap)]
fn set_ex_style(window: &WindowRef, hwnd: HWND, style: u32) -> WinctlResult<()> {
  unsafe {
    SetLastError(WIN32_ERROR(0));
    if SetWindowLongW(hwnd, GWL_EXSTYLE, style as i32) == 0 {
      let code = GetLastError();
      if code != WIN32_ERROR(0) {
        return Err(map_error(
          window,
          &windows::core::Error::from_hresult(code.to_hresult()),
        ));
      }
    }
  }
  Ok(())
}

fn window_text(hwnd: HWND) -> String {
  unsafe {
    let len = GetWindowTextLengthW(hwnd);
    if len <= 0 {
      return String::new();
    }
    let mut buf: Vec<u16> = vec![0; usize::try_from(len).unwrap_or(0) + 1];
    let copied = usize::try_from(GetWindowTextW(hwnd, &mut buf)).unwrap_or(0);
    String::from_utf16_lossy(buf.get(..copied).unwrap_or_default())
  }
}

fn process_id(hwnd: HWND) -> u32 {
  let mut pid: u32 = 0;
  unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
  pid
}

fn ex_style(hwnd: HWND) -> u32 {
  #[allow(clippy::cast_sign_loss)]
  let style = unsafe { GetWindowLongW(hwnd, GWL_EXSTYLE) } as u32;
  style
}

fn is_cloaked(hwnd: HWND) -> bool {
  let mut cloaked: u32 = 0;
  let result = unsafe {
    DwmGetWindowAttribute(
      hwnd,
      DWMWA_CLOAKED,
      std::ptr::addr_of_mut!(cloaked).cast::<c_void>(),
      // Size of a DWORD
      4,
    )
  };
  result.is_ok() && cloaked != 0
}

/// Top-level application windows only.
fn is_app_window(hwnd: HWND) -> bool {
  if !unsafe { IsWindowVisible(hwnd) }.as_bool() {
    return false;
  }
  let style = ex_style(hwnd);
  let tool = style & WS_EX_TOOLWINDOW.0 != 0 && style & WS_EX_APPWINDOW.0 == 0;
  if tool || style & WS_EX_NOACTIVATE.0 != 0 || is_cloaked(hwnd) {
    return false;
  }
  let title = window_text(hwnd);
  !title.is_empty() && !SKIP_TITLES.contains(&title.as_str())
}

unsafe extern "system" fn enum_windows_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
  let handles = unsafe { &mut *(lparam.0 as *mut Vec<HWND>) };
  if is_app_window(hwnd) {
    handles.push(hwnd);
  }
  BOOL::from(true)
}

fn enumerate() -> WinctlResult<Vec<HWND>> {
  let mut handles: Vec<HWND> = Vec::new();
  unsafe {
    EnumWindows(
      Some(enum_windows_callback),
      LPARAM(std::ptr::addr_of_mut!(handles) as isize),
    )
  }
  .map_err(|e| WinctlError::transient(format!("EnumWindows failed: {e}")))?;
  Ok(handles)
}

/// Executable file name (e.g. `notepad.exe`) of a process.
fn process_executable(pid: u32) -> Option<String> {
  unsafe {
    let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
    let mut buffer: Vec<u16> = vec![0; 260];
    let len = K32GetModuleFileNameExW(Some(handle), None, &mut buffer);
    let _ = CloseHandle(handle);
    if len == 0 {
      return None;
    }
    let path = String::from_utf16_lossy(buffer.get(..len as usize)?);
    path.rsplit('\\').next().map(str::to_owned)
  }
}

fn app_for(pid: u32, fallback: &str) -> AppRef {
  let name = process_executable(pid)
    .map(|exe| exe.trim_end_matches(".exe").to_owned())
    .unwrap_or_else(|| fallback.to_owned());
  AppRef::new(ProcessId(pid), name)
}

unsafe extern "system" fn enum_monitors_callback(
  hmonitor: HMONITOR,
  _hdc: HDC,
  _clip: *mut RECT,
  lparam: LPARAM,
) -> BOOL {
  let screens = unsafe { &mut *(lparam.0 as *mut Vec<Screen>) };
  let mut info = MONITORINFOEXW::default();
  info.monitorInfo.cbSize = u32::try_from(std::mem::size_of::<MONITORINFOEXW>()).unwrap_or(0);
  if unsafe { GetMonitorInfoW(hmonitor, std::ptr::addr_of_mut!(info).cast()) }.as_bool() {
    let len = info
      .szDevice
      .iter()
      .position(|&c| c == 0)
      .unwrap_or(info.szDevice.len());
    screens.push(Screen {
      name: String::from_utf16_lossy(info.szDevice.get(..len).unwrap_or_default()),
      // MONITORINFOF_PRIMARY
      primary: info.monitorInfo.dwFlags & 1 != 0,
      rect: to_rect(info.monitorInfo.rcMonitor),
      work_area: to_rect(info.monitorInfo.rcWork),
    });
  }
  // A monitor that fails to answer does not stop the walk
  BOOL::from(true)
}

fn to_rect(r: RECT) -> Rect {
  Rect::from_edges(r.left, r.top, r.right, r.bottom)
}

fn clamp_i32(v: u32) -> i32 {
  i32::try_from(v).unwrap_or(i32::MAX)
}

impl Backend for Win32Backend {
  fn kind(&self) -> BackendKind {
    BackendKind::Win32
  }

  fn capabilities(&self) -> Capabilities {
    CAPABILITIES
  }

  fn all_windows(&self) -> WinctlResult<Vec<WindowRef>> {
    let windows: Vec<WindowRef> = enumerate()?.into_iter().map(Self::window_ref).collect();
    log::debug!("Enumerated {} windows", windows.len());
    Ok(windows)
  }

  fn all_apps(&self) -> WinctlResult<Vec<AppRef>> {
    let mut seen = HashSet::new();
    let mut apps = Vec::new();
    for hwnd in enumerate()? {
      let pid = process_id(hwnd);
      if pid != 0 && seen.insert(pid) {
        apps.push(app_for(pid, &window_text(hwnd)));
      }
    }
    Ok(apps)
  }

  fn active_window(&self) -> WinctlResult<Option<WindowRef>> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.is_invalid() {
      return Ok(None);
    }
    Ok(Some(Self::window_ref(hwnd)))
  }

  fn window_at(&self, point: Point) -> WinctlResult<Option<WindowRef>> {
    let hwnd = unsafe { WindowFromPoint(POINT { x: point.x, y: point.y }) };
    if hwnd.is_invalid() {
      return Ok(None);
    }
    let root = unsafe { GetAncestor(hwnd, GA_ROOT) };
    let target = if root.is_invalid() { hwnd } else { root };
    Ok(Some(Self::window_ref(target)))
  }

  fn is_alive(&self, window: &WindowRef) -> bool {
    Self::hwnd(window).is_ok()
  }

  fn title(&self, window: &WindowRef) -> WinctlResult<String> {
    let hwnd = Self::hwnd(window)?;
    Ok(window_text(hwnd))
  }

  fn app_of(&self, window: &WindowRef) -> WinctlResult<AppRef> {
    let hwnd = Self::hwnd(window)?;
    Ok(app_for(process_id(hwnd), &window_text(hwnd)))
  }

  fn rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    let hwnd = Self::hwnd(window)?;
    unsafe {
      if IsIconic(hwnd).as_bool() {
        // An iconic window sits at (-32000, -32000); report where it will restore to
        let mut placement = WINDOWPLACEMENT {
          length: u32::try_from(std::mem::size_of::<WINDOWPLACEMENT>()).unwrap_or(0),
          ..Default::default()
        };
        GetWindowPlacement(hwnd, &mut placement).map_err(|e| map_error(window, &e))?;
        return Ok(to_rect(placement.rcNormalPosition));
      }
      let mut r = RECT::default();
      GetWindowRect(hwnd, &mut r).map_err(|e| map_error(window, &e))?;
      Ok(to_rect(r))
    }
  }

  fn set_rect(&self, window: &WindowRef, rect: Rect) -> WinctlResult<()> {
    let hwnd = Self::hwnd(window)?;
    unsafe {
      SetWindowPos(
        hwnd,
        None,
        rect.x,
        rect.y,
        clamp_i32(rect.width),
        clamp_i32(rect.height),
        SWP_NOZORDER | SWP_NOACTIVATE,
      )
    }
    .map_err(|e| map_error(window, &e))
  }

  fn client_rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    let hwnd = Self::hwnd(window)?;
    let mut r = RECT::default();
    unsafe { GetClientRect(hwnd, &mut r) }.map_err(|e| map_error(window, &e))?;
    let mut origin = POINT::default();
    if !unsafe { ClientToScreen(hwnd, &mut origin) }.as_bool() {
      return Err(WinctlError::transient(format!(
        "ClientToScreen failed for {window}"
      )));
    }
    Ok(Rect::new(
      origin.x,
      origin.y,
      r.right.unsigned_abs(),
      r.bottom.unsigned_abs(),
    ))
  }

  fn screens(&self) -> WinctlResult<Vec<Screen>> {
    let mut screens: Vec<Screen> = Vec::new();
    let walked = unsafe {
      EnumDisplayMonitors(
        None,
        None,
        Some(enum_monitors_callback),
        LPARAM(std::ptr::addr_of_mut!(screens) as isize),
      )
    };
    if !walked.as_bool() {
      return Err(WinctlError::transient("EnumDisplayMonitors failed"));
    }
    log::debug!("Enumerated {} monitors", screens.len());
    Ok(screens)
  }

  fn cursor_position(&self) -> WinctlResult<Point> {
    let mut point = POINT::default();
    unsafe { GetCursorPos(&mut point) }
      .map_err(|e| WinctlError::transient(format!("GetCursorPos failed: {e}")))?;
    Ok(Point::new(point.x, point.y))
  }

  fn state(&self, window: &WindowRef) -> WinctlResult<WindowState> {
    let hwnd = Self::hwnd(window)?;
    unsafe {
      Ok(WindowState {
        visible: IsWindowVisible(hwnd).as_bool(),
        minimized: IsIconic(hwnd).as_bool(),
        maximized: IsZoomed(hwnd).as_bool(),
        active: GetForegroundWindow() == hwnd,
      })
    }
  }

  fn set_visible(&self, window: &WindowRef, visible: bool) -> WinctlResult<()> {
    Self::show(window, if visible { SW_SHOW } else { SW_HIDE })
  }

  fn minimize(&self, window: &WindowRef) -> WinctlResult<()> {
    Self::show(window, SW_MINIMIZE)
  }

  fn maximize(&self, window: &WindowRef) -> WinctlResult<()> {
    Self::show(window, SW_MAXIMIZE)
  }

  fn restore(&self, window: &WindowRef) -> WinctlResult<()> {
    Self::show(window, SW_RESTORE)
  }

  fn close(&self, window: &WindowRef) -> WinctlResult<()> {
    let hwnd = Self::hwnd(window)?;
    unsafe { PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0)) }
      .map_err(|e| map_error(window, &e))
  }

  fn activate(&self, window: &WindowRef) -> WinctlResult<()> {
    let hwnd = Self::hwnd(window)?;
    unsafe {
      if IsIconic(hwnd).as_bool() {
        let _ = ShowWindow(hwnd, SW_RESTORE);
      }
      if SetForegroundWindow(hwnd).as_bool() {
        Ok(())
      } else {
        // Foreground lock: only the foreground process may steal focus
        Err(WinctlError::transient(format!(
          "SetForegroundWindow refused for {window}"
        )))
      }
    }
  }

  fn raise_to_top(&self, window: &WindowRef) -> WinctlResult<()> {
    Self::restack(window, HWND_TOP)
  }

  fn lower_to_bottom(&self, window: &WindowRef) -> WinctlResult<()> {
    Self::restack(window, HWND_BOTTOM)
  }

  fn enforce_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    match mode {
      ZOrderMode::Top => Self::restack(window, HWND_TOPMOST),
      ZOrderMode::Bottom => Self::restack(window, HWND_BOTTOM),
    }
  }

  fn release_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    match mode {
      ZOrderMode::Top => Self::restack(window, HWND_NOTOPMOST),
      ZOrderMode::Bottom => Ok(()),
    }
  }

  fn set_accepts_input(&self, window: &WindowRef, accepts: bool) -> WinctlResult<()> {
    let hwnd = Self::hwnd(window)?;
    let WindowHandle::Win32(raw) = window.handle else {
      return Err(WinctlError::InvalidHandle(window.clone()));
    };
    let style = ex_style(hwnd);
    let mut layered = self.layered_by_us.lock();
    let layering = !accepts && style & WS_EX_LAYERED.0 == 0;
    let new_style = input_style(style, accepts, accepts && layered.contains(&raw));

    set_ex_style(window, hwnd, new_style)?;
    if layering {
      layered.insert(raw);
    } else if accepts {
      layered.remove(&raw);
    }

    unsafe {
      if layering {
        // A freshly layered window is invisible until it has attributes
        SetLayeredWindowAttributes(hwnd, COLORREF(0), 255, LWA_ALPHA)
          .map_err(|e| map_error(window, &e))?;
      }
      // Cached frame data is only refreshed by a frame change
      SetWindowPos(
        hwnd,
        None,
        0,
        0,
        0,
        0,
        RESTACK_FLAGS | SWP_NOZORDER | SWP_FRAMECHANGED,
      )
      .map_err(|e| map_error(window, &e))?;
    }
    log::debug!("{window} accepts input: {accepts}");
    Ok(())
  }

  fn alert_state(&self, window: &WindowRef) -> WinctlResult<AlertState> {
    let hwnd = Self::hwnd(window)?;
    if unsafe { GetForegroundWindow() } == hwnd {
      Ok(AlertState::None)
    } else {
      Ok(AlertState::Unknown)
    }
  }
}
