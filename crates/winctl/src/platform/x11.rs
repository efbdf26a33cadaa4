/*!
X11 backend.

Talks to the X server directly over `x11rb` and drives the window manager
through EWMH/ICCCM client messages, so it works under any compliant WM.

- Enumeration reads `_NET_CLIENT_LIST_STACKING` (bottom to top, reversed
  here) and falls back to the unordered `_NET_CLIENT_LIST`.
- Always-on-top/bottom set `_NET_WM_STATE_ABOVE`/`_BELOW` and restack each
  tick; releasing an assertion removes the state again.
- Input pass-through empties the SHAPE input region of the client window.
- `rect` is the geometry of the client window itself. The WM's
  decorations around it are read from `_NET_FRAME_EXTENTS`.
- Screens come from RandR outputs, clipped to `_NET_WORKAREA` of the
  current desktop. Without RandR the root window is the only screen.
- Alerts come from `_NET_WM_STATE_DEMANDS_ATTENTION` or the ICCCM urgency
  hint in `WM_HINTS`.
*/

use crate::platform::Backend;
use crate::types::{
  AlertState, AppRef, BackendKind, Capabilities, FrameExtents, Point, ProcessId, Rect, Screen,
  WindowHandle, WindowRef, WindowState, WinctlError, WinctlResult, ZOrderMode,
};
use x11rb::atom_manager;
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ReplyError;
use x11rb::properties::{WmClass, WmHints};
use x11rb::protocol::randr;
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, AtomEnum, ClientMessageEvent, ConfigureWindowAux, EventMask};
use x11rb::protocol::ErrorKind;
use x11rb::rust_connection::RustConnection;

const MAX_PROPERTY_VALUE_LEN: u32 = 4096;

/// ICCCM `WM_STATE` value of an iconified window.
const ICONIC_STATE: u32 = 3;

/// `_NET_WM_STATE` client message actions.
const STATE_REMOVE: u32 = 0;
const STATE_ADD: u32 = 1;

/// EWMH source indication: a normal application.
const SOURCE_APPLICATION: u32 = 1;

atom_manager! {
  /// Atoms interned once per connection.
  pub AtomCollection:

  /// Pending replies for [`AtomCollection`].
  AtomCollectionCookie {
    WMState: b"WM_STATE" as &[u8],
    WMChangeState: b"WM_CHANGE_STATE",
    NetClientList: b"_NET_CLIENT_LIST",
    NetClientListStacking: b"_NET_CLIENT_LIST_STACKING",
    NetActiveWindow: b"_NET_ACTIVE_WINDOW",
    NetCloseWindow: b"_NET_CLOSE_WINDOW",
    NetWMName: b"_NET_WM_NAME",
    NetWMPid: b"_NET_WM_PID",
    NetWMState: b"_NET_WM_STATE",
    NetWMStateMaximizedVert: b"_NET_WM_STATE_MAXIMIZED_VERT",
    NetWMStateMaximizedHorz: b"_NET_WM_STATE_MAXIMIZED_HORZ",
    NetWMStateHidden: b"_NET_WM_STATE_HIDDEN",
    NetWMStateAbove: b"_NET_WM_STATE_ABOVE",
    NetWMStateBelow: b"_NET_WM_STATE_BELOW",
    NetWMStateDemandsAttention: b"_NET_WM_STATE_DEMANDS_ATTENTION",
    NetWMWindowType: b"_NET_WM_WINDOW_TYPE",
    NetWMWindowTypeDesktop: b"_NET_WM_WINDOW_TYPE_DESKTOP",
    NetWMWindowTypeDock: b"_NET_WM_WINDOW_TYPE_DOCK",
    NetFrameExtents: b"_NET_FRAME_EXTENTS",
    NetWorkarea: b"_NET_WORKAREA",
    NetCurrentDesktop: b"_NET_CURRENT_DESKTOP",
  }
}

/// Connection to one X display.
pub struct X11Backend {
  conn: RustConnection,
  root: xproto::Window,
  atoms: AtomCollection,
  /// The WM publishes `_NET_CLIENT_LIST_STACKING`.
  stacking: bool,
  /// The server has the SHAPE extension.
  shape: bool,
  /// The server has the RandR extension.
  randr: bool,
}

impl std::fmt::Debug for X11Backend {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("X11Backend")
      .field("root", &format_args!("{:#x}", self.root))
      .field("stacking", &self.stacking)
      .field("shape", &self.shape)
      .field("randr", &self.randr)
      .finish_non_exhaustive()
  }
}

impl X11Backend {
  /// Connect to the display named by `DISPLAY`.
  pub fn connect() -> WinctlResult<Self> {
    let (conn, screen) =
      x11rb::connect(None).map_err(|e| WinctlError::NoBackend(format!("X11: {e}")))?;
    let root = conn
      .setup()
      .roots
      .get(screen)
      .map(|s| s.root)
      .ok_or_else(|| WinctlError::NoBackend(format!("X11: no screen {screen}")))?;
    let atoms = AtomCollection::new(&conn)
      .map_err(|e| WinctlError::NoBackend(format!("X11: {e}")))?
      .reply()
      .map_err(|e| WinctlError::NoBackend(format!("X11: {e}")))?;
    let has_extension = |name: &'static str| {
      conn
        .extension_information(name)
        .map(|info| info.is_some())
        .map_err(|e| WinctlError::NoBackend(format!("X11: {e}")))
    };
    let shape = has_extension(shape::X11_EXTENSION_NAME)?;
    let randr = has_extension(randr::X11_EXTENSION_NAME)?;

    let mut backend = Self {
      conn,
      root,
      atoms,
      stacking: false,
      shape,
      randr,
    };
    backend.stacking = backend
      .window_list(backend.atoms.NetClientListStacking)
      .is_ok_and(|list| list.is_some());
    log::debug!(
      "X11 connected: screen {screen}, stacking {}, shape {}, randr {}",
      backend.stacking,
      backend.shape,
      backend.randr
    );
    Ok(backend)
  }

  /// Resolve a ref to a live X window id still owned by the ref's process.
  fn xid(&self, window: &WindowRef) -> WinctlResult<xproto::Window> {
    let WindowHandle::X11(id) = window.handle else {
      return Err(WinctlError::InvalidHandle(window.clone()));
    };
    if !self.exists(id) {
      return Err(WinctlError::InvalidHandle(window.clone()));
    }
    if window.process_id.is_some() {
      if let Ok(Some(pid)) = self.pid(id) {
        if !window.is_owned_by(ProcessId(pid)) {
          return Err(WinctlError::InvalidHandle(window.clone()));
        }
      }
    }
    Ok(id)
  }

  fn exists(&self, id: xproto::Window) -> bool {
    xproto::get_window_attributes(&self.conn, id)
      .map_err(ReplyError::from)
      .and_then(|cookie| cookie.reply())
      .is_ok()
  }

  fn window_ref(&self, id: xproto::Window) -> WindowRef {
    let pid = self.pid(id).ok().flatten();
    let title = self.window_title(id).unwrap_or_default();
    WindowRef::new(WindowHandle::X11(id), pid.map(ProcessId), title)
  }

  fn property32(
    &self,
    window: xproto::Window,
    property: xproto::Atom,
    r#type: impl Into<xproto::Atom>,
  ) -> Result<Option<Vec<u32>>, ReplyError> {
    let reply = xproto::get_property(
      &self.conn,
      false,
      window,
      property,
      r#type,
      0,
      MAX_PROPERTY_VALUE_LEN,
    )?
    .reply()?;
    Ok(reply.value32().map(Iterator::collect))
  }

  /// A window-list property of the root, `None` when the WM does not set it.
  fn window_list(&self, property: xproto::Atom) -> Result<Option<Vec<u32>>, ReplyError> {
    self.property32(self.root, property, AtomEnum::WINDOW)
  }

  fn text_property(
    &self,
    window: xproto::Window,
    property: impl Into<xproto::Atom>,
  ) -> Result<Option<String>, ReplyError> {
    let reply = xproto::get_property(
      &self.conn,
      false,
      window,
      property,
      AtomEnum::ANY,
      0,
      MAX_PROPERTY_VALUE_LEN,
    )?
    .reply()?;
    if reply.value.is_empty() {
      return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
  }

  fn window_title(&self, window: xproto::Window) -> Result<String, ReplyError> {
    if let Some(title) = self.text_property(window, self.atoms.NetWMName)? {
      return Ok(title);
    }
    Ok(self.text_property(window, AtomEnum::WM_NAME)?.unwrap_or_default())
  }

  fn pid(&self, window: xproto::Window) -> Result<Option<u32>, ReplyError> {
    let pid = self
      .property32(window, self.atoms.NetWMPid, AtomEnum::CARDINAL)?
      .and_then(|values| values.first().copied())
      .filter(|&pid| pid != 0);
    Ok(pid)
  }

  fn net_states(&self, window: xproto::Window) -> Result<Vec<xproto::Atom>, ReplyError> {
    Ok(
      self
        .property32(window, self.atoms.NetWMState, AtomEnum::ATOM)?
        .unwrap_or_default(),
    )
  }

  fn is_iconic(&self, window: xproto::Window) -> Result<bool, ReplyError> {
    let state = self.property32(window, self.atoms.WMState, AtomEnum::ANY)?;
    Ok(state.and_then(|v| v.first().copied()) == Some(ICONIC_STATE))
  }

  /// Docks and desktop windows are WM furniture, not applications.
  fn is_app_window(&self, window: xproto::Window) -> bool {
    let Ok(types) = self.property32(window, self.atoms.NetWMWindowType, AtomEnum::ATOM) else {
      return false;
    };
    let furniture = [
      self.atoms.NetWMWindowTypeDesktop,
      self.atoms.NetWMWindowTypeDock,
    ];
    !types
      .unwrap_or_default()
      .iter()
      .any(|t| furniture.contains(t))
  }

  fn app_name(&self, window: xproto::Window, pid: u32) -> String {
    if let Some(name) = process_name(pid) {
      return name;
    }
    match WmClass::get(&self.conn, window).map(|cookie| cookie.reply()) {
      Ok(Ok(Some(class))) => String::from_utf8_lossy(class.class()).into_owned(),
      _ => String::new(),
    }
  }

  /// Send an EWMH/ICCCM client message to the root window for the WM.
  fn client_message(
    &self,
    window: xproto::Window,
    message: xproto::Atom,
    data: [u32; 5],
  ) -> Result<(), ReplyError> {
    let event = ClientMessageEvent::new(32, window, message, data);
    xproto::send_event(
      &self.conn,
      false,
      self.root,
      EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
      event,
    )?
    .check()
  }

  fn change_net_state(
    &self,
    window: xproto::Window,
    action: u32,
    first: xproto::Atom,
    second: xproto::Atom,
  ) -> Result<(), ReplyError> {
    self.client_message(
      window,
      self.atoms.NetWMState,
      state_message(action, first, second),
    )
  }

  fn restack(&self, window: xproto::Window, mode: xproto::StackMode) -> Result<(), ReplyError> {
    let aux = ConfigureWindowAux::new().stack_mode(mode);
    xproto::configure_window(&self.conn, window, &aux)?.check()
  }

  fn enforce(&self, window: xproto::Window, mode: ZOrderMode) -> Result<(), ReplyError> {
    let (wanted, opposite, stack) = match mode {
      ZOrderMode::Top => (
        self.atoms.NetWMStateAbove,
        self.atoms.NetWMStateBelow,
        xproto::StackMode::ABOVE,
      ),
      ZOrderMode::Bottom => (
        self.atoms.NetWMStateBelow,
        self.atoms.NetWMStateAbove,
        xproto::StackMode::BELOW,
      ),
    };
    let states = self.net_states(window)?;
    if states.contains(&opposite) {
      self.change_net_state(window, STATE_REMOVE, opposite, 0)?;
    }
    if !states.contains(&wanted) {
      self.change_net_state(window, STATE_ADD, wanted, 0)?;
    }
    self.restack(window, stack)
  }

  fn geometry(&self, window: xproto::Window) -> Result<Rect, ReplyError> {
    let geometry = xproto::get_geometry(&self.conn, window)?.reply()?;
    let origin = xproto::translate_coordinates(&self.conn, window, self.root, 0, 0)?.reply()?;
    Ok(Rect::new(
      i32::from(origin.dst_x),
      i32::from(origin.dst_y),
      u32::from(geometry.width),
      u32::from(geometry.height),
    ))
  }

  /// Desktop-wide work area of the current desktop, if the WM publishes one.
  fn work_area(&self) -> Result<Option<Rect>, ReplyError> {
    let Some(areas) = self.property32(self.root, self.atoms.NetWorkarea, AtomEnum::CARDINAL)? else {
      return Ok(None);
    };
    let desktop = self
      .property32(self.root, self.atoms.NetCurrentDesktop, AtomEnum::CARDINAL)?
      .and_then(|v| v.first().copied())
      .unwrap_or(0);
    Ok(parse_workarea(&areas, desktop))
  }

  /// Active RandR outputs, primary flagged.
  fn randr_screens(&self) -> Result<Vec<(String, bool, Rect)>, ReplyError> {
    let resources = randr::get_screen_resources_current(&self.conn, self.root)?.reply()?;
    let primary = randr::get_output_primary(&self.conn, self.root)?.reply()?.output;
    let mut screens = Vec::new();
    for &output in &resources.outputs {
      let info = randr::get_output_info(&self.conn, output, resources.config_timestamp)?.reply()?;
      if info.crtc == x11rb::NONE {
        continue;
      }
      let crtc = randr::get_crtc_info(&self.conn, info.crtc, resources.config_timestamp)?.reply()?;
      if crtc.width == 0 || crtc.height == 0 {
        continue;
      }
      screens.push((
        String::from_utf8_lossy(&info.name).into_owned(),
        output == primary,
        Rect::new(
          i32::from(crtc.x),
          i32::from(crtc.y),
          u32::from(crtc.width),
          u32::from(crtc.height),
        ),
      ));
    }
    Ok(screens)
  }

  fn set_input_shape(&self, window: xproto::Window, accepts: bool) -> Result<(), ReplyError> {
    if accepts {
      self
        .conn
        .shape_mask(
          shape::SO::SET,
          shape::SK::INPUT,
          window,
          0,
          0,
          x11rb::NONE,
        )?
        .check()
    } else {
      self
        .conn
        .shape_rectangles(
          shape::SO::SET,
          shape::SK::INPUT,
          xproto::ClipOrdering::UNSORTED,
          window,
          0,
          0,
          &[],
        )?
        .check()
    }
  }
}

/// Classify a failed request against `window`.
#[allow(clippy::wildcard_enum_match_arm)]
fn map_error(window: &WindowRef, e: ReplyError) -> WinctlError {
  match e {
    ReplyError::X11Error(ref x) => match x.error_kind {
      ErrorKind::Window | ErrorKind::Drawable => WinctlError::InvalidHandle(window.clone()),
      ErrorKind::Access => WinctlError::PermissionDenied(format!("{window}: {e}")),
      _ => WinctlError::transient(format!("{window}: {e}")),
    },
    ReplyError::ConnectionError(_) => WinctlError::transient(format!("{window}: {e}")),
  }
}

fn root_error(e: ReplyError) -> WinctlError {
  WinctlError::transient(format!("X11 root query: {e}"))
}

/// `_NET_CLIENT_LIST_STACKING` is bottom to top.
fn front_to_back(mut stacking: Vec<u32>) -> Vec<u32> {
  stacking.reverse();
  stacking
}

fn state_message(action: u32, first: xproto::Atom, second: xproto::Atom) -> [u32; 5] {
  [action, first, second, SOURCE_APPLICATION, 0]
}

/// The `desktop`th `x, y, width, height` quadruple of `_NET_WORKAREA`.
fn parse_workarea(values: &[u32], desktop: u32) -> Option<Rect> {
  let start = usize::try_from(desktop).ok()?.checked_mul(4)?;
  let area = values.get(start..start.checked_add(4)?)?;
  let [x, y, width, height] = *area else {
    return None;
  };
  Some(Rect::new(
    i32::try_from(x).ok()?,
    i32::try_from(y).ok()?,
    width,
    height,
  ))
}

/// Build screens from `(name, primary, rect)` outputs. When none is marked
/// primary the first one is.
fn build_screens(outputs: Vec<(String, bool, Rect)>, work_area: Option<Rect>) -> Vec<Screen> {
  let has_primary = outputs.iter().any(|(_, primary, _)| *primary);
  outputs
    .into_iter()
    .enumerate()
    .map(|(i, (name, primary, rect))| Screen {
      name,
      primary: primary || (!has_primary && i == 0),
      rect,
      work_area: work_area.and_then(|a| a.intersection(&rect)).unwrap_or(rect),
    })
    .collect()
}

/// `_NET_FRAME_EXTENTS` is left, right, top, bottom.
fn parse_frame_extents(values: &[u32]) -> FrameExtents {
  match *values {
    [left, right, top, bottom, ..] => FrameExtents {
      left,
      top,
      right,
      bottom,
    },
    _ => FrameExtents::default(),
  }
}

fn classify_alert(demands_attention: bool, urgent: bool) -> AlertState {
  if demands_attention || urgent {
    AlertState::AttentionRequested
  } else {
    AlertState::None
  }
}

fn process_name(pid: u32) -> Option<String> {
  if pid == 0 {
    return None;
  }
  let comm = std::fs::read_to_string(format!("/proc/{pid}/comm")).ok()?;
  parse_comm(&comm)
}

fn parse_comm(comm: &str) -> Option<String> {
  let name = comm.trim_end_matches('\n').trim();
  (!name.is_empty()).then(|| name.to_owned())
}

impl Backend for X11Backend {
  fn kind(&self) -> BackendKind {
    BackendKind::X11
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities {
      provides_stack_order: self.stacking,
      send_behind: true,
      accepts_input: self.shape,
      alert_state: true,
      per_window_visibility: true,
      client_area: true,
    }
  }

  fn all_windows(&self) -> WinctlResult<Vec<WindowRef>> {
    let ids = if self.stacking {
      self
        .window_list(self.atoms.NetClientListStacking)
        .map_err(root_error)?
        .map(front_to_back)
    } else {
      None
    };
    let ids = match ids {
      Some(ids) => ids,
      None => self
        .window_list(self.atoms.NetClientList)
        .map_err(root_error)?
        .unwrap_or_default(),
    };
    Ok(
      ids
        .into_iter()
        .filter(|&id| self.is_app_window(id))
        .map(|id| self.window_ref(id))
        .collect(),
    )
  }

  fn all_apps(&self) -> WinctlResult<Vec<AppRef>> {
    let mut apps: Vec<AppRef> = Vec::new();
    for window in self.all_windows()? {
      let Some(pid) = window.process_id else {
        continue;
      };
      if apps.iter().any(|a| a.process_id == pid) {
        continue;
      }
      let WindowHandle::X11(id) = window.handle else {
        continue;
      };
      apps.push(AppRef::new(pid, self.app_name(id, pid.0)));
    }
    Ok(apps)
  }

  fn active_window(&self) -> WinctlResult<Option<WindowRef>> {
    let active = self
      .window_list(self.atoms.NetActiveWindow)
      .map_err(root_error)?
      .and_then(|v| v.first().copied())
      .filter(|&id| id != x11rb::NONE && self.exists(id));
    Ok(active.map(|id| self.window_ref(id)))
  }

  fn is_alive(&self, window: &WindowRef) -> bool {
    self.xid(window).is_ok()
  }

  fn title(&self, window: &WindowRef) -> WinctlResult<String> {
    let id = self.xid(window)?;
    self.window_title(id).map_err(|e| map_error(window, e))
  }

  fn app_of(&self, window: &WindowRef) -> WinctlResult<AppRef> {
    let id = self.xid(window)?;
    let pid = self
      .pid(id)
      .map_err(|e| map_error(window, e))?
      .ok_or_else(|| WinctlError::transient(format!("{window} has no _NET_WM_PID")))?;
    Ok(AppRef::new(ProcessId(pid), self.app_name(id, pid)))
  }

  fn rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    let id = self.xid(window)?;
    self.geometry(id).map_err(|e| map_error(window, e))
  }

  fn set_rect(&self, window: &WindowRef, rect: Rect) -> WinctlResult<()> {
    let id = self.xid(window)?;
    let aux = ConfigureWindowAux::new()
      .x(rect.x)
      .y(rect.y)
      .width(rect.width)
      .height(rect.height);
    xproto::configure_window(&self.conn, id, &aux)
      .map_err(ReplyError::from)
      .and_then(|cookie| cookie.check())
      .map_err(|e| map_error(window, e))
  }

  fn client_rect(&self, window: &WindowRef) -> WinctlResult<Rect> {
    self.rect(window)
  }

  fn frame_extents(&self, window: &WindowRef) -> WinctlResult<FrameExtents> {
    let id = self.xid(window)?;
    let extents = self
      .property32(id, self.atoms.NetFrameExtents, AtomEnum::CARDINAL)
      .map_err(|e| map_error(window, e))?;
    Ok(extents.map_or_else(FrameExtents::default, |v| parse_frame_extents(&v)))
  }

  fn screens(&self) -> WinctlResult<Vec<Screen>> {
    let work_area = self.work_area().map_err(root_error)?;
    let outputs = if self.randr {
      self.randr_screens().map_err(root_error)?
    } else {
      Vec::new()
    };
    if !outputs.is_empty() {
      return Ok(build_screens(outputs, work_area));
    }
    let root = xproto::get_geometry(&self.conn, self.root)
      .map_err(ReplyError::from)
      .and_then(|cookie| cookie.reply())
      .map_err(root_error)?;
    let rect = Rect::new(0, 0, u32::from(root.width), u32::from(root.height));
    Ok(build_screens(vec![("default".to_owned(), true, rect)], work_area))
  }

  fn cursor_position(&self) -> WinctlResult<Point> {
    let pointer = xproto::query_pointer(&self.conn, self.root)
      .map_err(ReplyError::from)
      .and_then(|cookie| cookie.reply())
      .map_err(root_error)?;
    Ok(Point::new(i32::from(pointer.root_x), i32::from(pointer.root_y)))
  }

  fn state(&self, window: &WindowRef) -> WinctlResult<WindowState> {
    let id = self.xid(window)?;
    let read = || -> Result<WindowState, ReplyError> {
      let attrs = xproto::get_window_attributes(&self.conn, id)?.reply()?;
      let states = self.net_states(id)?;
      let minimized = states.contains(&self.atoms.NetWMStateHidden) || self.is_iconic(id)?;
      let active = self
        .window_list(self.atoms.NetActiveWindow)?
        .and_then(|v| v.first().copied())
        == Some(id);
      Ok(WindowState {
        visible: attrs.map_state != xproto::MapState::UNMAPPED || minimized,
        minimized,
        maximized: states.contains(&self.atoms.NetWMStateMaximizedVert)
          && states.contains(&self.atoms.NetWMStateMaximizedHorz),
        active,
      })
    };
    read().map_err(|e| map_error(window, e))
  }

  fn set_visible(&self, window: &WindowRef, visible: bool) -> WinctlResult<()> {
    let id = self.xid(window)?;
    let apply = || -> Result<(), ReplyError> {
      if visible {
        return xproto::map_window(&self.conn, id)?.check();
      }
      xproto::unmap_window(&self.conn, id)?.check()?;
      // ICCCM withdraw: tell the WM with a synthetic UnmapNotify
      let event = xproto::UnmapNotifyEvent {
        response_type: xproto::UNMAP_NOTIFY_EVENT,
        sequence: 0,
        event: self.root,
        window: id,
        from_configure: false,
      };
      xproto::send_event(
        &self.conn,
        false,
        self.root,
        EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
        event,
      )?
      .check()
    };
    apply().map_err(|e| map_error(window, e))
  }

  fn minimize(&self, window: &WindowRef) -> WinctlResult<()> {
    let id = self.xid(window)?;
    self
      .client_message(id, self.atoms.WMChangeState, [ICONIC_STATE, 0, 0, 0, 0])
      .map_err(|e| map_error(window, e))
  }

  fn maximize(&self, window: &WindowRef) -> WinctlResult<()> {
    let id = self.xid(window)?;
    self
      .change_net_state(
        id,
        STATE_ADD,
        self.atoms.NetWMStateMaximizedVert,
        self.atoms.NetWMStateMaximizedHorz,
      )
      .map_err(|e| map_error(window, e))
  }

  fn restore(&self, window: &WindowRef) -> WinctlResult<()> {
    let id = self.xid(window)?;
    let apply = || -> Result<(), ReplyError> {
      self.change_net_state(
        id,
        STATE_REMOVE,
        self.atoms.NetWMStateMaximizedVert,
        self.atoms.NetWMStateMaximizedHorz,
      )?;
      if self.is_iconic(id)? || self.net_states(id)?.contains(&self.atoms.NetWMStateHidden) {
        // De-iconify by activating, which every EWMH WM honours
        self.client_message(
          id,
          self.atoms.NetActiveWindow,
          [SOURCE_APPLICATION, x11rb::CURRENT_TIME, 0, 0, 0],
        )?;
      }
      Ok(())
    };
    apply().map_err(|e| map_error(window, e))
  }

  fn close(&self, window: &WindowRef) -> WinctlResult<()> {
    let id = self.xid(window)?;
    self
      .client_message(
        id,
        self.atoms.NetCloseWindow,
        [x11rb::CURRENT_TIME, SOURCE_APPLICATION, 0, 0, 0],
      )
      .map_err(|e| map_error(window, e))
  }

  fn activate(&self, window: &WindowRef) -> WinctlResult<()> {
    let id = self.xid(window)?;
    // Source 2: pager, so focus-stealing prevention does not veto the switch
    self
      .client_message(
        id,
        self.atoms.NetActiveWindow,
        [2, x11rb::CURRENT_TIME, 0, 0, 0],
      )
      .map_err(|e| map_error(window, e))
  }

  fn raise_to_top(&self, window: &WindowRef) -> WinctlResult<()> {
    let id = self.xid(window)?;
    self
      .restack(id, xproto::StackMode::ABOVE)
      .map_err(|e| map_error(window, e))
  }

  fn lower_to_bottom(&self, window: &WindowRef) -> WinctlResult<()> {
    let id = self.xid(window)?;
    self
      .restack(id, xproto::StackMode::BELOW)
      .map_err(|e| map_error(window, e))
  }

  fn enforce_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    let id = self.xid(window)?;
    self.enforce(id, mode).map_err(|e| map_error(window, e))
  }

  fn release_z_order(&self, window: &WindowRef, mode: ZOrderMode) -> WinctlResult<()> {
    let id = self.xid(window)?;
    let state = match mode {
      ZOrderMode::Top => self.atoms.NetWMStateAbove,
      ZOrderMode::Bottom => self.atoms.NetWMStateBelow,
    };
    self
      .change_net_state(id, STATE_REMOVE, state, 0)
      .map_err(|e| map_error(window, e))
  }

  fn set_accepts_input(&self, window: &WindowRef, accepts: bool) -> WinctlResult<()> {
    let id = self.xid(window)?;
    if !self.shape {
      return Err(WinctlError::unsupported(self.kind(), "set_accepts_input"));
    }
    self
      .set_input_shape(id, accepts)
      .map_err(|e| map_error(window, e))
  }

  fn alert_state(&self, window: &WindowRef) -> WinctlResult<AlertState> {
    let id = self.xid(window)?;
    let read = || -> Result<AlertState, ReplyError> {
      let demands = self
        .net_states(id)?
        .contains(&self.atoms.NetWMStateDemandsAttention);
      let urgent = WmHints::get(&self.conn, id)?
        .reply()?
        .is_some_and(|hints| hints.urgent);
      Ok(classify_alert(demands, urgent))
    };
    read().map_err(|e| map_error(window, e))
  }
}
