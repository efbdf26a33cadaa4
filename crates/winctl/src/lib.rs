/*!
winctl - cross-platform top-level window control.

Enumerate, query and manipulate application windows uniformly over Win32,
X11 and macOS: geometry, visibility, persistent z-order, input acceptance
and alert state. Screens, their work areas and the mouse position can be
read too.

```no_run
use winctl::{Rect, Winctl};

let winctl = Winctl::new()?;

for window in winctl.all_windows()? {
  println!("{window}: {} at {}", winctl.title(&window)?, winctl.rect(&window)?);
}

if let Some(window) = winctl.active_window()? {
  winctl.set_rect(&window, Rect::new(0, 0, 1280, 720))?;

  // Re-asserted in the background until cancelled or `winctl` is dropped
  winctl.assert_always_on_top(&window)?;
  winctl.cancel_assertion(&window)?;
}
# Ok::<(), winctl::WinctlError>(())
```

Not every backend can do everything. Check [`Winctl::capabilities`] or
handle [`WinctlError::Unsupported`].
*/

mod core;
mod platform;
mod zorder;

mod types;
pub use types::*;

pub use crate::core::{Winctl, WinctlBuilder};
pub use crate::platform::{Backend, NativeBackend};

#[cfg(target_os = "macos")]
pub use crate::platform::MacBackend;
#[cfg(target_os = "windows")]
pub use crate::platform::Win32Backend;
#[cfg(target_os = "linux")]
pub use crate::platform::X11Backend;
