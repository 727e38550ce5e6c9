//! The protocol commands the task tree needs from a display server.
//!
//! [`Tree`](crate::tree::Tree) only talks to the display through this trait,
//! which keeps the tree logic testable without an X server. The production
//! implementation is [`X11Display`](crate::x11::X11Display).

use anyhow::Result;
use x11rb::protocol::xproto::Window;

use crate::types::Rect;

pub trait Display {
    /// Geometry of every physical monitor, in display order.
    ///
    /// Queried on every layout pass; implementations must not cache it.
    fn monitors(&self) -> Result<Vec<Rect>>;

    /// Whether `window` is still a live child of the root window
    fn is_window_valid(&self, window: Window) -> Result<bool>;

    /// Move `window` without touching its size
    fn move_window(&self, window: Window, x: i32, y: i32) -> Result<()>;

    /// Set position, size and border width of `window`
    fn configure_window(&self, window: Window, rect: Rect, border_width: u32) -> Result<()>;

    fn map_window(&self, window: Window) -> Result<()>;

    fn set_border_color(&self, window: Window, pixel: u32) -> Result<()>;

    /// Give `window` keyboard input focus
    fn focus_window(&self, window: Window) -> Result<()>;

    /// Hand keyboard input focus back to the root window
    fn focus_root(&self) -> Result<()>;

    /// Push any buffered requests to the server
    fn flush(&self) -> Result<()>;
}
