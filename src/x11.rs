//! The X11 connection: the production [`Display`] plus the WM-only requests
//! (substructure redirect, key grabs, root name, event fetch).

use std::collections::HashMap;

use anyhow::{Context, Result};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xinerama::{self, ConnectionExt as _};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::CURRENT_TIME;

use crate::display::Display;
use crate::keys::{self, KeyBindings};
use crate::types::Rect;

/// Longest root window name read, in 32-bit units
const ROOT_NAME_MAX_LEN: u32 = 1024;

pub struct X11Display {
    conn: RustConnection,
    screen_num: usize,
    root: Window,
}

impl X11Display {
    /// Connect to the server named by `$DISPLAY`
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) =
            RustConnection::connect(None).context("Failed to connect to X11 server")?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;

        log::info!(
            "Connected to X11, screen {}, root window 0x{:x}, {}x{}",
            screen_num,
            root,
            screen.width_in_pixels,
            screen.height_in_pixels
        );

        Ok(Self {
            conn,
            screen_num,
            root,
        })
    }

    pub fn root(&self) -> Window {
        self.root
    }

    fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    /// Become the window manager by requesting SubstructureRedirect on root
    pub fn become_wm(&self) -> Result<()> {
        // PropertyChange delivers WM_NAME updates from gwmctl
        let event_mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE;

        let result = self.conn.change_window_attributes(
            self.root,
            &ChangeWindowAttributesAux::new().event_mask(event_mask),
        );

        self.conn.flush()?;

        if let Err(e) = result?.check() {
            anyhow::bail!("Another window manager is already running! Error: {}", e);
        }

        log::info!("Successfully became the window manager");
        Ok(())
    }

    /// Map every keysym in the server's keyboard mapping to its first keycode
    pub fn keysym_to_keycode(&self) -> Result<HashMap<u32, Keycode>> {
        let setup = self.conn.setup();
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;

        let mapping = self
            .conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
            .reply()?;

        let keysyms_per_keycode = mapping.keysyms_per_keycode as usize;

        let mut keysym_to_keycode: HashMap<u32, Keycode> = HashMap::new();
        for (i, chunk) in mapping.keysyms.chunks(keysyms_per_keycode).enumerate() {
            for keysym in chunk {
                if *keysym != 0 {
                    keysym_to_keycode
                        .entry(*keysym)
                        .or_insert(min_keycode + i as u8);
                }
            }
        }
        Ok(keysym_to_keycode)
    }

    /// Grab every binding on the root window, with and without the lock
    /// modifiers
    pub fn grab_keys(&self, bindings: &KeyBindings) -> Result<()> {
        for (keycode, modifiers) in bindings.grabs() {
            for mods in keys::lock_variants(modifiers) {
                self.conn.grab_key(
                    false, // owner_events
                    self.root,
                    ModMask::from(mods),
                    keycode,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                )?;
            }
            log::debug!("Grabbed keycode {} (mods 0x{:x})", keycode, modifiers);
        }
        log::info!("Grabbed {} key bindings", bindings.len());
        self.conn.flush()?;
        Ok(())
    }

    /// Current name of the root window, empty when unset
    pub fn root_name(&self) -> Result<String> {
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                AtomEnum::WM_NAME,
                AtomEnum::ANY,
                0,
                ROOT_NAME_MAX_LEN,
            )?
            .reply()?;
        Ok(String::from_utf8_lossy(&reply.value).into_owned())
    }

    /// Top-level windows that were mapped before we started
    pub fn existing_windows(&self) -> Result<Vec<Window>> {
        let tree = self.conn.query_tree(self.root)?.reply()?;

        let mut windows = Vec::new();
        for &window in &tree.children {
            let attrs = match self.conn.get_window_attributes(window)?.reply() {
                Ok(attrs) => attrs,
                // Destroyed between the two requests
                Err(_) => continue,
            };

            // Skip popups and unmapped windows
            if attrs.override_redirect || attrs.map_state != MapState::VIEWABLE {
                continue;
            }

            log::info!("Found existing window 0x{:x}", window);
            windows.push(window);
        }
        Ok(windows)
    }

    /// Block until the next event arrives
    pub fn wait_for_event(&self) -> Result<Event> {
        Ok(self.conn.wait_for_event()?)
    }

    fn xinerama_screens(&self) -> Result<Vec<Rect>> {
        if self
            .conn
            .extension_information(xinerama::X11_EXTENSION_NAME)?
            .is_none()
        {
            return Ok(Vec::new());
        }
        if self.conn.xinerama_is_active()?.reply()?.state == 0 {
            return Ok(Vec::new());
        }
        let reply = self.conn.xinerama_query_screens()?.reply()?;
        Ok(reply
            .screen_info
            .iter()
            .map(|s| Rect::new(s.x_org.into(), s.y_org.into(), s.width.into(), s.height.into()))
            .collect())
    }
}

impl Display for X11Display {
    fn monitors(&self) -> Result<Vec<Rect>> {
        let screens = self.xinerama_screens()?;
        if !screens.is_empty() {
            return Ok(screens);
        }
        let screen = self.screen();
        Ok(vec![Rect::new(
            0,
            0,
            screen.width_in_pixels.into(),
            screen.height_in_pixels.into(),
        )])
    }

    fn is_window_valid(&self, window: Window) -> Result<bool> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        Ok(tree.children.contains(&window))
    }

    fn move_window(&self, window: Window, x: i32, y: i32) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().x(x).y(y))?;
        Ok(())
    }

    fn configure_window(&self, window: Window, rect: Rect, border_width: u32) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width)
                .height(rect.height)
                .border_width(border_width),
        )?;
        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn set_border_color(&self, window: Window, pixel: u32) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().border_pixel(pixel),
        )?;
        Ok(())
    }

    fn focus_window(&self, window: Window) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::PARENT, window, CURRENT_TIME)?;
        Ok(())
    }

    fn focus_root(&self) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, self.root, CURRENT_TIME)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
