//! Keyboard actions and the keycode dispatch table.

use std::collections::HashMap;

use x11rb::protocol::xproto::{Keycode, ModMask};

use crate::config::ParsedBinding;

/// Everything a key binding can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    SpawnTerminal,
    SpawnLauncher,
    /// Pick a task from the menu and switch to it
    SwitchTaskMenu,
    /// Pick a task from the menu and send the focused window there
    MoveWindowToTaskMenu,
    PromoteWindow,
    /// Move focus by an offset within the active workspace
    FocusWindow(isize),
    /// Move focus by an offset between screens
    FocusScreen(isize),
    MoveWindowToScreen(isize),
    /// Switch to the workspace at the given index on the active screen
    SwitchWorkspace(usize),
    MoveWindowToWorkspace(usize),
    GrowMaster,
    ShrinkMaster,
}

/// Modifier bits ignored when matching a key press
fn lock_mask() -> u16 {
    u16::from(ModMask::M2) | u16::from(ModMask::LOCK)
}

/// Resolved bindings keyed by (keycode, modifiers)
#[derive(Debug, Default)]
pub struct KeyBindings {
    table: HashMap<(Keycode, u16), Action>,
}

impl KeyBindings {
    /// Resolve keysyms against the server's keyboard mapping.
    ///
    /// Bindings whose keysym has no keycode are dropped with a warning.
    pub fn resolve(
        parsed: &[(ParsedBinding, Action)],
        keysym_to_keycode: &HashMap<u32, Keycode>,
    ) -> Self {
        let mut table = HashMap::new();
        for (binding, action) in parsed {
            match keysym_to_keycode.get(&binding.keysym) {
                Some(&keycode) => {
                    if let Some(previous) = table.insert((keycode, binding.modifiers), *action) {
                        log::warn!("{:?} replaces {:?} on the same key", action, previous);
                    }
                }
                None => log::warn!(
                    "Could not find keycode for {:?} (keysym 0x{:x})",
                    action,
                    binding.keysym
                ),
            }
        }
        Self { table }
    }

    /// Find the action for a key press, ignoring NumLock and CapsLock
    pub fn lookup(&self, keycode: Keycode, state: u16) -> Option<Action> {
        self.table.get(&(keycode, state & !lock_mask())).copied()
    }

    /// Every (keycode, modifiers) pair that needs a grab
    pub fn grabs(&self) -> impl Iterator<Item = (Keycode, u16)> + '_ {
        self.table.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Modifier combinations each binding is grabbed with
pub fn lock_variants(modifiers: u16) -> [u16; 4] {
    let numlock = u16::from(ModMask::M2);
    let capslock = u16::from(ModMask::LOCK);
    [
        modifiers,
        modifiers | capslock,
        modifiers | numlock,
        modifiers | capslock | numlock,
    ]
}
