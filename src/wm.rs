//! The window manager context: owns the task tree, the key bindings and the
//! helper commands, and turns X events and key presses into tree commands.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use x11rb::protocol::xproto::{AtomEnum, Keycode};
use x11rb::protocol::Event;

use crate::config::{CommandConfig, Config, ENV_TASK_WORKDIRS};
use crate::display::Display;
use crate::keys::{Action, KeyBindings};
use crate::spawn::{self, ENV_TASK_NAME};
use crate::tree::{Tree, TreeEvent};
use crate::x11::X11Display;

pub struct WindowManager<D: Display> {
    tree: Tree<D>,
    bindings: KeyBindings,
    commands: CommandConfig,
    workdirs: HashMap<String, PathBuf>,
    master_factor_step: f64,
    running: bool,
}

impl<D: Display> WindowManager<D> {
    pub fn new(display: D, config: &Config, bindings: KeyBindings) -> Result<Self> {
        let layout = config.layout_config();
        let env_workdirs = std::env::var(ENV_TASK_WORKDIRS).ok();
        let workdirs = config.task_workdirs(env_workdirs.as_deref());
        let master_factor_step = layout.master_factor_step;
        let tree = Tree::new(display, layout, &config.general.default_task)?;
        Ok(Self {
            tree,
            bindings,
            commands: config.commands.clone(),
            workdirs,
            master_factor_step,
            running: true,
        })
    }

    #[allow(dead_code)]
    pub fn tree(&self) -> &Tree<D> {
        &self.tree
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Dispatch a key press through the binding table
    pub fn handle_key(&mut self, keycode: Keycode, state: u16) -> Result<()> {
        log::debug!("KeyPress: keycode={}, state=0x{:x}", keycode, state);
        match self.bindings.lookup(keycode, state) {
            Some(action) => self.apply(action),
            None => Ok(()),
        }
    }

    /// Execute a window manager action
    pub fn apply(&mut self, action: Action) -> Result<()> {
        log::debug!("Action {:?}", action);
        match action {
            Action::Quit => {
                log::info!("Quitting window manager");
                self.running = false;
            }
            Action::SpawnTerminal => self.spawn_in_task(&self.commands.terminal),
            Action::SpawnLauncher => self.spawn_in_task(&self.commands.launcher),
            Action::SwitchTaskMenu => self.task_menu(false),
            Action::MoveWindowToTaskMenu => self.task_menu(true),
            Action::PromoteWindow => self.tree.promote_window()?,
            Action::FocusWindow(offset) => self.tree.focus_window_by_offset(offset)?,
            Action::FocusScreen(offset) => self.tree.focus_screen_by_offset(offset)?,
            Action::MoveWindowToScreen(offset) => self.tree.move_window_to_screen(offset)?,
            Action::SwitchWorkspace(index) => self.tree.switch_workspace(index)?,
            Action::MoveWindowToWorkspace(index) => self.tree.move_window_to_workspace(index)?,
            Action::GrowMaster => self.tree.adjust_master_factor(self.master_factor_step)?,
            Action::ShrinkMaster => self.tree.adjust_master_factor(-self.master_factor_step)?,
        }
        Ok(())
    }

    /// The working directory for programs started in `task`, if it exists
    fn workdir_for(&self, task: &str) -> Option<PathBuf> {
        self.workdirs.get(task).filter(|dir| dir.is_dir()).cloned()
    }

    /// Start `command` with the active task's name and working directory
    fn spawn_in_task(&self, command: &str) {
        let task = self.tree.active_task_name();
        let cwd = self.workdir_for(task);
        if let Err(e) = spawn::spawn(command, cwd.as_deref(), &[(ENV_TASK_NAME, task)]) {
            log::error!("{:#}", e);
        }
    }

    /// Offer the task names, most recent first, to the menu
    fn task_menu(&self, move_window: bool) {
        let mut names = self.tree.task_names();
        names.reverse();
        if let Err(e) = spawn::spawn_task_menu(
            &self.commands.menu,
            &self.commands.ctl,
            &names,
            move_window,
        ) {
            log::error!("{:#}", e);
        }
    }
}

impl WindowManager<X11Display> {
    /// Adopt windows that were mapped before we started
    pub fn scan_existing_windows(&mut self) -> Result<()> {
        for window in self.tree.display().existing_windows()? {
            self.tree.manage_window(window)?;
        }
        Ok(())
    }

    /// Handle an X11 event
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::MapRequest(e) => {
                log::debug!("MapRequest for window 0x{:x}", e.window);
                self.tree.on_event(TreeEvent::MapRequest(e.window))?;
            }

            Event::UnmapNotify(e) => {
                log::debug!("UnmapNotify for window 0x{:x}", e.window);
                self.tree.on_event(TreeEvent::Withdrawn(e.window))?;
            }

            Event::DestroyNotify(e) => {
                log::debug!("DestroyNotify for window 0x{:x}", e.window);
                self.tree.on_event(TreeEvent::Withdrawn(e.window))?;
            }

            Event::PropertyNotify(e)
                if e.window == self.tree.display().root()
                    && e.atom == u32::from(AtomEnum::WM_NAME) =>
            {
                let name = self.tree.display().root_name()?;
                log::debug!("Root window name changed to '{}'", name);
                self.tree.on_event(TreeEvent::RootName(name))?;
            }

            Event::KeyPress(e) => {
                self.handle_key(e.detail, u16::from(e.state))?;
            }

            Event::Error(e) => {
                // Usually a request for a window that is already gone
                log::debug!("X11 error: {:?}", e);
            }

            _ => {}
        }

        Ok(())
    }

    /// Main event loop
    pub fn run(&mut self) -> Result<()> {
        log::info!("Entering event loop");

        while self.is_running() {
            let event = self.tree.display().wait_for_event()?;
            self.handle_event(event)?;
        }

        log::info!("Exiting window manager");
        Ok(())
    }
}
