//! The task tree and everything that mutates it.
//!
//! `Tree` owns the Root -> Task -> Screen -> Workspace -> Window hierarchy.
//! Every command is a synchronous mutation of that hierarchy followed by a
//! refresh: either a full layout pass (`update_window_positions`) or just a
//! focus/border pass (`update_window_focus`).

use std::collections::HashSet;

use anyhow::Result;
use x11rb::protocol::xproto::Window;

use crate::config::LayoutConfig;
use crate::display::Display;
use crate::layout::{self, PARK_POSITION};
use crate::node::{Kind, NodeData, NodeId, NodeTree};
use crate::root_name::{self, Request};
use crate::types::TreeSnapshot;

/// Workspaces per screen
pub const N_WORKSPACES: usize = 4;

/// Display-server happenings the tree reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// The root window's name changed
    RootName(String),
    /// A client asked to be mapped
    MapRequest(Window),
    /// A client was unmapped or destroyed
    Withdrawn(Window),
}

pub struct Tree<D: Display> {
    display: D,
    nodes: NodeTree,
    config: LayoutConfig,
}

impl<D: Display> Tree<D> {
    /// Build the tree and switch to `default_task`, creating it
    pub fn new(display: D, config: LayoutConfig, default_task: &str) -> Result<Self> {
        let mut tree = Self {
            display,
            nodes: NodeTree::new(),
            config,
        };
        tree.switch_task(default_task)?;
        Ok(tree)
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    #[allow(dead_code)]
    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        self.nodes.snapshot()
    }

    /// Route a display event to the matching command
    pub fn on_event(&mut self, event: TreeEvent) -> Result<()> {
        match event {
            TreeEvent::RootName(name) => self.handle_root_name(&name),
            TreeEvent::MapRequest(window) => self.manage_window(window),
            TreeEvent::Withdrawn(window) => self.unmanage_window(window),
        }
    }

    /// Interpret a root window name: a plain task name switches to that
    /// task, a `MOVE_MARKER`-prefixed one moves the focused window there.
    pub fn handle_root_name(&mut self, name: &str) -> Result<()> {
        match root_name::parse(name) {
            Some(Request::SwitchTask(task)) => self.switch_task(task),
            Some(Request::MoveWindow(task)) => self.move_window_to_task(task),
            None => Ok(()),
        }
    }

    /// The node of `kind` on the active path. Every task has screens and
    /// every screen has workspaces, so a miss means the tree is corrupt.
    fn active(&self, kind: Kind) -> NodeId {
        self.nodes
            .search_active(self.nodes.root(), kind)
            .unwrap_or_else(|| panic!("No active {:?} in task tree", kind))
    }

    fn active_window(&self) -> Option<NodeId> {
        self.nodes.search_active(self.nodes.root(), Kind::Window)
    }

    /// The X11 window that should have input focus, if any
    pub fn focused_window(&self) -> Option<Window> {
        self.active_window().and_then(|id| self.nodes.window(id))
    }

    pub fn active_task_name(&self) -> &str {
        self.nodes
            .task_name(self.active(Kind::Task))
            .expect("Active task node must carry a name")
    }

    /// Names of all tasks, least recently used first
    pub fn task_names(&self) -> Vec<String> {
        self.nodes
            .search_all(self.nodes.root(), Kind::Task)
            .into_iter()
            .filter_map(|id| self.nodes.task_name(id).map(str::to_string))
            .collect()
    }

    fn find_task(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .search_all(self.nodes.root(), Kind::Task)
            .into_iter()
            .find(|&id| self.nodes.task_name(id) == Some(name))
    }

    fn find_windows(&self, window: Window) -> Vec<NodeId> {
        self.nodes
            .search_all(self.nodes.root(), Kind::Window)
            .into_iter()
            .filter(|&id| self.nodes.window(id) == Some(window))
            .collect()
    }

    pub fn is_managed(&self, window: Window) -> bool {
        !self.find_windows(window).is_empty()
    }

    pub fn window_count(&self) -> usize {
        self.nodes.search_all(self.nodes.root(), Kind::Window).len()
    }

    /// Create a task with one screen per monitor currently attached
    fn create_task(&mut self, name: &str) -> Result<NodeId> {
        let monitors = self.display.monitors()?.len();
        let task = self.nodes.insert(NodeData::Task {
            name: name.to_string(),
        });
        for _ in 0..monitors {
            let screen = self.nodes.insert(NodeData::Screen);
            for _ in 0..N_WORKSPACES {
                let workspace = self.nodes.insert(NodeData::Workspace {
                    master_factor: self.config.master_factor,
                });
                self.nodes.append(screen, workspace, false);
            }
            self.nodes.append(task, screen, false);
        }
        self.nodes.append(self.nodes.root(), task, false);
        log::info!("Created task '{}' with {} screen(s)", name, monitors);
        Ok(task)
    }

    fn find_or_create_task(&mut self, name: &str) -> Result<NodeId> {
        match self.find_task(name) {
            Some(task) => Ok(task),
            None => self.create_task(name),
        }
    }

    /// Make `name` the active task, creating it if needed. A previous task
    /// left without windows is destroyed.
    pub fn switch_task(&mut self, name: &str) -> Result<()> {
        let previous = self.nodes.search_active(self.nodes.root(), Kind::Task);
        if let Some(previous) = previous {
            if self.nodes.task_name(previous) == Some(name) {
                return Ok(());
            }
        }

        let target = self.find_or_create_task(name)?;
        if let Some(previous) = previous {
            if self.nodes.search_all(previous, Kind::Window).is_empty() {
                log::info!(
                    "Destroying empty task '{}'",
                    self.nodes.task_name(previous).unwrap_or_default()
                );
                self.nodes.destroy(previous);
            }
        }
        self.nodes.activate(target, true);
        log::info!("Switched to task '{}'", name);
        self.update_window_positions()
    }

    /// Send the focused window to task `name`; the user stays put
    pub fn move_window_to_task(&mut self, name: &str) -> Result<()> {
        let current = self.active(Kind::Task);
        if self.nodes.task_name(current) == Some(name) {
            return Ok(());
        }
        let Some(window) = self.active_window() else {
            return Ok(());
        };

        let target = self.find_or_create_task(name)?;
        let workspace = self
            .nodes
            .search_active(target, Kind::Workspace)
            .expect("Task must have an active workspace");
        self.transplant(window, workspace);
        self.nodes.activate(current, true);
        log::info!("Moved window to task '{}'", name);
        self.update_window_positions()
    }

    fn transplant(&mut self, window: NodeId, workspace: NodeId) {
        self.nodes.remove(window);
        self.nodes.append(workspace, window, true);
    }

    /// Send the focused window to the screen `offset` away (wrapping)
    pub fn move_window_to_screen(&mut self, offset: isize) -> Result<()> {
        let screen = self.active(Kind::Screen);
        let target = self.nodes.sibling_by_offset(screen, offset);
        if target == screen {
            return Ok(());
        }
        let Some(window) = self.active_window() else {
            return Ok(());
        };
        let workspace = self
            .nodes
            .search_active(target, Kind::Workspace)
            .expect("Screen must have an active workspace");
        self.transplant(window, workspace);
        self.update_window_positions()
    }

    /// Show workspace `index` on the active screen
    pub fn switch_workspace(&mut self, index: usize) -> Result<()> {
        let workspace = self.active(Kind::Workspace);
        if self.nodes.index(workspace) == index {
            return Ok(());
        }
        let Some(target) = self.nodes.sibling_by_index(workspace, index) else {
            log::warn!("No workspace {} on this screen", index);
            return Ok(());
        };
        self.nodes.activate(target, false);
        self.update_window_positions()
    }

    /// Send the focused window to workspace `index` of the active screen
    pub fn move_window_to_workspace(&mut self, index: usize) -> Result<()> {
        let workspace = self.active(Kind::Workspace);
        if self.nodes.index(workspace) == index {
            return Ok(());
        }
        let Some(window) = self.active_window() else {
            return Ok(());
        };
        let Some(target) = self.nodes.sibling_by_index(workspace, index) else {
            log::warn!("No workspace {} on this screen", index);
            return Ok(());
        };
        self.transplant(window, target);
        self.update_window_positions()
    }

    pub fn focus_screen_by_offset(&mut self, offset: isize) -> Result<()> {
        let screen = self.active(Kind::Screen);
        let target = self.nodes.sibling_by_offset(screen, offset);
        self.nodes.activate(target, false);
        self.update_window_focus()
    }

    /// Start tracking `window` in the active workspace as its new master
    pub fn manage_window(&mut self, window: Window) -> Result<()> {
        if !self.display.is_window_valid(window)? {
            log::debug!("Ignoring invalid window 0x{:x}", window);
            return Ok(());
        }
        if self.is_managed(window) {
            return Ok(());
        }

        let workspace = self.active(Kind::Workspace);
        let id = self.nodes.insert(NodeData::Window(window));
        self.nodes.append(workspace, id, true);
        self.nodes.activate(id, false);
        log::info!(
            "Managing window 0x{:x} in task '{}'",
            window,
            self.active_task_name()
        );
        self.update_window_positions()
    }

    /// Forget every node tracking `window`
    pub fn unmanage_window(&mut self, window: Window) -> Result<()> {
        let tracked = self.find_windows(window);
        if tracked.is_empty() {
            return Ok(());
        }
        for id in tracked {
            self.nodes.destroy(id);
        }
        log::info!(
            "Unmanaged window 0x{:x}, {} still managed",
            window,
            self.window_count()
        );
        self.update_window_positions()
    }

    pub fn focus_window_by_offset(&mut self, offset: isize) -> Result<()> {
        if let Some(window) = self.active_window() {
            let target = self.nodes.sibling_by_offset(window, offset);
            self.nodes.activate(target, false);
            self.update_window_focus()?;
        }
        Ok(())
    }

    /// Make the focused window master. If it already is, swap it with the
    /// most recent stack window instead.
    pub fn promote_window(&mut self) -> Result<()> {
        let Some(focused) = self.active_window() else {
            return Ok(());
        };
        if !self.nodes.is_highest_index(focused) {
            self.nodes.activate(focused, true);
            return self.update_window_positions();
        }

        let workspace = self.active(Kind::Workspace);
        let previous = self
            .nodes
            .children(workspace)
            .iter()
            .rev()
            .copied()
            .find(|&id| id != focused);
        if let Some(previous) = previous {
            self.nodes.activate(previous, true);
            self.update_window_positions()?;
        }
        Ok(())
    }

    pub fn adjust_master_factor(&mut self, delta: f64) -> Result<()> {
        let workspace = self.active(Kind::Workspace);
        let factor = self
            .nodes
            .master_factor(workspace)
            .expect("Active workspace must carry a master factor");
        let factor = layout::clamp_master_factor(factor + delta);
        self.nodes.set_master_factor(workspace, factor);
        log::debug!("Master factor now {:.2}", factor);
        self.update_window_positions()
    }

    /// Park every window off-screen, then tile the active task's workspaces
    /// onto the monitors and refresh focus.
    pub fn update_window_positions(&mut self) -> Result<()> {
        let windows: Vec<Window> = self
            .nodes
            .search_all(self.nodes.root(), Kind::Window)
            .into_iter()
            .filter_map(|id| self.nodes.window(id))
            .collect();
        let mut seen = HashSet::with_capacity(windows.len());
        for &window in &windows {
            assert!(
                seen.insert(window),
                "Duplicate window 0x{:x} in task tree",
                window
            );
        }

        for &window in &windows {
            self.display
                .move_window(window, PARK_POSITION, PARK_POSITION)?;
            self.display.map_window(window)?;
        }

        let task = self.active(Kind::Task);
        let screens = self.nodes.search_all(task, Kind::Screen);
        let monitors = self.display.monitors()?;
        assert!(!screens.is_empty(), "Active task has no screens");
        assert!(
            screens.len() <= monitors.len(),
            "Task has {} screens but only {} monitors are attached",
            screens.len(),
            monitors.len()
        );

        for (&screen, &monitor) in screens.iter().zip(&monitors) {
            let workspace = self
                .nodes
                .search_active(screen, Kind::Workspace)
                .expect("Screen must have an active workspace");
            let factor = self
                .nodes
                .master_factor(workspace)
                .expect("Workspace must carry a master factor");
            let children = self.nodes.children(workspace);
            let placements =
                layout::master_stack(children.len(), monitor, factor, self.config.border_width);
            for (&id, placement) in children.iter().zip(placements) {
                if let Some(window) = self.nodes.window(id) {
                    self.display
                        .configure_window(window, placement.rect, placement.border_width)?;
                }
            }
        }

        if log::log_enabled!(log::Level::Debug) {
            match serde_json::to_string(&self.snapshot()) {
                Ok(json) => log::debug!("Task tree: {}", json),
                Err(e) => log::debug!("Failed to serialize task tree: {}", e),
            }
        }

        self.update_window_focus()
    }

    /// Reset every border, then focus and highlight the active window, or
    /// fall back to the root window when there is none.
    pub fn update_window_focus(&mut self) -> Result<()> {
        for id in self.nodes.search_all(self.nodes.root(), Kind::Window) {
            if let Some(window) = self.nodes.window(id) {
                self.display
                    .set_border_color(window, self.config.border_unfocused)?;
            }
        }

        let focused = self.focused_window();
        let valid = match focused {
            Some(window) => self.display.is_window_valid(window)?,
            None => false,
        };
        match focused {
            Some(window) if valid => {
                self.display.focus_window(window)?;
                self.display
                    .set_border_color(window, self.config.border_focused)?;
            }
            _ => self.display.focus_root()?,
        }
        self.display.flush()
    }
}
