//! gwm - a task-oriented tiling window manager
//!
//! Windows live in a Root -> Task -> Screen -> Workspace -> Window tree and
//! are tiled master-stack. Tasks are switched by setting the root window
//! name, which `gwmctl` does on behalf of the task menu.

mod config;
mod display;
mod keys;
mod layout;
mod node;
mod root_name;
mod spawn;
mod tree;
mod types;
mod wm;
mod x11;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use config::Config;
use keys::KeyBindings;
use wm::WindowManager;
use x11::X11Display;

#[derive(Parser)]
#[command(name = "gwm")]
#[command(about = "Task-oriented tiling window manager for X11")]
#[command(version)]
struct Args {
    /// Config file (defaults to ~/.config/gwm/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting gwm");

    let config = match args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    // Helpers are only needed on demand, so a missing one is not fatal
    let search_path = std::env::var_os("PATH");
    let commands = config.commands.command_lines();
    for program in spawn::missing_programs(&commands, search_path.as_deref()) {
        log::warn!("'{}' not found in PATH", program);
    }

    // Children are fire-and-forget; let the kernel reap them
    spawn::ignore_child_signals();

    let display = X11Display::connect()?;

    // Become the window manager
    display.become_wm()?;

    // Grab our keybindings
    let keymap = display.keysym_to_keycode()?;
    let bindings = KeyBindings::resolve(&config.parse_keybindings(), &keymap);
    if bindings.is_empty() {
        log::warn!("No key bindings could be resolved");
    }
    display.grab_keys(&bindings)?;

    let mut wm = WindowManager::new(display, &config, bindings)?;

    // Manage any existing windows
    wm.scan_existing_windows()?;

    // Run the event loop
    wm.run()?;

    Ok(())
}
