//! gwmctl - send task commands to gwm
//!
//! gwm watches the name of the root window. Setting it to a task name
//! switches to that task; prefixing the name with the move marker sends the
//! focused window there instead.
//!
//! # Examples
//!
//! ```bash
//! # Switch to (or create) the "mail" task
//! gwmctl switch mail
//!
//! # Move the focused window to the "web" task
//! gwmctl move web
//!
//! # Read the task from stdin, as the task menu does
//! echo mail | gwmctl name
//! ```

use std::io::BufRead;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt as _, PropMode};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

#[path = "../root_name.rs"]
mod root_name;

/// gwmctl - Control the gwm window manager
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch to a task, creating it if needed
    Switch {
        /// Task name
        task: String,
    },

    /// Move the focused window to a task
    Move {
        /// Task name
        task: String,
    },

    /// Read a task name from the first line of stdin
    Name {
        /// Move the focused window instead of switching
        #[arg(long = "move")]
        move_window: bool,
    },

    /// Print the current root window name
    Current,
}

fn set_root_name(name: &str) -> Result<()> {
    let (conn, screen_num) =
        RustConnection::connect(None).context("Failed to connect to X11 server")?;
    let root = conn.setup().roots[screen_num].root;
    conn.change_property8(
        PropMode::REPLACE,
        root,
        AtomEnum::WM_NAME,
        AtomEnum::STRING,
        name.as_bytes(),
    )?;
    conn.flush()?;
    Ok(())
}

fn current_root_name() -> Result<String> {
    let (conn, screen_num) =
        RustConnection::connect(None).context("Failed to connect to X11 server")?;
    let root = conn.setup().roots[screen_num].root;
    let reply = conn
        .get_property(false, root, AtomEnum::WM_NAME, AtomEnum::ANY, 0, 1024)?
        .reply()?;
    Ok(String::from_utf8_lossy(&reply.value).into_owned())
}

fn run(cli: Cli) -> Result<()> {
    let (task, move_window) = match cli.command {
        Commands::Switch { task } => (task, false),
        Commands::Move { task } => (task, true),
        Commands::Name { move_window } => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            (line, move_window)
        }
        Commands::Current => {
            println!("{}", current_root_name()?);
            return Ok(());
        }
    };

    match root_name::encode(&task, move_window) {
        Some(name) => set_root_name(&name),
        None => Ok(()),
    }
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
