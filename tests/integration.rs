//! Integration tests for gwm using Xvfb.
//!
//! These tests require:
//! - Xvfb (headless X server)
//! - The built gwm and gwmctl binaries
//!
//! Run with: RUST_LOG=info cargo test --test integration
//!
//! If Xvfb is not available, tests will be skipped.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

const SCREEN_WIDTH: u32 = 1280;
const SCREEN_HEIGHT: u32 = 800;
const PARK_POSITION: i32 = i16::MAX as i32;

/// Check if Xvfb is available
fn xvfb_available() -> bool {
    Command::new("which")
        .arg("Xvfb")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Poll `condition` until it holds or five seconds pass
fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Test fixture that manages the Xvfb and gwm lifecycle
struct TestHarness {
    xvfb: Child,
    wm: Child,
    display: String,
    conn: RustConnection,
    root: Window,
}

impl TestHarness {
    /// Start Xvfb on `display` and gwm on top of it
    fn new(display: &str) -> Option<Self> {
        if !xvfb_available() {
            eprintln!("Xvfb not available, skipping integration tests");
            return None;
        }

        let screen = format!("{}x{}x24", SCREEN_WIDTH, SCREEN_HEIGHT);
        let mut xvfb = match Command::new("Xvfb")
            .args([display, "-screen", "0", &screen])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                eprintln!("Failed to start Xvfb: {}", e);
                return None;
            }
        };

        // Wait for Xvfb to accept connections
        let mut connection = None;
        wait_for(|| {
            connection = RustConnection::connect(Some(display)).ok();
            connection.is_some()
        });
        let Some((conn, screen_num)) = connection else {
            eprintln!("Xvfb on {} never came up", display);
            let _ = xvfb.kill();
            return None;
        };
        let root = conn.setup().roots[screen_num].root;

        let wm = wm_command(display)
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start gwm");

        let harness = Self {
            xvfb,
            wm,
            display: display.to_string(),
            conn,
            root,
        };
        assert!(
            wait_for(|| harness.wm_is_running()),
            "gwm never selected SubstructureRedirect"
        );
        Some(harness)
    }

    /// gwm owns the root once it listens for substructure redirects
    fn wm_is_running(&self) -> bool {
        self.conn
            .get_window_attributes(self.root)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map(|attrs| {
                u32::from(attrs.all_event_masks) & u32::from(EventMask::SUBSTRUCTURE_REDIRECT) != 0
            })
            .unwrap_or(false)
    }

    /// Create and map a plain client window
    fn create_window(&self) -> Window {
        let window = self.conn.generate_id().unwrap();
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                self.root,
                10,
                10,
                100,
                100,
                0,
                WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new(),
            )
            .unwrap();
        self.conn.map_window(window).unwrap();
        self.conn.flush().unwrap();
        window
    }

    fn destroy_window(&self, window: Window) {
        self.conn.destroy_window(window).unwrap();
        self.conn.flush().unwrap();
    }

    /// (x, y, width, height, border_width) of `window`
    fn geometry(&self, window: Window) -> (i32, i32, u32, u32, u32) {
        let geom = self.conn.get_geometry(window).unwrap().reply().unwrap();
        (
            geom.x.into(),
            geom.y.into(),
            geom.width.into(),
            geom.height.into(),
            geom.border_width.into(),
        )
    }

    fn wait_for_geometry(&self, window: Window, expected: (i32, i32, u32, u32, u32)) {
        let reached = wait_for(|| self.geometry(window) == expected);
        assert!(
            reached,
            "window 0x{:x} at {:?}, expected {:?}",
            window,
            self.geometry(window),
            expected
        );
    }

    fn is_parked(&self, window: Window) -> bool {
        let (x, y, ..) = self.geometry(window);
        x == PARK_POSITION && y == PARK_POSITION
    }

    fn focused(&self) -> Window {
        self.conn.get_input_focus().unwrap().reply().unwrap().focus
    }

    /// Run gwmctl against this display
    fn gwmctl(&self, args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_gwmctl"))
            .args(args)
            .env("DISPLAY", &self.display)
            .output()
            .expect("Failed to run gwmctl")
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        let _ = self.wm.kill();
        let _ = self.wm.wait();
        let _ = self.xvfb.kill();
        let _ = self.xvfb.wait();
    }
}

fn wm_command(display: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gwm"));
    // Keep any user config out of the test
    cmd.args(["--config", "/nonexistent/gwm/config.toml"])
        .env("DISPLAY", display)
        .env("RUST_LOG", "info")
        .stdout(Stdio::null());
    cmd
}

#[test]
fn test_single_window_fills_screen() {
    let Some(h) = TestHarness::new(":91") else {
        return;
    };
    let window = h.create_window();
    h.wait_for_geometry(window, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));
    assert!(wait_for(|| h.focused() == window));
}

#[test]
fn test_master_stack_two_windows() {
    let Some(h) = TestHarness::new(":92") else {
        return;
    };
    let first = h.create_window();
    h.wait_for_geometry(first, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));
    let second = h.create_window();

    // floor(1280 * 0.6) = 768 for the master, border 2 on every side
    h.wait_for_geometry(second, (0, 0, 768 - 4, SCREEN_HEIGHT - 4, 2));
    h.wait_for_geometry(first, (768, 0, 512 - 4, SCREEN_HEIGHT - 4, 2));
    assert!(wait_for(|| h.focused() == second));

    // Closing the master gives the screen back to the survivor
    h.destroy_window(second);
    h.wait_for_geometry(first, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));
}

#[test]
fn test_task_switch_parks_windows() {
    let Some(h) = TestHarness::new(":93") else {
        return;
    };
    let window = h.create_window();
    h.wait_for_geometry(window, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));

    let output = h.gwmctl(&["switch", "mail"]);
    assert!(output.status.success());
    assert!(wait_for(|| h.is_parked(window)));

    // Windows created now belong to the new task
    let mail = h.create_window();
    h.wait_for_geometry(mail, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));

    let output = h.gwmctl(&["switch", "default"]);
    assert!(output.status.success());
    h.wait_for_geometry(window, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));
    assert!(wait_for(|| h.is_parked(mail)));
}

#[test]
fn test_move_window_to_task() {
    let Some(h) = TestHarness::new(":94") else {
        return;
    };
    let stay = h.create_window();
    h.wait_for_geometry(stay, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));
    let go = h.create_window();
    h.wait_for_geometry(go, (0, 0, 768 - 4, SCREEN_HEIGHT - 4, 2));

    let output = h.gwmctl(&["move", "web"]);
    assert!(output.status.success());
    // The focused window leaves and the view stays on the current task
    assert!(wait_for(|| h.is_parked(go)));
    h.wait_for_geometry(stay, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));

    let output = h.gwmctl(&["switch", "web"]);
    assert!(output.status.success());
    h.wait_for_geometry(go, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));
}

#[test]
fn test_gwmctl_name_reads_stdin() {
    let Some(h) = TestHarness::new(":95") else {
        return;
    };
    let window = h.create_window();
    h.wait_for_geometry(window, (0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0));

    let mut child = Command::new(env!("CARGO_BIN_EXE_gwmctl"))
        .arg("name")
        .env("DISPLAY", &h.display)
        .stdin(Stdio::piped())
        .spawn()
        .unwrap();
    {
        use std::io::Write;
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, "notes").unwrap();
    }
    assert!(child.wait().unwrap().success());
    assert!(wait_for(|| h.is_parked(window)));

    let output = h.gwmctl(&["current"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "notes");
}

#[test]
fn test_second_instance_refuses_to_start() {
    let Some(h) = TestHarness::new(":96") else {
        return;
    };
    let output = wm_command(&h.display).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Another window manager is already running"),
        "unexpected stderr: {}",
        stderr
    );
}
