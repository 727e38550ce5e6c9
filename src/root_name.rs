//! The root window name as a request channel from gwmctl to gwm.
//!
//! Shared by both binaries: gwmctl encodes, gwm parses.

/// Prefix asking to move the focused window to the task named by the rest
/// of the string
pub const MOVE_MARKER: &str = "TASK_WINDOW_MOVE_MARKER";

/// What a root window name asks for
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    SwitchTask(&'a str),
    MoveWindow(&'a str),
}

/// Interpret a root window name. Empty names and a bare marker ask for
/// nothing.
#[allow(dead_code)]
pub fn parse(name: &str) -> Option<Request<'_>> {
    match name.strip_prefix(MOVE_MARKER) {
        Some("") => None,
        Some(task) => Some(Request::MoveWindow(task)),
        None if name.is_empty() => None,
        None => Some(Request::SwitchTask(name)),
    }
}

/// The root window name requesting `task`, or `None` for a blank task
#[allow(dead_code)]
pub fn encode(task: &str, move_window: bool) -> Option<String> {
    let task = task.trim();
    if task.is_empty() {
        return None;
    }
    if move_window {
        Some(format!("{}{}", MOVE_MARKER, task))
    } else {
        Some(task.to_string())
    }
}
