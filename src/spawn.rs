//! Fire-and-forget helper processes.
//!
//! Children run in their own session so they outlive the window manager.
//! Once [`ignore_child_signals`] has run the kernel reaps them, and nothing
//! here ever waits on an exit status.

use std::ffi::OsStr;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};

/// Environment variable carrying the active task to spawned programs
pub const ENV_TASK_NAME: &str = "GWM_TASK_NAME";

/// Set SIGCHLD to SIG_IGN so exited children never become zombies
pub fn ignore_child_signals() {
    unsafe {
        libc::signal(libc::SIGCHLD, libc::SIG_IGN);
    }
}

/// Build a detached command from a whitespace-separated command line.
///
/// `~` is expanded. Returns `None` for an empty command line.
pub fn command(command_line: &str, cwd: Option<&Path>, env: &[(&str, &str)]) -> Option<Command> {
    let expanded = shellexpand::tilde(command_line);
    let parts: Vec<&str> = expanded.split_whitespace().collect();
    let (program, args) = parts.split_first()?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.envs(env.iter().copied());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    unsafe {
        cmd.pre_exec(|| {
            // New session, detached from our process group
            libc::setsid();
            Ok(())
        });
    }
    Some(cmd)
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Locate `program` the way `execvp` would: names with a `/` are taken as
/// paths, everything else is looked up in `path` (a `PATH`-style list).
pub fn find_program(program: &str, path: Option<&OsStr>) -> Option<PathBuf> {
    let program = shellexpand::tilde(program);
    if program.contains('/') {
        let candidate = PathBuf::from(program.as_ref());
        return is_executable(&candidate).then_some(candidate);
    }
    std::env::split_paths(path?)
        .map(|dir| dir.join(program.as_ref()))
        .find(|candidate| is_executable(candidate))
}

/// Programs named by `command_lines` that cannot be found in `path`
pub fn missing_programs<'a>(command_lines: &[&'a str], path: Option<&OsStr>) -> Vec<&'a str> {
    command_lines
        .iter()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|program| find_program(program, path).is_none())
        .collect()
}

/// Start `command_line` and forget about it
pub fn spawn(command_line: &str, cwd: Option<&Path>, env: &[(&str, &str)]) -> Result<Child> {
    let mut cmd = command(command_line, cwd, env).context("Empty command line")?;
    log::info!("Spawning '{}'", command_line);
    cmd.spawn()
        .with_context(|| format!("Failed to spawn '{}'", command_line))
}

/// Run `menu` over `candidates` and pipe its selection into `ctl name`.
///
/// `ctl` gets `--move` appended when the selection should move the focused
/// window instead of switching tasks. Returns the `ctl` child.
pub fn spawn_task_menu(
    menu: &str,
    ctl: &str,
    candidates: &[String],
    move_window: bool,
) -> Result<Child> {
    let mut menu_cmd = command(menu, None, &[]).context("Empty menu command")?;
    let mut menu_child = menu_cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn menu '{}'", menu))?;
    let selection = menu_child
        .stdout
        .take()
        .context("Menu has no stdout")?;

    let mut ctl_cmd = command(ctl, None, &[]).context("Empty ctl command")?;
    ctl_cmd.arg("name");
    if move_window {
        ctl_cmd.arg("--move");
    }
    let ctl_child = ctl_cmd
        .stdin(Stdio::from(selection))
        .spawn()
        .with_context(|| format!("Failed to spawn '{}'", ctl))?;

    if let Some(mut stdin) = menu_child.stdin.take() {
        let mut input = candidates.join("\n");
        input.push('\n');
        if let Err(e) = stdin.write_all(input.as_bytes()) {
            log::warn!("Failed to feed task names to '{}': {}", menu, e);
        }
    }

    Ok(ctl_child)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gwm-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_command_splits_arguments() {
        let cmd = command("st -e  htop", None, &[]).unwrap();
        assert_eq!(cmd.get_program(), "st");
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args, ["-e", "htop"]);
        assert!(command("   ", None, &[]).is_none());
    }

    #[test]
    fn test_command_sets_task_environment() {
        let cmd = command("st", Some(Path::new("/tmp")), &[(ENV_TASK_NAME, "mail")]).unwrap();
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/tmp")));
        let envs: Vec<_> = cmd.get_envs().collect();
        assert_eq!(envs, [(OsStr::new(ENV_TASK_NAME), Some(OsStr::new("mail")))]);
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        assert!(spawn("gwm-test-no-such-program", None, &[]).is_err());
        assert!(spawn("", None, &[]).is_err());
    }

    #[test]
    fn test_menu_selection_reaches_ctl() {
        let dir = scratch_dir("spawn");
        let script = dir.join("ctl.sh");
        let out = dir.join("ctl.out");
        std::fs::write(
            &script,
            format!("read line\necho \"$line $*\" > {}\n", out.display()),
        )
        .unwrap();

        let candidates = vec!["work".to_string(), "default".to_string()];
        let ctl = format!("sh {}", script.display());
        let mut child = spawn_task_menu("head -n 1", &ctl, &candidates, true).unwrap();
        assert!(child.wait().unwrap().success());

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "work name --move");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_find_program_on_path() {
        let path = std::env::var_os("PATH");
        assert!(find_program("sh", path.as_deref()).is_some());
        assert!(find_program("gwm-test-no-such-program", path.as_deref()).is_none());
        assert!(find_program("sh", None).is_none());
    }

    #[test]
    fn test_find_program_needs_exec_bit() {
        let dir = scratch_dir("path");
        let tool = dir.join("gwm-helper");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o644)).unwrap();
        let search = dir.clone().into_os_string();
        let path = Some(search.as_os_str());

        assert_eq!(find_program("gwm-helper", path), None);
        assert_eq!(find_program(tool.to_str().unwrap(), None), None);

        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_program("gwm-helper", path), Some(tool.clone()));
        assert_eq!(find_program(tool.to_str().unwrap(), None), Some(tool.clone()));
        // Directories are not programs
        assert_eq!(find_program(dir.to_str().unwrap(), None), None);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_programs_checks_first_word() {
        let path = std::env::var_os("PATH");
        let lines = ["sh -c true", "gwm-test-no-such-program --flag", "  "];
        assert_eq!(
            missing_programs(&lines, path.as_deref()),
            ["gwm-test-no-such-program"]
        );
    }
}
