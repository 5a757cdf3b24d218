use std::{path::Path, process::Command, process::Stdio};

use anyhow::{Context, Result};
use tracing::debug;

fn opener(path: &Path) -> Command {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(path);
            command
        } else if #[cfg(target_os = "macos")] {
            let mut command = Command::new("open");
            command.arg(path);
            command
        } else {
            let mut command = Command::new("xdg-open");
            command.arg(path);
            command
        }
    }
}

/// Hands `path` to the system opener and returns right away. The opener runs detached so the
/// journal doesn't wait for the viewer to close.
pub fn open_with_system(path: &Path) -> Result<()> {
    let mut command = opener(path);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    debug!("Opening {path:?} with {command:?}");
    #[allow(clippy::zombie_processes)]
    let _ = command
        .spawn()
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(())
}
