//! Opening URLs in the operator's browser
//!
//! The Finder never waits on the browser: the platform command is spawned
//! detached and only the spawn failure is reported.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// External collaborator invoked by the Finder's open action
pub trait UrlOpener: Send {
    fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs with the platform default browser
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let mut command = browser_command(url);

        command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to launch browser for {}", url))?;

        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn browser_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn browser_command(url: &str) -> Command {
    let mut command = Command::new("rundll32");
    command.args(["url.dll,FileProtocolHandler", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn browser_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}
