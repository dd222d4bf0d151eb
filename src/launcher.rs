use std::path::Path;
use std::process::Command;

use crate::error::Result;

/// Runner for the heavyweight steps of a tables import.
///
/// The production implementation shells out to wp-cli; tests substitute a
/// scripted stand-in. Only the exit status is observed; the child's output
/// streams pass through to the terminal.
pub trait Launcher {
    /// `wp db import <dump>`.
    fn db_import(&mut self, dump: &Path) -> Result<i32>;

    /// `wp search-replace <from> <to> --url=<scope>`.
    fn search_replace(&mut self, from: &str, to: &str, scope: &str) -> Result<i32>;
}

/// Launches through the `wp` binary, or whatever `--wp-bin` names.
pub struct WpCli {
    bin: String,
}

impl WpCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Launcher for WpCli {
    fn db_import(&mut self, dump: &Path) -> Result<i32> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("db").arg("import").arg(dump);
        run(cmd)
    }

    fn search_replace(&mut self, from: &str, to: &str, scope: &str) -> Result<i32> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("search-replace")
            .arg(from)
            .arg(to)
            .arg(format!("--url={scope}"));
        run(cmd)
    }
}

fn run(mut cmd: Command) -> Result<i32> {
    let status = cmd.status()?;
    // Signal deaths have no code; fold them into a generic failure.
    Ok(status.code().unwrap_or(-1))
}
