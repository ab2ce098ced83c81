// src/gate/command.rs

//! Gate backed by a shell command, configured as `[gate.<name>] cmd = "..."`.

use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::gate::{Gate, GateError, GateFuture, GateResult};

/// Maximum number of output lines turned into diagnostics.
const MAX_DIAGNOSTICS: usize = 20;

/// `path/to/file.rs:12:5: message` or `path/to/file.ts:12: message`.
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\s:]+\.[A-Za-z0-9]+):(\d+)(?::\d+)?:?\s*(.*)$")
        .expect("diagnostic location regex is valid")
});

/// Runs `cmd` through the platform shell in the project directory.
///
/// The gate passes when the command exits successfully. On failure, the
/// tail of stderr (or stdout, if stderr is empty) becomes the error list,
/// with `file:line:` prefixes lifted into structured locations.
///
/// On unix the shell leads its own process group. If the run is dropped
/// before the command exits (a pipeline timeout aborts it), the whole group
/// is killed, including background jobs the command started. Elsewhere only
/// the shell itself is killed, via `kill_on_drop`.
#[derive(Debug, Clone)]
pub struct CommandGate {
    name: String,
    cmd: String,
    remediation: Option<String>,
}

impl CommandGate {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            remediation: None,
        }
    }

    /// Hint attached to every diagnostic of a failed run.
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn execute(&self, project_dir: &Path) -> anyhow::Result<GateResult> {
        info!(gate = %self.name, cmd = %self.cmd, "starting gate command");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        cmd.current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning command for gate '{}'", self.name))?;
        let mut group = ProcessGroupGuard::new(child.id());

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("running command for gate '{}'", self.name))?;
        group.disarm();

        let code = output.status.code().unwrap_or(-1);
        debug!(gate = %self.name, exit_code = code, "gate command exited");

        if output.status.success() {
            return Ok(GateResult::pass(&self.name));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stderr.trim().is_empty() { stdout } else { stderr };

        let mut errors: Vec<GateError> = tail_lines(&text, MAX_DIAGNOSTICS)
            .into_iter()
            .map(parse_diagnostic)
            .collect();
        errors.push(GateError::new(format!(
            "command `{}` exited with code {code}",
            self.cmd
        )));

        if let Some(hint) = &self.remediation {
            for err in errors.iter_mut() {
                err.remediation = Some(hint.clone());
            }
        }

        Ok(GateResult::fail(&self.name, errors))
    }
}

impl Gate for CommandGate {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, project_dir: &'a Path) -> GateFuture<'a> {
        Box::pin(self.execute(project_dir))
    }
}

/// Kills the child's process group when dropped while still armed.
#[derive(Debug)]
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                Ok(()) => info!(pgid, "killed gate process group"),
                Err(e) => debug!(pgid, error = %e, "gate process group already gone"),
            }
        }
        #[cfg(not(unix))]
        debug!(pgid, "gate dropped before exit; relying on kill_on_drop");
    }
}

fn tail_lines(text: &str, max: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].to_vec()
}

fn parse_diagnostic(line: &str) -> GateError {
    match LOCATION_RE.captures(line) {
        Some(caps) => {
            let file = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let line_no = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
            let message = caps
                .get(3)
                .map(|m| m.as_str().trim())
                .filter(|m| !m.is_empty())
                .unwrap_or(line.trim());
            GateError::new(message).at(file, line_no)
        }
        None => GateError::new(line.trim()),
    }
}
