// # Shell Address Source
//
// This crate resolves a public address by running an external command
// through the system shell and taking its standard output.
//
// ## Behavior
//
// - Runs `sh -c <command>` (`cmd /C <command>` on Windows)
// - Captures stdout only; stderr goes straight to the caller's stderr
// - Waits at most the configured timeout (300 seconds by default)
// - On timeout kills the command, then waits without a bound for the
//   output it already produced
// - Exit status is ignored: any output, even empty, is the answer
//
// ## Process cleanup
//
// On Unix the command leads its own process group, and a timeout kills the
// whole group. Pipelines such as `dig ... | head -1` therefore cannot leave
// a grandchild holding stdout open. Every other exit path is covered by
// `kill_on_drop`.

use pubip_core::message::AddressFamily;
use pubip_core::traits::AddressSource;
use pubip_core::{Error, Result};

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Default bound on how long a resolver command may run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Address source backed by a shell command
#[derive(Debug, Clone)]
pub struct ShellAddressSource {
    /// Family this command resolves
    family: AddressFamily,

    /// Command line handed to the shell
    command: String,

    /// Bound on the first wait
    timeout: Duration,
}

impl ShellAddressSource {
    /// Create a new shell address source with the default timeout
    pub fn new(family: AddressFamily, command: impl Into<String>) -> Self {
        Self::with_timeout(family, command, DEFAULT_TIMEOUT)
    }

    /// Create with a custom timeout
    pub fn with_timeout(
        family: AddressFamily,
        command: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            family,
            command: command.into(),
            timeout,
        }
    }

    /// The command line this source runs
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The bound on the first wait
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn shell_command(&self) -> Command {
        #[cfg(unix)]
        let mut command = {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.command);
            // Own process group, so a timeout can kill pipelines too
            c.process_group(0);
            c
        };

        #[cfg(not(unix))]
        let mut command = {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.command);
            c
        };

        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        command
    }

    /// Run the command and collect its raw stdout
    async fn run(&self) -> Result<Vec<u8>> {
        let mut child = self.shell_command().spawn().map_err(|e| {
            Error::address_source(format!(
                "failed to run {} resolver '{}': {}",
                self.family, self.command, e
            ))
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::address_source("resolver stdout was not captured"))?;

        // Drain concurrently so a chatty command never blocks on a full pipe
        let reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        });

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        match waited {
            Ok(status) => log_exit(self.family, status?),
            Err(_) => {
                info!(
                    family = %self.family,
                    timeout = ?self.timeout,
                    "Resolver timed out, killing it"
                );
                terminate(&mut child).await?;
            }
        }

        let output = reader
            .await
            .map_err(|e| Error::address_source(format!("resolver output task failed: {}", e)))??;

        Ok(output)
    }
}

#[async_trait::async_trait]
impl AddressSource for ShellAddressSource {
    async fn resolve(&self) -> Result<String> {
        debug!(family = %self.family, command = %self.command, "Running resolver");

        let output = self.run().await?;
        decode(output)
    }

    fn family(&self) -> AddressFamily {
        self.family
    }
}

/// Decode resolver output as UTF-8 and strip surrounding whitespace
fn decode(output: Vec<u8>) -> Result<String> {
    let text = String::from_utf8(output)
        .map_err(|e| Error::address_source(format!("resolver output is not UTF-8: {}", e)))?;

    Ok(text.trim().to_string())
}

fn log_exit(family: AddressFamily, status: ExitStatus) {
    if status.success() {
        debug!(%family, "Resolver finished");
    } else {
        debug!(%family, %status, "Resolver exited unsuccessfully, using its output anyway");
    }
}

/// Kill the command (and on Unix its whole process group), then reap it
async fn terminate(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        // The child is not reaped yet, so its pid is still its group id
        if let Some(pid) = child.id()
            && let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL)
        {
            debug!(pid, error = %e, "Process group kill failed");
        }
    }

    match child.kill().await {
        Ok(()) => Ok(()),
        // Already gone after the group kill; make sure it is reaped
        Err(_) => child.wait().await.map(|_| ()).map_err(Error::from),
    }
}
