//! Subprocess execution with deadlines and cancellation.
//!
//! Transcoding, PDF rendering, and OCR all run as external tools. Every
//! invocation gets a wall-clock deadline and honors the request's
//! cancellation token: the child is killed, then awaited with a short grace
//! period so no zombie survives the request.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::error::AuditError;

const KILL_GRACE: Duration = Duration::from_secs(2);

/// Captured output of a finished subprocess.
#[derive(Debug)]
pub struct ProcOutput {
    pub status_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

enum Waited {
    Done(std::io::Result<std::process::ExitStatus>, Vec<u8>, String),
    TimedOut,
    Cancelled,
}

/// Run `program` with `args`, capturing stdout/stderr, bounded by `deadline`
/// and `cancel`. On expiry or cancellation the child is killed and awaited
/// for up to two seconds before the error is returned, so callers may remove
/// the working directory immediately afterwards.
pub async fn run(
    program: &Path,
    args: &[&str],
    workdir: &Path,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<ProcOutput, AuditError> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AuditError::FetchNetwork(format!("spawn {}: {e}", program.display())))?;

    // Drain pipes concurrently with the wait; a chatty child must not block
    // on a full pipe while we only poll wait().
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let waited = tokio::select! {
        res = tokio::time::timeout(deadline, async {
            let drain = async {
                let mut stdout = Vec::new();
                let mut stderr = String::new();
                if let Some(out) = stdout_pipe.as_mut() {
                    out.read_to_end(&mut stdout).await.ok();
                }
                if let Some(err) = stderr_pipe.as_mut() {
                    err.read_to_string(&mut stderr).await.ok();
                }
                (stdout, stderr)
            };
            let (status, (stdout, stderr)) = tokio::join!(child.wait(), drain);
            (status, stdout, stderr)
        }) => match res {
            Ok((status, stdout, stderr)) => Waited::Done(status, stdout, stderr),
            Err(_) => Waited::TimedOut,
        },
        _ = cancel.cancelled() => Waited::Cancelled,
    };

    match waited {
        Waited::Done(Ok(status), stdout, stderr) => Ok(ProcOutput {
            status_code: status.code(),
            stdout,
            stderr,
        }),
        Waited::Done(Err(e), _, _) => Err(AuditError::FetchNetwork(format!(
            "wait {}: {e}",
            program.display()
        ))),
        Waited::TimedOut => {
            reap(&mut child, program).await;
            Err(AuditError::FetchTimeout(deadline))
        }
        Waited::Cancelled => {
            reap(&mut child, program).await;
            Err(AuditError::Cancelled)
        }
    }
}

/// Kill the child, then await exit for up to the grace period.
async fn reap(child: &mut tokio::process::Child, program: &Path) {
    if let Err(e) = child.start_kill() {
        warn!(program = %program.display(), "failed to signal subprocess: {e}");
        return;
    }
    if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
        warn!(
            program = %program.display(),
            "subprocess did not exit within kill grace period"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn captures_stdout() {
        let out = run(
            &sh(),
            &["-c", "echo hello"],
            Path::new("."),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(out.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let out = run(
            &sh(),
            &["-c", "echo oops >&2; exit 3"],
            Path::new("."),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(!out.success());
        assert_eq!(out.status_code, Some(3));
        assert!(out.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn deadline_kills_child() {
        let err = run(
            &sh(),
            &["-c", "sleep 30"],
            Path::new("."),
            Duration::from_millis(100),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuditError::FetchTimeout(_)));
    }

    #[tokio::test]
    async fn cancellation_aborts_child() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });
        let err = run(
            &sh(),
            &["-c", "sleep 30"],
            Path::new("."),
            Duration::from_secs(30),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuditError::Cancelled));
    }
}
