//! Collaborator process execution.
//!
//! All three external collaborators (corpus generator, load tool, report
//! aggregator) are launched through the same primitive: spawn, inherit the
//! operator's terminal, block until exit. `kill_on_drop` ensures that
//! cancelling the orchestrator mid-run takes the in-flight child down with
//! it while leaving completed cells' artifacts untouched.

use std::io;
use std::path::Path;
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::debug;

/// Run a collaborator to completion, inheriting stdout/stderr.
///
/// Returns the child's exit status; spawn and wait failures surface as
/// `io::Error` for the caller to wrap into its own error domain.
pub async fn run_tool(
    program: &str,
    args: &[String],
    working_dir: Option<&Path>,
) -> io::Result<ExitStatus> {
    debug!("Launching collaborator: {} {}", program, args.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn()?;
    let status = child.wait().await?;

    debug!("Collaborator {} exited: {}", program, status);
    Ok(status)
}

/// Interpret an exit status as a numeric code.
///
/// Signal deaths (no code on Unix) are reported as -1; the distinction does
/// not matter to the matrix, which only needs zero / non-zero.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[cfg(unix)]
    async fn test_run_tool_success() {
        let status = run_tool("true", &[], None).await.unwrap();
        assert!(status.success());
        assert_eq!(exit_code(status), 0);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_run_tool_nonzero_exit() {
        let args = vec!["-c".to_string(), "exit 7".to_string()];
        let status = run_tool("sh", &args, None).await.unwrap();
        assert!(!status.success());
        assert_eq!(exit_code(status), 7);
    }

    #[tokio::test]
    async fn test_run_tool_missing_program() {
        let result = run_tool("ptx-no-such-tool-exists", &[], None).await;
        assert!(result.is_err());
    }
}
