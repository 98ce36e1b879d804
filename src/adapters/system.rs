use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::core::process::{Invocation, ToolError, ToolOutput, ToolRunner};

/// Runs tools as real child processes and waits for them to exit.
pub struct SystemRunner {
    tmp_dir: PathBuf,
}

impl SystemRunner {
    pub fn new(tmp_dir: PathBuf) -> Self {
        Self { tmp_dir }
    }
}

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        debug!(command = %invocation, "Spawning tool");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .env("TMPDIR", &self.tmp_dir)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(
            program = %invocation.program,
            code = ?result.code,
            stderr_bytes = result.stderr.len(),
            "Tool exited"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_both_streams() {
        let runner = SystemRunner::new(std::env::temp_dir());
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("echo out; echo err >&2; exit 3");

        let output = runner.run(&inv).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[tokio::test]
    async fn arguments_are_not_shell_interpreted() {
        let runner = SystemRunner::new(std::env::temp_dir());
        let inv = Invocation::new("echo").arg("$(id); rm -rf /nope");

        let output = runner.run(&inv).await.unwrap();
        assert_eq!(output.stdout, "$(id); rm -rf /nope\n");
    }

    #[tokio::test]
    async fn exports_tmp_dir() {
        let runner = SystemRunner::new(PathBuf::from("/var/tmp/cdripd-test"));
        let inv = Invocation::new("sh").arg("-c").arg("printf %s \"$TMPDIR\"");

        let output = runner.run(&inv).await.unwrap();
        assert_eq!(output.stdout, "/var/tmp/cdripd-test");
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let runner = SystemRunner::new(std::env::temp_dir());
        let inv = Invocation::new("/nonexistent/cdripd-tool");

        let err = runner.run(&inv).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
