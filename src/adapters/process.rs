use crate::domain::model::{CommandSpec, ProcessExit};
use crate::domain::ports::ProcessRunner;
use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// 以 tokio 子行程執行命令，stdio 直接繼承給使用者終端
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &CommandSpec, working_dir: &Path) -> std::io::Result<ProcessExit> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .current_dir(working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        tracing::debug!(
            "🔧 Spawning '{}' in {}",
            command.display_line(),
            working_dir.display()
        );
        let mut child = cmd.spawn()?;

        let status = match command.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => status?,
                    Err(_) => {
                        tracing::warn!("⏱️ '{}' exceeded {:?}, killing it", command.program, limit);
                        child.kill().await?;
                        return Ok(ProcessExit::TimedOut(limit));
                    }
                }
            }
            None => child.wait().await?,
        };

        Ok(exit_from_status(status))
    }
}

fn exit_from_status(status: ExitStatus) -> ProcessExit {
    if let Some(code) = status.code() {
        return ProcessExit::Exited(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ProcessExit::Signaled(signal);
        }
    }

    ProcessExit::Exited(1)
}
