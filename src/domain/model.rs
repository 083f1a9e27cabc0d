use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// 外部命令描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 用於日誌與 dry run 的命令列字串
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Run(CommandSpec),
    /// 切換工作目錄，之後的步驟都在新目錄執行，不會還原
    ChangeDir { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub description: Option<String>,
    pub action: StepAction,
}

impl Step {
    pub fn command(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            description: None,
            action: StepAction::Run(command),
        }
    }

    pub fn change_dir(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: None,
            action: StepAction::ChangeDir { path: path.into() },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> &'static str {
        match self.action {
            StepAction::Run(_) => "command",
            StepAction::ChangeDir { .. } => "chdir",
        }
    }

    pub fn summary_line(&self) -> String {
        match &self.action {
            StepAction::Run(command) => command.display_line(),
            StepAction::ChangeDir { path } => format!("cd {}", path.display()),
        }
    }
}

/// 子行程結束狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Exited(i32),
    Signaled(i32),
    TimedOut(Duration),
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        matches!(self, ProcessExit::Exited(0))
    }

    pub fn code(&self) -> i32 {
        match self {
            ProcessExit::Exited(code) => *code,
            ProcessExit::Signaled(signal) => 128 + signal,
            ProcessExit::TimedOut(_) => 124,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step_name: String,
    pub kind: &'static str,
    pub status: StepStatus,
    pub exit_code: i32,
    pub working_dir: PathBuf,
    pub duration: Duration,
}
