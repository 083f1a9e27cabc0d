use crate::core::context::RunContext;
use crate::domain::model::{CommandSpec, ProcessExit, Step, StepAction, StepResult, StepStatus};
use crate::domain::ports::ProcessRunner;
use crate::utils::error::{Result, RunError};
use crate::utils::monitor::SystemMonitor;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// 步驟序列，依序執行，任何一步失敗即中止
pub struct StepSequence<R: ProcessRunner> {
    steps: Vec<Step>,
    runner: R,
    monitor: Option<SystemMonitor>,
    execution_id: String,
}

impl<R: ProcessRunner> StepSequence<R> {
    pub fn new(execution_id: String, runner: R) -> Self {
        Self {
            steps: Vec::new(),
            runner,
            monitor: None,
            execution_id,
        }
    }

    /// 啟用或禁用系統負載監控
    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = if enabled {
            Some(SystemMonitor::new(true))
        } else {
            None
        };
        self
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// 從指定目錄開始執行所有步驟
    pub async fn execute_all(&self, working_dir: PathBuf) -> Result<Vec<StepResult>> {
        let mut context = RunContext::new(self.execution_id.clone(), working_dir);
        self.execute_in(&mut context).await?;
        Ok(context.results)
    }

    /// 在既有上下文中執行；失敗時上下文保留已完成與失敗的步驟結果
    pub async fn execute_in(&self, context: &mut RunContext) -> Result<()> {
        let total = self.steps.len();

        if let Some(monitor) = &self.monitor {
            monitor.log_snapshot("Sequence started");
        }

        for (index, step) in self.steps.iter().enumerate() {
            tracing::info!(
                "▶️ [{}/{}] {}: {}",
                index + 1,
                total,
                step.name,
                step.summary_line()
            );

            let start_time = Instant::now();
            let working_dir = context.working_dir().to_path_buf();

            match self.execute_step(step, context).await {
                Ok(()) => {
                    let result = StepResult {
                        step_name: step.name.clone(),
                        kind: step.kind(),
                        status: StepStatus::Succeeded,
                        exit_code: 0,
                        working_dir,
                        duration: start_time.elapsed(),
                    };

                    tracing::info!(
                        "✅ Step completed: {} (duration: {:?})",
                        result.step_name,
                        result.duration
                    );
                    context.add_result(result);
                }
                Err(e) => {
                    tracing::error!("❌ Step '{}' failed: {}", step.name, e);
                    let skipped = total - index - 1;
                    if skipped > 0 {
                        tracing::warn!("⏭️ Aborting sequence, {} remaining step(s) not run", skipped);
                    }

                    context.add_result(StepResult {
                        step_name: step.name.clone(),
                        kind: step.kind(),
                        status: StepStatus::Failed,
                        exit_code: e.exit_code(),
                        working_dir,
                        duration: start_time.elapsed(),
                    });

                    if let Some(monitor) = &self.monitor {
                        monitor.log_final_stats();
                    }
                    return Err(e);
                }
            }
        }

        if let Some(monitor) = &self.monitor {
            monitor.log_snapshot("Sequence completed");
            monitor.log_final_stats();
        }

        Ok(())
    }

    async fn execute_step(&self, step: &Step, context: &mut RunContext) -> Result<()> {
        match &step.action {
            StepAction::Run(command) => self.run_command(step, command, context.working_dir()).await,
            StepAction::ChangeDir { path } => {
                let target = resolve_directory(step, context.working_dir(), path).await?;
                tracing::debug!("📂 Working directory is now {}", target.display());
                context.change_dir(target);
                Ok(())
            }
        }
    }

    async fn run_command(&self, step: &Step, command: &CommandSpec, working_dir: &Path) -> Result<()> {
        if let Some(monitor) = &self.monitor {
            monitor.log_snapshot(&format!("Before {}", step.name));
        }

        let exit = self
            .runner
            .run(command, working_dir)
            .await
            .map_err(|source| RunError::SpawnError {
                step: step.name.clone(),
                program: command.program.clone(),
                source,
            })?;

        match exit {
            ProcessExit::Exited(0) => Ok(()),
            ProcessExit::Exited(code) => Err(RunError::StepFailed {
                step: step.name.clone(),
                code,
            }),
            ProcessExit::Signaled(signal) => Err(RunError::StepTerminated {
                step: step.name.clone(),
                signal,
            }),
            ProcessExit::TimedOut(limit) => Err(RunError::StepTimedOut {
                step: step.name.clone(),
                seconds: limit.as_secs(),
            }),
        }
    }
}

/// 獲取執行摘要
pub fn execution_summary(results: &[StepResult]) -> HashMap<String, serde_json::Value> {
    let mut summary = HashMap::new();

    let succeeded = results
        .iter()
        .filter(|r| r.status == StepStatus::Succeeded)
        .count();
    let total_duration: std::time::Duration = results.iter().map(|r| r.duration).sum();
    let failed_step = results
        .iter()
        .find(|r| r.status == StepStatus::Failed)
        .map(|r| serde_json::Value::String(r.step_name.clone()))
        .unwrap_or(serde_json::Value::Null);

    summary.insert("total_steps".to_string(), serde_json::Value::Number(results.len().into()));
    summary.insert("succeeded_steps".to_string(), serde_json::Value::Number(succeeded.into()));
    summary.insert("failed_step".to_string(), failed_step);
    summary.insert(
        "total_duration_ms".to_string(),
        serde_json::Value::Number((total_duration.as_millis() as u64).into()),
    );

    let step_names: Vec<serde_json::Value> = results
        .iter()
        .map(|r| serde_json::Value::String(r.step_name.clone()))
        .collect();
    summary.insert("executed_steps".to_string(), serde_json::Value::Array(step_names));

    summary
}

async fn resolve_directory(step: &Step, current: &Path, path: &Path) -> Result<PathBuf> {
    // join 遇到絕對路徑會直接取代
    let target = current.join(path);

    let canonical = tokio::fs::canonicalize(&target)
        .await
        .map_err(|e| RunError::DirectoryError {
            step: step.name.clone(),
            path: target.clone(),
            reason: e.to_string(),
        })?;

    let metadata = tokio::fs::metadata(&canonical)
        .await
        .map_err(|e| RunError::DirectoryError {
            step: step.name.clone(),
            path: target.clone(),
            reason: e.to_string(),
        })?;

    if !metadata.is_dir() {
        return Err(RunError::DirectoryError {
            step: step.name.clone(),
            path: target,
            reason: "not a directory".to_string(),
        });
    }

    Ok(canonical)
}

/// 依 --only / --skip 篩選步驟，保留原本順序
///
/// 位於任一選中命令之前的 chdir 步驟一律保留，否則命令會在錯誤的目錄執行。
pub fn select_steps(steps: Vec<Step>, only: &[String], skip: &[String]) -> Vec<Step> {
    let only_names: HashSet<&str> = only.iter().map(|s| s.trim()).collect();
    let skip_names: HashSet<&str> = skip.iter().map(|s| s.trim()).collect();

    let selected: Vec<bool> = steps
        .iter()
        .map(|step| {
            (only_names.is_empty() || only_names.contains(step.name.as_str()))
                && !skip_names.contains(step.name.as_str())
        })
        .collect();

    let last_selected_command = steps
        .iter()
        .enumerate()
        .filter(|(index, step)| selected[*index] && matches!(step.action, StepAction::Run(_)))
        .map(|(index, _)| index)
        .last();

    steps
        .into_iter()
        .enumerate()
        .filter(|(index, step)| {
            selected[*index]
                || (matches!(step.action, StepAction::ChangeDir { .. })
                    && last_selected_command.is_some_and(|last| *index < last))
        })
        .map(|(_, step)| step)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    struct Invocation {
        program: String,
        args: Vec<String>,
        working_dir: PathBuf,
    }

    #[derive(Clone, Default)]
    struct MockRunner {
        exits: HashMap<String, ProcessExit>,
        missing: HashSet<String>,
        calls: Arc<Mutex<Vec<Invocation>>>,
    }

    impl MockRunner {
        fn with_exit(mut self, program: &str, exit: ProcessExit) -> Self {
            self.exits.insert(program.to_string(), exit);
            self
        }

        fn with_missing(mut self, program: &str) -> Self {
            self.missing.insert(program.to_string());
            self
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        fn programs(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.program).collect()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockRunner {
        async fn run(&self, command: &CommandSpec, working_dir: &Path) -> std::io::Result<ProcessExit> {
            if self.missing.contains(&command.program) {
                return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
            }
            self.calls.lock().unwrap().push(Invocation {
                program: command.program.clone(),
                args: command.args.clone(),
                working_dir: working_dir.to_path_buf(),
            });
            Ok(self
                .exits
                .get(&command.program)
                .copied()
                .unwrap_or(ProcessExit::Exited(0)))
        }
    }

    fn bench_and_plot(runner: MockRunner) -> StepSequence<MockRunner> {
        StepSequence::new("test_run".to_string(), runner).with_steps(vec![
            Step::command("bench", CommandSpec::new("cargo").with_args(["bench"])),
            Step::change_dir("enter-src", "src"),
            Step::command("plot", CommandSpec::new("python3").with_args(["visualise.py"])),
        ])
    }

    fn workspace() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("src")).unwrap();
        let root = std::fs::canonicalize(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    #[tokio::test]
    async fn test_all_steps_run_in_order() {
        let (_temp_dir, root) = workspace();
        let runner = MockRunner::default();
        let sequence = bench_and_plot(runner.clone());

        let results = sequence.execute_all(root.clone()).await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status == StepStatus::Succeeded));
        assert_eq!(results[0].step_name, "bench");
        assert_eq!(results[1].step_name, "enter-src");
        assert_eq!(results[2].step_name, "plot");

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "cargo");
        assert_eq!(calls[0].working_dir, root);
        assert_eq!(calls[1].program, "python3");
        assert_eq!(calls[1].args, vec!["visualise.py".to_string()]);
        assert_eq!(calls[1].working_dir, root.join("src"));
    }

    #[tokio::test]
    async fn test_failed_bench_never_runs_plot() {
        let (_temp_dir, root) = workspace();
        let runner = MockRunner::default().with_exit("cargo", ProcessExit::Exited(101));
        let sequence = bench_and_plot(runner.clone());

        let mut context = RunContext::new("test_run".to_string(), root.clone());
        let err = sequence.execute_in(&mut context).await.unwrap_err();

        assert_eq!(err.exit_code(), 101);
        assert_eq!(err.step_name(), Some("bench"));
        assert_eq!(runner.programs(), vec!["cargo".to_string()]);

        assert_eq!(context.results.len(), 1);
        assert_eq!(context.results[0].status, StepStatus::Failed);
        assert_eq!(context.results[0].exit_code, 101);
        // 失敗後工作目錄維持不變
        assert_eq!(context.working_dir(), root.as_path());
    }

    #[tokio::test]
    async fn test_failed_plot_exit_code_is_propagated() {
        let (_temp_dir, root) = workspace();
        let runner = MockRunner::default().with_exit("python3", ProcessExit::Exited(3));
        let sequence = bench_and_plot(runner.clone());

        let err = sequence.execute_all(root).await.unwrap_err();

        assert!(matches!(err, RunError::StepFailed { ref step, code: 3 } if step == "plot"));
        assert_eq!(runner.programs(), vec!["cargo".to_string(), "python3".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_directory_aborts_before_plot() {
        let temp_dir = TempDir::new().unwrap();
        let runner = MockRunner::default();
        let sequence = bench_and_plot(runner.clone());

        let err = sequence.execute_all(temp_dir.path().to_path_buf()).await.unwrap_err();

        assert!(matches!(err, RunError::DirectoryError { .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(runner.programs(), vec!["cargo".to_string()]);
    }

    #[tokio::test]
    async fn test_change_dir_to_file_is_rejected() {
        let (_temp_dir, root) = workspace();
        std::fs::write(root.join("notes.txt"), "x").unwrap();

        let sequence = StepSequence::new("test_run".to_string(), MockRunner::default())
            .with_steps(vec![Step::change_dir("enter", "notes.txt")]);

        let err = sequence.execute_all(root).await.unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[tokio::test]
    async fn test_missing_program_maps_to_127() {
        let (_temp_dir, root) = workspace();
        let runner = MockRunner::default().with_missing("python3");
        let sequence = bench_and_plot(runner);

        let err = sequence.execute_all(root).await.unwrap_err();
        assert!(matches!(err, RunError::SpawnError { .. }));
        assert_eq!(err.exit_code(), 127);
    }

    #[tokio::test]
    async fn test_signal_and_timeout_failures() {
        let (_temp_dir, root) = workspace();

        let killed = bench_and_plot(MockRunner::default().with_exit("cargo", ProcessExit::Signaled(2)));
        let err = killed.execute_all(root.clone()).await.unwrap_err();
        assert_eq!(err.exit_code(), 130);

        let slow = bench_and_plot(
            MockRunner::default()
                .with_exit("python3", ProcessExit::TimedOut(std::time::Duration::from_secs(30))),
        );
        let err = slow.execute_all(root).await.unwrap_err();
        assert!(matches!(err, RunError::StepTimedOut { seconds: 30, .. }));
        assert_eq!(err.exit_code(), 124);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let (_temp_dir, root) = workspace();

        let runner = MockRunner::default().with_exit("python3", ProcessExit::Exited(4));
        let sequence = bench_and_plot(runner.clone());

        let first = sequence.execute_all(root.clone()).await.unwrap_err();
        let first_calls = runner.calls();
        runner.calls.lock().unwrap().clear();

        let second = sequence.execute_all(root).await.unwrap_err();
        let second_calls = runner.calls();

        assert_eq!(first.exit_code(), second.exit_code());
        assert_eq!(first_calls, second_calls);
    }

    #[tokio::test]
    async fn test_empty_sequence_succeeds() {
        let sequence = StepSequence::new("empty".to_string(), MockRunner::default());
        let results = sequence.execute_all(std::env::temp_dir()).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_execution_summary() {
        let results = vec![
            StepResult {
                step_name: "bench".to_string(),
                kind: "command",
                status: StepStatus::Succeeded,
                exit_code: 0,
                working_dir: PathBuf::from("/work"),
                duration: std::time::Duration::from_millis(100),
            },
            StepResult {
                step_name: "plot".to_string(),
                kind: "command",
                status: StepStatus::Failed,
                exit_code: 1,
                working_dir: PathBuf::from("/work/src"),
                duration: std::time::Duration::from_millis(200),
            },
        ];

        let summary = execution_summary(&results);

        assert_eq!(summary.get("total_steps").unwrap(), &serde_json::Value::Number(2.into()));
        assert_eq!(summary.get("succeeded_steps").unwrap(), &serde_json::Value::Number(1.into()));
        assert_eq!(summary.get("failed_step").unwrap(), "plot");
        assert_eq!(summary.get("total_duration_ms").unwrap(), &serde_json::Value::Number(300.into()));

        let executed = summary.get("executed_steps").unwrap().as_array().unwrap();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0], serde_json::Value::String("bench".to_string()));
    }

    #[tokio::test]
    async fn test_add_step_appends_in_order() {
        let (_temp_dir, root) = workspace();
        let runner = MockRunner::default();
        let mut sequence = StepSequence::new("test_run".to_string(), runner.clone());

        sequence.add_step(Step::command("bench", CommandSpec::new("cargo")));
        sequence.add_step(Step::change_dir("enter-src", "src"));
        sequence.add_step(Step::command("plot", CommandSpec::new("python3")));

        let names: Vec<&str> = sequence.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bench", "enter-src", "plot"]);

        sequence.execute_all(root.clone()).await.unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].working_dir, root.join("src"));
    }

    fn names(steps: &[Step]) -> Vec<&str> {
        steps.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_select_steps_only_and_skip() {
        let steps = vec![
            Step::command("bench", CommandSpec::new("cargo")),
            Step::change_dir("enter-src", "src"),
            Step::command("plot", CommandSpec::new("python3")),
        ];

        let only = select_steps(steps.clone(), &["plot".to_string(), "enter-src".to_string()], &[]);
        assert_eq!(names(&only), vec!["enter-src", "plot"]);

        let skipped = select_steps(steps.clone(), &[], &["bench".to_string()]);
        assert_eq!(names(&skipped), vec!["enter-src", "plot"]);

        let all = select_steps(steps, &[], &[]);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_select_steps_keeps_change_dir_before_selected_command() {
        let steps = vec![
            Step::command("bench", CommandSpec::new("cargo")),
            Step::change_dir("enter-src", "src"),
            Step::command("plot", CommandSpec::new("python3")),
        ];

        let plot_only = select_steps(steps.clone(), &["plot".to_string()], &[]);
        assert_eq!(names(&plot_only), vec!["enter-src", "plot"]);

        // bench 之後沒有選中的命令，chdir 不需要保留
        let bench_only = select_steps(steps.clone(), &["bench".to_string()], &[]);
        assert_eq!(names(&bench_only), vec!["bench"]);

        let skip_chdir = select_steps(steps, &[], &["enter-src".to_string()]);
        assert_eq!(names(&skip_chdir), vec!["bench", "enter-src", "plot"]);
    }

    #[tokio::test]
    async fn test_plot_only_selection_runs_in_plot_dir() {
        let (_temp_dir, root) = workspace();
        let runner = MockRunner::default();
        let steps = select_steps(
            bench_and_plot(MockRunner::default()).steps().to_vec(),
            &["plot".to_string()],
            &[],
        );
        let sequence = StepSequence::new("test_run".to_string(), runner.clone()).with_steps(steps);

        sequence.execute_all(root.clone()).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "python3");
        assert_eq!(calls[0].working_dir, root.join("src"));
    }
}
