use crate::domain::model::{StepResult, StepStatus};
use std::path::{Path, PathBuf};

/// 執行上下文，步驟之間只共享工作目錄與已完成的結果
#[derive(Debug, Clone)]
pub struct RunContext {
    pub execution_id: String,
    pub results: Vec<StepResult>,
    working_dir: PathBuf,
}

impl RunContext {
    pub fn new(execution_id: String, working_dir: PathBuf) -> Self {
        Self {
            execution_id,
            results: Vec::new(),
            working_dir,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// 切換後不會還原
    pub fn change_dir(&mut self, working_dir: PathBuf) {
        self.working_dir = working_dir;
    }

    /// 獲取上一個步驟的結果
    pub fn get_previous_result(&self) -> Option<&StepResult> {
        self.results.last()
    }

    /// 獲取指定名稱的步驟結果
    pub fn get_result_by_name(&self, name: &str) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step_name == name)
    }

    pub fn failed_result(&self) -> Option<&StepResult> {
        self.results.iter().find(|r| r.status == StepStatus::Failed)
    }

    pub fn add_result(&mut self, result: StepResult) {
        self.results.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(name: &str, status: StepStatus) -> StepResult {
        StepResult {
            step_name: name.to_string(),
            kind: "command",
            status,
            exit_code: if status == StepStatus::Succeeded { 0 } else { 1 },
            working_dir: PathBuf::from("/tmp"),
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_context_tracks_results() {
        let mut context = RunContext::new("run_1".to_string(), PathBuf::from("/tmp"));
        assert!(context.get_previous_result().is_none());

        context.add_result(result("bench", StepStatus::Succeeded));
        context.add_result(result("plot", StepStatus::Failed));

        assert_eq!(context.get_previous_result().unwrap().step_name, "plot");
        assert_eq!(context.get_result_by_name("bench").unwrap().exit_code, 0);
        assert_eq!(context.failed_result().unwrap().step_name, "plot");
        assert!(context.get_result_by_name("missing").is_none());
    }

    #[test]
    fn test_change_dir_persists() {
        let mut context = RunContext::new("run_1".to_string(), PathBuf::from("/work"));
        context.change_dir(PathBuf::from("/work/src"));
        assert_eq!(context.working_dir(), Path::new("/work/src"));
    }
}
