use crate::domain::model::{StepResult, StepStatus};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub kind: String,
    pub status: StepStatus,
    pub exit_code: i32,
    pub working_dir: String,
    pub duration_ms: u64,
}

impl From<&StepResult> for StepReport {
    fn from(result: &StepResult) -> Self {
        Self {
            name: result.step_name.clone(),
            kind: result.kind.to_string(),
            status: result.status,
            exit_code: result.exit_code,
            working_dir: result.working_dir.display().to_string(),
            duration_ms: result.duration.as_millis() as u64,
        }
    }
}

/// 單次執行的 JSON 報告
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub execution_id: String,
    pub sequence_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub exit_code: i32,
    pub error: Option<String>,
    pub summary: HashMap<String, serde_json::Value>,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn new(
        execution_id: &str,
        sequence_name: &str,
        started_at: DateTime<Utc>,
        results: &[StepResult],
        summary: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            sequence_name: sequence_name.to_string(),
            started_at,
            finished_at: Utc::now(),
            exit_code: 0,
            error: None,
            summary,
            steps: results.iter().map(StepReport::from).collect(),
        }
    }

    pub fn with_failure(mut self, exit_code: i32, error: String) -> Self {
        self.exit_code = exit_code;
        self.error = Some(error);
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, self.to_json()?).await?;
        tracing::info!("📊 Run report exported to: {}", path.display());
        Ok(())
    }
}
