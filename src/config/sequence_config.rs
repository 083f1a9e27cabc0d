use crate::domain::model::{CommandSpec, Step};
use crate::domain::ports::PlanProvider;
use crate::utils::error::{Result, RunError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub sequence: SequenceInfo,
    pub steps: Vec<StepDefinition>,
    pub global: Option<GlobalConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceInfo {
    pub name: String,
    pub description: Option<String>,
    pub execution_order: Option<Vec<String>>, // 未指定時依宣告順序
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Command,
    Chdir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub kind: StepKind,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, String>>,
    pub timeout_seconds: Option<u64>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub working_directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub export_report: Option<bool>,
    pub report_file: Option<String>,
}

impl SequenceConfig {
    /// 從 TOML 檔案載入序列配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RunError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析序列配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RunError::ConfigValidationError {
            field: "sequence_toml_parsing".to_string(),
            message: format!("Sequence TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BENCH_FILTER})，找不到的變數保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RunError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證序列配置
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("sequence.name", &self.sequence.name)?;

        if self.steps.is_empty() {
            return Err(RunError::MissingConfigError {
                field: "steps".to_string(),
            });
        }

        validation::validate_unique_names("steps", self.steps.iter().map(|s| s.name.as_str()))?;

        if let Some(order) = &self.sequence.execution_order {
            let step_names: HashSet<&str> = self.steps.iter().map(|s| s.name.as_str()).collect();
            for step_name in order {
                if !step_names.contains(step_name.as_str()) {
                    return Err(RunError::ConfigValidationError {
                        field: "sequence.execution_order".to_string(),
                        message: format!(
                            "Step '{}' in execution order not found in steps definition",
                            step_name
                        ),
                    });
                }
            }
            validation::validate_unique_names(
                "sequence.execution_order",
                order.iter().map(String::as_str),
            )?;
        }

        if let Some(dir) = self.global.as_ref().and_then(|g| g.working_directory.as_deref()) {
            validation::validate_path("global.working_directory", dir)?;
        }

        for step in &self.steps {
            step.validate()?;
        }

        Ok(())
    }

    /// 獲取指定名稱的步驟定義
    pub fn get_step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// 獲取啟用的步驟列表（按執行順序）
    pub fn get_enabled_steps(&self) -> Vec<&StepDefinition> {
        let ordered: Vec<&StepDefinition> = match &self.sequence.execution_order {
            Some(order) => order.iter().filter_map(|name| self.get_step(name)).collect(),
            None => self.steps.iter().collect(),
        };

        ordered
            .into_iter()
            .filter(|step| step.enabled.unwrap_or(true))
            .collect()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// 報告輸出路徑；未啟用時為 None
    pub fn report_file(&self) -> Option<&str> {
        let monitoring = self.monitoring.as_ref()?;
        if monitoring.export_report.unwrap_or(false) {
            Some(
                monitoring
                    .report_file
                    .as_deref()
                    .unwrap_or("benchplot-report.json"),
            )
        } else {
            None
        }
    }
}

impl StepDefinition {
    fn field(&self, name: &str) -> String {
        format!("steps.{}.{}", self.name, name)
    }

    pub fn to_step(&self) -> Result<Step> {
        let step = match self.kind {
            StepKind::Command => {
                let program = validation::validate_required_field(&self.field("program"), &self.program)?;
                let mut command =
                    CommandSpec::new(program.clone()).with_args(self.args.clone().unwrap_or_default());
                if let Some(env) = &self.env {
                    command.env = env.clone();
                }
                if let Some(seconds) = self.timeout_seconds {
                    command = command.with_timeout(Duration::from_secs(seconds));
                }
                Step::command(self.name.clone(), command)
            }
            StepKind::Chdir => {
                let path = validation::validate_required_field(&self.field("path"), &self.path)?;
                Step::change_dir(self.name.clone(), path.clone())
            }
        };

        Ok(match &self.description {
            Some(description) => step.with_description(description.clone()),
            None => step,
        })
    }
}

impl Validate for StepDefinition {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("steps.name", &self.name)?;

        match self.kind {
            StepKind::Command => {
                let program = validation::validate_required_field(&self.field("program"), &self.program)?;
                validation::validate_non_empty_string(&self.field("program"), program)?;
                if self.path.is_some() {
                    return Err(RunError::ConfigValidationError {
                        field: self.field("path"),
                        message: "'path' is only valid for chdir steps".to_string(),
                    });
                }
            }
            StepKind::Chdir => {
                let path = validation::validate_required_field(&self.field("path"), &self.path)?;
                validation::validate_path(&self.field("path"), path)?;
                if self.program.is_some() || self.args.is_some() {
                    return Err(RunError::ConfigValidationError {
                        field: self.field("program"),
                        message: "chdir steps do not run a program".to_string(),
                    });
                }
            }
        }

        if let Some(seconds) = self.timeout_seconds {
            validation::validate_positive_number(&self.field("timeout_seconds"), seconds, 1)?;
        }

        Ok(())
    }
}

impl PlanProvider for SequenceConfig {
    fn plan_name(&self) -> &str {
        &self.sequence.name
    }

    fn working_directory(&self) -> Option<&str> {
        self.global.as_ref().and_then(|g| g.working_directory.as_deref())
    }

    fn steps(&self) -> Result<Vec<Step>> {
        self.get_enabled_steps()
            .into_iter()
            .map(StepDefinition::to_step)
            .collect()
    }
}

impl Validate for SequenceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
