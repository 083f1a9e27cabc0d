use crate::domain::model::{CommandSpec, ProcessExit, Step};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// 執行外部命令並等待結束
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// 回傳 Err 代表行程根本無法啟動；非零退出碼以 `ProcessExit` 表示
    async fn run(&self, command: &CommandSpec, working_dir: &Path) -> std::io::Result<ProcessExit>;
}

/// 執行計畫來源（內建計畫或序列設定檔）
pub trait PlanProvider {
    fn plan_name(&self) -> &str;
    fn working_directory(&self) -> Option<&str>;
    fn steps(&self) -> Result<Vec<Step>>;
}
