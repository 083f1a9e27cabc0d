pub mod context;
pub mod report;
pub mod sequence;

pub use crate::domain::model::{CommandSpec, ProcessExit, Step, StepAction, StepResult, StepStatus};
pub use crate::domain::ports::{PlanProvider, ProcessRunner};
pub use crate::utils::error::Result;
