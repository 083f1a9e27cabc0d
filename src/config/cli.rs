use crate::domain::model::{CommandSpec, Step};
use crate::domain::ports::PlanProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;

pub const DEFAULT_CONFIG_FILE: &str = "benchplot.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "benchplot")]
#[command(about = "Run a benchmark suite, then plot its results; stops at the first failing step")]
pub struct CliConfig {
    /// Path to a sequence file (defaults to ./benchplot.toml when present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Benchmark program of the built-in plan
    #[arg(long, default_value = "cargo")]
    pub bench_program: String,

    /// Benchmark argument of the built-in plan (repeatable)
    #[arg(long = "bench-arg", default_value = "bench", allow_hyphen_values = true)]
    pub bench_args: Vec<String>,

    /// Directory the built-in plan enters before plotting
    #[arg(long, default_value = "src")]
    pub plot_dir: String,

    /// Interpreter that runs the plot script
    #[arg(long, default_value = "python3")]
    pub interpreter: String,

    /// Plot script of the built-in plan
    #[arg(long, default_value = "visualise.py")]
    pub plot_script: String,

    /// Starting working directory (overrides the sequence file)
    #[arg(long)]
    pub working_dir: Option<String>,

    /// Execute only these steps (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these steps (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Show the execution plan without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Execution ID for this run
    #[arg(long)]
    pub execution_id: Option<String>,

    /// Log system load around each step
    #[arg(long)]
    pub monitor: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl CliConfig {
    /// 內建計畫：跑基準測試、進入繪圖目錄、執行繪圖腳本
    pub fn builtin_steps(&self) -> Vec<Step> {
        vec![
            Step::command(
                "bench",
                CommandSpec::new(self.bench_program.clone()).with_args(self.bench_args.clone()),
            )
            .with_description("Run the benchmark suite"),
            Step::change_dir("enter-plot-dir", self.plot_dir.clone())
                .with_description("Enter the directory holding the plot script"),
            Step::command(
                "plot",
                CommandSpec::new(self.interpreter.clone()).with_args([self.plot_script.clone()]),
            )
            .with_description("Render benchmark plots"),
        ]
    }
}

impl PlanProvider for CliConfig {
    fn plan_name(&self) -> &str {
        "builtin"
    }

    fn working_directory(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    fn steps(&self) -> Result<Vec<Step>> {
        Ok(self.builtin_steps())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("--bench-program", &self.bench_program)?;
        validation::validate_path("--plot-dir", &self.plot_dir)?;
        validation::validate_non_empty_string("--interpreter", &self.interpreter)?;
        validation::validate_non_empty_string("--plot-script", &self.plot_script)?;
        if let Some(dir) = &self.working_dir {
            validation::validate_path("--working-dir", dir)?;
        }
        Ok(())
    }
}
