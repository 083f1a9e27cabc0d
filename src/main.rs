use anyhow::Context;
use benchplot::config::cli::DEFAULT_CONFIG_FILE;
use benchplot::core::sequence::{execution_summary, select_steps, StepSequence};
use benchplot::core::{PlanProvider, Step, StepResult, StepStatus};
use benchplot::utils::{logger, validation::Validate};
use benchplot::{CliConfig, RunContext, RunError, RunReport, SequenceConfig, TokioProcessRunner};
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting benchplot");
    if args.verbose {
        tracing::debug!("CLI config: {:?}", args);
    }

    if let Err(e) = args.validate() {
        fail_before_run(&e);
    }

    // 載入序列配置（若有）
    let sequence_config = match load_sequence_config(&args) {
        Ok(config) => config,
        Err(e) => fail_before_run(&e),
    };

    if let Some(config) = &sequence_config {
        if let Err(e) = config.validate() {
            fail_before_run(&e);
        }
        tracing::info!("✅ Sequence configuration loaded and validated successfully");
    }

    let provider: &dyn PlanProvider = match &sequence_config {
        Some(config) => config,
        None => &args,
    };

    let steps = match provider.steps() {
        Ok(steps) => select_steps(steps, &args.only, &args.skip),
        Err(e) => fail_before_run(&e),
    };

    let working_dir = resolve_working_dir(args.working_dir.as_deref().or(provider.working_directory()))?;

    // 生成執行 ID
    let execution_id = args
        .execution_id
        .clone()
        .unwrap_or_else(|| format!("run_{}", Utc::now().format("%Y%m%d_%H%M%S")));

    display_plan_summary(provider.plan_name(), &steps, &working_dir, &execution_id, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No steps will be executed");
        perform_dry_run(&steps);
        return Ok(());
    }

    let monitor_enabled = args.monitor
        || sequence_config
            .as_ref()
            .map(|c| c.monitoring_enabled())
            .unwrap_or(false);
    if monitor_enabled {
        tracing::info!("🔍 System load monitoring enabled");
    }

    let sequence = StepSequence::new(execution_id.clone(), TokioProcessRunner::new())
        .with_monitoring(monitor_enabled)
        .with_steps(steps);

    let started_at = Utc::now();
    let mut context = RunContext::new(execution_id.clone(), working_dir);

    tracing::info!("🎬 Starting step sequence execution");
    let outcome = sequence.execute_in(&mut context).await;

    let report_path = args.report.clone().or_else(|| {
        sequence_config
            .as_ref()
            .and_then(|c| c.report_file())
            .map(str::to_string)
    });
    if let Some(path) = report_path {
        let summary = execution_summary(&context.results);
        let mut report = RunReport::new(
            &execution_id,
            provider.plan_name(),
            started_at,
            &context.results,
            summary,
        );
        if let Err(e) = &outcome {
            report = report.with_failure(e.exit_code(), e.to_string());
        }
        // 報告寫入失敗不影響退出碼
        if let Err(e) = report.write_to(&path).await {
            tracing::warn!("⚠️ Failed to export run report to {}: {}", path, e);
        }
    }

    display_execution_results(&context.results, &execution_id);

    match outcome {
        Ok(()) => {
            tracing::info!("🎉 Step sequence completed successfully!");
            println!("✅ All {} step(s) completed successfully", context.results.len());
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Step sequence failed: {} (Category: {:?}, exit code: {})",
                e,
                e.category(),
                e.exit_code()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}

fn fail_before_run(e: &RunError) -> ! {
    tracing::error!("❌ Configuration error: {}", e);
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(e.exit_code());
}

fn load_sequence_config(args: &CliConfig) -> benchplot::Result<Option<SequenceConfig>> {
    let path = match &args.config {
        Some(path) => PathBuf::from(path),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => PathBuf::from(DEFAULT_CONFIG_FILE),
        None => {
            tracing::info!("📋 No sequence file given, using the built-in bench-then-plot plan");
            return Ok(None);
        }
    };

    tracing::info!("📁 Loading sequence configuration from: {}", path.display());
    SequenceConfig::from_file(&path).map(Some)
}

fn resolve_working_dir(configured: Option<&str>) -> anyhow::Result<PathBuf> {
    let current = std::env::current_dir().context("Failed to read the current directory")?;
    let working_dir = match configured {
        Some(dir) => current.join(dir),
        None => current,
    };

    if !working_dir.is_dir() {
        fail_before_run(&RunError::InvalidConfigValueError {
            field: "working_directory".to_string(),
            value: working_dir.display().to_string(),
            reason: "Directory does not exist".to_string(),
        });
    }

    Ok(working_dir)
}

fn display_plan_summary(
    plan_name: &str,
    steps: &[Step],
    working_dir: &Path,
    execution_id: &str,
    args: &CliConfig,
) {
    println!("📋 Step Sequence Summary:");
    println!("  Plan: {}", plan_name);
    println!("  Execution ID: {}", execution_id);
    println!("  Working Directory: {}", working_dir.display());
    println!("  Total Steps: {}", steps.len());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    if !args.only.is_empty() {
        println!("  🎯 Only executing: {}", args.only.join(", "));
    }
    if !args.skip.is_empty() {
        println!("  ⏭️ Skipping: {}", args.skip.join(", "));
    }
    println!();
}

fn perform_dry_run(steps: &[Step]) {
    println!("🔍 Dry Run Plan:");
    for (index, step) in steps.iter().enumerate() {
        println!("  {}. [{}] {} - {}", index + 1, step.kind(), step.name, step.summary_line());
        if let Some(description) = &step.description {
            println!("     {}", description);
        }
    }
    println!();
    println!("✅ Dry run complete, nothing was executed.");
}

fn display_execution_results(results: &[StepResult], execution_id: &str) {
    println!();
    println!("📊 Execution Results Summary:");
    println!("  Execution ID: {}", execution_id);

    let total_duration: std::time::Duration = results.iter().map(|r| r.duration).sum();
    println!("  Total Execution Time: {:?}", total_duration);

    for (index, result) in results.iter().enumerate() {
        let status = match result.status {
            StepStatus::Succeeded => "✅",
            StepStatus::Failed => "❌",
        };
        println!(
            "  {}. {} {} (exit {}) in {:?}",
            index + 1,
            status,
            result.step_name,
            result.exit_code,
            result.duration
        );
    }
    println!();
}
