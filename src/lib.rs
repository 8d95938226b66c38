// src/lib.rs

pub mod cli;
pub mod collab;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod results;
pub mod style;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::collab::console::console_collaborators;
use crate::config::{default_config_path, load_and_validate, ProjectConfig, ProjectDescriptor};
use crate::exec::{BackgroundExecutor, ExecutionBackend, LocalBackend};
use crate::fs::RealFileSystem;
use crate::pipeline::compile::compile_command;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::style::{StyleChecker, StylePlan};

/// Exit code used when the run was cancelled with Ctrl-C.
pub const EXIT_CANCELLED: i32 = 130;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - the execution backend and console collaborators
/// - the compile/test pipeline or the style checker
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let root = args.project.clone();
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(&root));
    let cfg = load_and_validate(&config_path)?;
    let project = cfg.descriptor(&root);
    info!(
        project = %project.name,
        kind = %project.kind,
        config = %config_path.display(),
        "loaded project configuration"
    );

    let executor = BackgroundExecutor::new();
    let (collab, submitter) = console_collaborators(args.json, cfg.submit.as_ref(), &executor);
    let backend: Arc<dyn ExecutionBackend> = Arc::new(
        LocalBackend::new(cfg.tools.clone(), cfg.style.locale.clone())
            .with_output(Arc::clone(&collab.output)),
    );

    match args.command {
        Command::DryRun => {
            print_dry_run(&cfg, &project);
            Ok(0)
        }
        Command::Style => {
            let checker = StyleChecker::new(
                project,
                cfg.style.clone(),
                backend,
                Arc::new(RealFileSystem),
                collab,
            );
            // Failures have already been reported through the collaborators.
            match checker.run(&executor).await {
                Ok(result) if result.passed() => Ok(0),
                _ => Ok(1),
            }
        }
        Command::Test => {
            let handle = Pipeline::new(project, cfg.pipeline_settings(), backend, collab)
                .spawn(executor.clone());
            let report = handle.join_or_cancel_on(ctrl_c()).await?;
            debug!(states = ?report.states, "pipeline states");

            if let Some(submitter) = submitter {
                submitter.finish().await;
            }

            Ok(match report.outcome {
                PipelineOutcome::Cancelled => EXIT_CANCELLED,
                outcome if outcome.is_success() => 0,
                _ => 1,
            })
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be listened for.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Print the resolved project and the command each stage would run.
fn print_dry_run(cfg: &ProjectConfig, project: &ProjectDescriptor) {
    println!("exerun dry-run");
    println!("  project.name = {}", project.name);
    println!("  project.kind = {}", project.kind);
    println!("  project.root = {}", project.root.display());
    if let Some(limit) = project.memory_limit {
        println!("  project.memory_limit = {limit} MB");
    }
    println!("  project.test_execution = {:?}", cfg.test_execution);
    println!("  project.valgrind = {:?}", cfg.valgrind);
    println!();

    let fs = RealFileSystem;
    match compile_command(project, &cfg.tools, &fs) {
        Ok(cmd) => println!("compile: {cmd}"),
        Err(err) => println!("compile: error: {err}"),
    }

    // The pipeline is only used to build the test stage; it is never run.
    let backend: Arc<dyn ExecutionBackend> =
        Arc::new(LocalBackend::new(cfg.tools.clone(), cfg.style.locale.clone()));
    let executor = BackgroundExecutor::new();
    let (collab, _) = console_collaborators(false, None, &executor);
    let pipeline = Pipeline::new(project.clone(), cfg.pipeline_settings(), backend, collab);
    match pipeline.test_stage().planned_command() {
        Ok(Some(cmd)) => println!("test: {cmd}"),
        Ok(None) => println!(
            "test: {} run-tests --exercise-path {} --output-path <results-file>",
            cfg.tools.langs.as_deref().unwrap_or("<langs>"),
            project.root.display()
        ),
        Err(err) => println!("test: error: {err}"),
    }

    let style_source = match &cfg.tools.langs {
        Some(langs) => format!("{langs} checkstyle (legacy checker as fallback)"),
        None => match StylePlan::resolve(None, project.kind) {
            StylePlan::FallbackLegacy(_) => "legacy checker".to_string(),
            _ => "none".to_string(),
        },
    };
    println!("style: {style_source}");

    match &cfg.submit {
        Some(submit) => println!(
            "submit: {}{}",
            submit.cmd.join(" "),
            if submit.auto { " (automatic)" } else { "" }
        ),
        None => println!("submit: not configured"),
    }

    debug!("dry-run complete (no execution)");
}
