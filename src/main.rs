use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use soapui_runner::provider::{ProjectSource, SoapUiProvider, DEFAULT_SOURCE, METHOD_NAME};
use soapui_runner::report::{self, console::ConsoleSink};
use soapui_runner::{CancellationFlag, ProjectRunner, RunContext, RunnerConfig};

#[derive(Parser)]
#[command(name = "soapui-runner")]
#[command(version)]
#[command(about = "Run SoapUI-style integration test projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a project file, or every *.xml project under a directory
    Run {
        /// Path to project file or directory
        #[arg(default_value = DEFAULT_SOURCE)]
        path: PathBuf,

        /// Report one check per step instead of one per test case
        #[arg(long, default_value = "false")]
        detailed: bool,

        /// Variable for placeholder substitution (KEY=VALUE). Can be repeated.
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Group label to nest suite groups under
        #[arg(long)]
        group: Option<String>,

        /// Write JSON and JUnit reports
        #[arg(long, default_value = "false")]
        report: bool,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },

    /// List the methods this runner exposes to a scripting host
    Methods,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            detailed,
            vars,
            group,
            report,
            output,
        } => {
            let mut config = RunnerConfig::from_env();
            if detailed {
                config.detailed = true;
            }

            let cancellation = CancellationFlag::new();
            let handler_flag = cancellation.clone();
            ctrlc::set_handler(move || {
                println!("\n{} Cancelling after the current step...", "⏹".yellow());
                handler_flag.cancel();
            })?;

            let mut context = RunContext::new(cancellation);
            context.set_group(group);
            for var in &vars {
                let (key, value) = var
                    .split_once('=')
                    .with_context(|| format!("Invalid --var '{}', expected KEY=VALUE", var))?;
                context.set_var(key.trim(), value);
            }

            let files = collect_projects(&path)?;
            if files.is_empty() {
                println!("{} No project files found.", "ℹ".blue());
                return Ok(());
            }

            println!("{} Running projects from: {}", "▶".green().bold(), path.display());
            let mode = if config.detailed { "detailed" } else { "summary" };
            println!("  Mode: {}", mode.cyan());
            if report {
                println!("  Reports: {}", output.display().to_string().cyan());
            }

            let provider = SoapUiProvider::new(ProjectRunner::standard(config));
            let operation = provider
                .resolve(METHOD_NAME)
                .context("run operation is not registered")?;

            let mut sink = ConsoleSink::new();
            for file in &files {
                if context.is_cancelled() {
                    break;
                }
                println!("\n  {} Project file: {}", "→".blue(), file.display());

                let result = operation
                    .run(
                        vec![ProjectSource::Path(file.clone())],
                        &mut context,
                        &mut sink,
                    )
                    .await
                    .with_context(|| format!("Failed to run {}", file.display()))?;

                sink.print_summary(&result);

                if report {
                    let dir = report_dir(&output, file, files.len());
                    report::write_reports(&result, &dir)?;
                    println!("  {} Reports saved to: {}", "📄".blue(), dir.display());
                }
            }

            if sink.has_failures() {
                std::process::exit(1);
            }
        }

        Commands::Methods => {
            let provider = SoapUiProvider::new(ProjectRunner::standard(RunnerConfig::default()));
            for method in provider.available_methods() {
                println!("{} - {}", method.name.bold(), method.description);
                for param in &method.parameters {
                    println!(
                        "    {} ({}): {}",
                        param.name.cyan(),
                        param.types,
                        param.description
                    );
                }
            }
        }
    }

    Ok(())
}

/// A single file, or every `*.xml` under a directory in path order
fn collect_projects(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "xml"))
        .collect();
    files.sort();
    Ok(files)
}

fn report_dir(output: &Path, file: &Path, file_count: usize) -> PathBuf {
    if file_count <= 1 {
        return output.to_path_buf();
    }
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string());
    output.join(stem)
}
