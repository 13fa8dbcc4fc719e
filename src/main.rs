// SPDX-License-Identifier: MIT

use clap::Parser;
use dotenv::dotenv;
use kgflow::{parse_inputs, Runtime, RuntimeOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Run a declarative knowledge-graph workflow
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workflow document to execute
    #[arg(short, long)]
    workflow: PathBuf,

    /// Workflow input expressed as key=value; repeatable
    #[arg(short, long = "arg")]
    args: Vec<String>,

    /// Directory containing workflow modules; repeatable
    #[arg(short, long = "lib-path", default_value = ".")]
    lib_path: Vec<PathBuf>,

    /// Write the result graph to a file; use 'stdout' to print
    #[arg(short, long)]
    out: Option<String>,

    /// Root directory for the persistent result cache
    #[arg(short, long)]
    cache_dir: Option<PathBuf>,
}

const EXIT_PLAN_ERROR: u8 = 1;
const EXIT_EXECUTION_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

async fn run(args: Args) -> Result<(), u8> {
    let inputs = parse_inputs(&args.args).map_err(|e| {
        eprintln!("error: {e}");
        EXIT_PLAN_ERROR
    })?;

    let runtime = Runtime::builder()
        .options(RuntimeOptions {
            library_path: args.lib_path,
            cache_dir: args.cache_dir,
            ..Default::default()
        })
        .build()
        .await
        .map_err(|e| {
            eprintln!("error: {e}");
            EXIT_PLAN_ERROR
        })?;

    let report = runtime
        .run_file(&args.workflow, inputs)
        .await
        .map_err(|e| {
            eprintln!("error: {e}");
            EXIT_PLAN_ERROR
        })?;

    let result = report.result.map_err(|e| {
        eprintln!("execution failed: {e}");
        for (job, error) in &report.failed {
            eprintln!("  {job}: {error}");
        }
        EXIT_EXECUTION_ERROR
    })?;

    match args.out.as_deref() {
        Some("stdout") => println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default()),
        Some(path) => {
            let text = serde_json::to_string_pretty(&result).unwrap_or_default();
            std::fs::write(path, text).map_err(|e| {
                eprintln!("error writing {path}: {e}");
                EXIT_EXECUTION_ERROR
            })?;
        }
        None => log::info!("workflow completed"),
    }
    Ok(())
}
