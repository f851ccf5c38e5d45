//! Dotsmith CLI - Graphviz DOT builder and export runner

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;

use dotsmith::contracts::{validate_payload, INPUT_SCHEMA};
use dotsmith::error::{DotsmithError, FixSuggestion};
use dotsmith::export::OutputFormat;
use dotsmith::request::{run_request, RenderRequest, RunOptions};

#[derive(Parser)]
#[command(name = "dotsmith")]
#[command(about = "Dotsmith - Graphviz DOT graph builder and export runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a render request: build DOT, export the artifact, emit result JSON
    Render {
        /// Path to a request .json file
        file: String,

        /// Explicit path to the renderer binary (overrides lookup)
        #[arg(long)]
        dot_binary: Option<PathBuf>,

        /// Vendored Graphviz bundle searched before PATH
        #[arg(long)]
        vendor_root: Option<PathBuf>,

        /// Directory for rendered artifacts (overrides the request)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Output format (overrides the request)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Directory for run reports
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,

        /// Skip writing the run report
        #[arg(long)]
        no_report: bool,
    },

    /// Validate a request file against the input contract
    Validate {
        /// Path to a request .json file
        file: String,
    },

    /// Print the DOT source a request file would produce
    Dot {
        /// Path to a request .json file
        file: String,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout is reserved for result payloads
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Render {
            file,
            dot_binary,
            vendor_root,
            output_dir,
            format,
            reports_dir,
            no_report,
        } => {
            let options = RunOptions {
                dot_binary,
                vendor_root,
                output_dir,
                format,
                reports_dir: Some(reports_dir),
                write_report: !no_report,
            };
            render(&file, &options)
        }
        Commands::Validate { file } => validate(&file),
        Commands::Dot { file } => print_dot(&file),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.fix_suggestion() {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

fn render(file: &str, options: &RunOptions) -> Result<ExitCode, DotsmithError> {
    let payload = load_payload(file)?;
    let output = run_request(&payload, options);
    println!("{}", serde_json::to_string_pretty(&output)?);
    let failed = output.get("status").and_then(Value::as_str) == Some("failure");
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn validate(file: &str) -> Result<ExitCode, DotsmithError> {
    let payload = load_payload(file)?;
    validate_payload(&payload, &INPUT_SCHEMA)?;
    let request: RenderRequest = serde_json::from_value(payload)?;
    println!(
        "{} request is valid: {} nodes, {} edges",
        "✓".green(),
        request.parameters.nodes.len(),
        request.parameters.edges.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn print_dot(file: &str) -> Result<ExitCode, DotsmithError> {
    let payload = load_payload(file)?;
    validate_payload(&payload, &INPUT_SCHEMA)?;
    let request: RenderRequest = serde_json::from_value(payload)?;
    print!("{}", request.parameters.to_builder().dot_source());
    Ok(ExitCode::SUCCESS)
}

fn load_payload(file: &str) -> Result<Value, DotsmithError> {
    let text = std::fs::read_to_string(file)?;
    Ok(serde_json::from_str(&text)?)
}
