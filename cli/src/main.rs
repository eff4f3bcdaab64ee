//! `aer` - generate, package and independently verify Adherence Evidence
//! Reports.
//!
//! Exit status: 0 on PASS, 1 on FAIL, 2 on usage or I/O errors.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

/// Adherence Evidence Report tool.
#[derive(Parser)]
#[command(name = "aer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log pipeline steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (JSON)
    #[arg(short, long, global = true, env = "AER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report from an evidence snapshot and package it
    Generate {
        /// Evidence snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Output bundle path
        #[arg(short, long)]
        out: PathBuf,

        /// Also write the three artifacts into this directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Verify a bundle, or three discrete files, offline
    Verify(VerifyArgs),

    /// Fetch a live report twice per format and check idempotency
    FetchVerify(FetchVerifyArgs),

    /// List the entries of a bundle
    Inspect {
        /// Bundle path
        #[arg(short, long)]
        bundle: PathBuf,
    },
}

#[derive(Args)]
struct VerifyArgs {
    /// Bundle archive
    #[arg(short, long, conflicts_with_all = ["json", "pdf", "manifest", "dir"])]
    bundle: Option<PathBuf>,

    /// Directory holding AER.json, AER.pdf and verification.txt
    #[arg(long, conflicts_with_all = ["json", "pdf", "manifest"])]
    dir: Option<PathBuf>,

    /// Report JSON file
    #[arg(long, requires_all = ["pdf", "manifest"])]
    json: Option<PathBuf>,

    /// Rendered document file
    #[arg(long, requires_all = ["json", "manifest"])]
    pdf: Option<PathBuf>,

    /// Manifest file
    #[arg(long, requires_all = ["json", "pdf"])]
    manifest: Option<PathBuf>,
}

#[derive(Args)]
struct FetchVerifyArgs {
    /// API base URL
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:4000/api/v1")]
    base_url: String,

    /// Explicit JSON document URL (used with --pdf-url instead of a base URL)
    #[arg(long, requires = "pdf_url", conflicts_with_all = ["token", "token_json", "clinic_id"])]
    json_url: Option<String>,

    /// Explicit rendered document URL
    #[arg(long, requires = "json_url")]
    pdf_url: Option<String>,

    /// External token for both formats
    #[arg(long, env = "AER_TOKEN", conflicts_with_all = ["token_json", "token_pdf"])]
    token: Option<String>,

    /// External token for the JSON document
    #[arg(long, env = "AER_TOKEN_JSON", requires = "token_pdf")]
    token_json: Option<String>,

    /// External token for the rendered document
    #[arg(long, env = "AER_TOKEN_PDF", requires = "token_json")]
    token_pdf: Option<String>,

    /// Clinic id (internal mode)
    #[arg(long)]
    clinic_id: Option<String>,

    /// Client id (internal mode)
    #[arg(long)]
    client_id: Option<String>,

    /// Period start, YYYY-MM-DD (internal mode)
    #[arg(long)]
    start: Option<String>,

    /// Period end, YYYY-MM-DD (internal mode)
    #[arg(long)]
    end: Option<String>,

    /// Program filter (internal mode)
    #[arg(long)]
    program: Option<String>,

    /// Bearer credential (internal mode)
    #[arg(long, env = "AUTH_BEARER")]
    bearer: Option<String>,

    /// Cookie header value (internal mode)
    #[arg(long, env = "AUTH_COOKIE")]
    cookie: Option<String>,

    /// Manifest to compare the fetched digests against
    #[arg(long)]
    manifest: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = config::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Generate { snapshot, out, dir } => {
            commands::generate::run(&snapshot, &out, dir.as_deref(), &config)
        }
        Commands::Verify(args) => commands::verify::run(&args),
        Commands::FetchVerify(args) => commands::fetch_verify::run(&args, &config),
        Commands::Inspect { bundle } => commands::inspect::run(&bundle),
    });

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
