//! yacls CLI
//!
//! Entry point for the `yacls` command-line tool.

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, FromArgMatches, Parser};
use tracing_subscriber::EnvFilter;
use yacls::config::{split_projects, RunConfig};
use yacls::platform::{self, source, Config};
use yacls::run::{RunOptions, Runner};
use yacls::Error;

#[derive(Parser, Debug)]
#[command(name = "yacls")]
#[command(about = "Declarative access-control snapshots of SaaS and cloud platforms", version)]
struct Cli {
    /// Export file to process
    #[arg(long)]
    input: Option<PathBuf>,

    /// Process every file directly inside this directory
    #[arg(long)]
    in_dir: Option<PathBuf>,

    /// Ingester kind (guessed from the file name when omitted)
    #[arg(long)]
    kind: Option<String>,

    /// GCP project(s), comma-separated
    #[arg(long)]
    project: Option<String>,

    /// Project used for Cloud Identity group lookups (default: --project)
    #[arg(long)]
    gcp_identity_project: Option<String>,

    /// Write snapshots here instead of standard output
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Snapshot file or directory to compare the input against; emits CSV
    #[arg(long)]
    compare: Option<PathBuf>,

    /// Run configuration file (default: ./yacls.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Log progress to standard error
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Every registered kind with its operator instructions
fn kinds_help() -> String {
    let mut help = String::from("Kinds:\n");
    for d in platform::descriptions() {
        help.push_str(&format!("  {:<24} {}\n", d.kind, d.name));
        for step in source::render_steps(&d.steps, &Config::default(), d.kind) {
            help.push_str(&format!("      - {step}\n"));
        }
    }
    help
}

fn parse_cli() -> Cli {
    let matches = Cli::command().after_help(kinds_help()).get_matches();
    match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Error> {
    let cwd = std::env::current_dir().map_err(|e| Error::Io {
        context: "current dir".to_string(),
        source: e,
    })?;
    let file = RunConfig::discover(cli.config.as_deref(), &cwd)?.unwrap_or_default();
    let flags = RunConfig {
        kind: cli.kind,
        projects: cli.project.as_deref().map(split_projects).unwrap_or_default(),
        gcp_identity_project: cli.gcp_identity_project,
        out_dir: cli.out_dir,
    };
    let settings = RunConfig::layered([file, flags])?;

    let opts = RunOptions {
        input: cli.input,
        in_dir: cli.in_dir,
        kind: settings.kind,
        projects: settings.projects,
        gcp_identity_project: settings.gcp_identity_project,
        out_dir: settings.out_dir,
        compare: cli.compare,
        ..Default::default()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    Runner::default().run(&opts, &mut out)
}

fn main() {
    let cli = parse_cli();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error[{}]: {e}", e.kind());
        process::exit(1);
    }
}
