use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use redmine_datasets::app::{App, ProgressSink, RetrieveOptions};
use redmine_datasets::config::Settings;
use redmine_datasets::domain::DatasetKind;
use redmine_datasets::error::RedmineError;
use redmine_datasets::output::{ConsoleOutput, JsonOutput, OutputMode};
use redmine_datasets::redmine::RedmineHttpClient;
use redmine_datasets::store::OutputStore;

#[derive(Parser)]
#[command(name = "redmine-datasets")]
#[command(about = "Retrieve dataset metadata from Redmine")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Redmine authentification key")]
    key: String,

    #[arg(long = "output_dir", help = "Output directory")]
    output_dir: Utf8PathBuf,

    #[arg(long = "get", value_enum, help = "Get rnaseq, or dnaseq issues")]
    kind: DatasetKind,

    #[arg(long, help = "Restrict to a given build")]
    build: Option<u32>,

    #[arg(long, help = "Redmine base url (default: https://redmine.apidb.org)")]
    url: Option<String>,

    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report:?}");
            let code = report
                .downcast_ref::<RedmineError>()
                .map(map_exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

/// `RUST_LOG` overrides the default `warn` level; logs go to stderr.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn map_exit_code(error: &RedmineError) -> u8 {
    match error {
        RedmineError::UnknownBuild(_) => 2,
        RedmineError::Http(_) | RedmineError::Status { .. } | RedmineError::InvalidResponse(_) => 3,
        _ => 1,
    }
}

fn run(cli: Cli) -> miette::Result<()> {
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let settings = Settings::new(cli.url.as_deref(), &cli.key)?;
    let client = RedmineHttpClient::new(&settings)?;
    let app = App::new(client, OutputStore::new(cli.output_dir));
    let options = RetrieveOptions {
        kind: cli.kind,
        build: cli.build,
        project_id: settings.project_id,
    };

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Text => &ConsoleOutput,
        OutputMode::Json => &JsonOutput,
    };
    let report = app.retrieve(&options, sink)?;

    match output_mode {
        OutputMode::Text => ConsoleOutput::print_summary(&report).into_diagnostic(),
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic(),
    }
}
