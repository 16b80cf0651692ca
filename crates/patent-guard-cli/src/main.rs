use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use patent_guard_core::{
    build_client, render_report, AnalysisConfig, CompletionClient, CompletionRequest, JsonFileStore,
    LlmOverrides, LlmSettings, OutputFormat, PatentStore, ReportArchive, ReportBuilder,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_PATENTS: &str = "./data/patents.json";
const DEFAULT_COMPANIES: &str = "./data/company_products.json";

#[derive(Parser, Debug)]
#[command(
    name = "patent-guard",
    author,
    version,
    about = "Patent infringement screening CLI"
)]
struct Cli {
    /// Optional configuration file (TOML, JSON or YAML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Patent import file (array of patent records)
    #[arg(long, value_name = "FILE", global = true)]
    patents: Option<PathBuf>,

    /// Company import file (`{ "companies": [...] }`)
    #[arg(long, value_name = "FILE", global = true)]
    companies: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse a company's products against a patent
    Analyze {
        /// Patent publication number, e.g. US-11986159-B2
        #[arg(long)]
        patent: String,
        /// Company name as stored in the import file
        #[arg(long)]
        company: String,
        /// Emit the report as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
        /// Save the report under this directory
        #[arg(long, value_name = "DIR")]
        archive: Option<PathBuf>,
    },
    /// Print a previously archived report
    ShowReport {
        #[arg(long)]
        patent: String,
        #[arg(long)]
        company: String,
        #[arg(long, value_name = "DIR")]
        archive: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List stored company names
    ListCompanies {
        #[arg(long)]
        json: bool,
    },
    /// List stored patent publication numbers
    ListPatents {
        #[arg(long)]
        json: bool,
    },
    /// Send a probe prompt through the configured provider
    Health,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    llm: LlmOverrides,
    analysis: AnalysisConfig,
    data: DataPaths,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataPaths {
    patents: Option<PathBuf>,
    companies: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let file_config = load_config(cli.config.as_deref())?;

    let patents = cli
        .patents
        .clone()
        .or_else(|| file_config.data.patents.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PATENTS));
    let companies = cli
        .companies
        .clone()
        .or_else(|| file_config.data.companies.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPANIES));
    let store = JsonFileStore::new(patents, companies);

    match cli.command {
        Commands::Analyze {
            patent,
            company,
            json,
            archive,
        } => analyze(store, file_config, &patent, &company, json, archive.as_deref()).await,
        Commands::ShowReport {
            patent,
            company,
            archive,
            json,
        } => show_report(&archive, &patent, &company, json),
        Commands::ListCompanies { json } => {
            let names = store.list_companies().await?;
            print_names(&names, json, "company")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::ListPatents { json } => {
            let numbers = store.list_patents().await?;
            print_names(&numbers, json, "patent")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Health => health(file_config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("PATENT_GUARD")
            .prefix_separator("__")
            .separator("__"),
    );
    let config = builder
        .build()
        .context("failed to load configuration")?
        .try_deserialize::<FileConfig>()
        .context("invalid configuration")?;
    Ok(config)
}

async fn analyze(
    store: JsonFileStore,
    file_config: FileConfig,
    patent: &str,
    company: &str,
    json: bool,
    archive: Option<&Path>,
) -> Result<ExitCode> {
    let settings = LlmSettings::from_env_with(file_config.llm)?
        .fit_to_call_budget(file_config.analysis.call_timeout);
    let client = build_client(&settings)?;
    let builder = ReportBuilder::new(Arc::new(store), client, file_config.analysis)?;

    let report = match builder.build(patent, company).await {
        Ok(report) => report,
        Err(err) => {
            tracing::debug!(error = %err, "analysis failed");
            eprintln!("{} {}", "error:".red().bold(), err.user_message());
            let code = if err.is_not_found() { 2 } else { 1 };
            return Ok(ExitCode::from(code));
        }
    };

    if let Some(dir) = archive {
        let path = ReportArchive::new(dir).save(&report)?;
        tracing::info!(path = %path.display(), "report saved");
    }

    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    println!("{}", render_report(&report, format)?);
    Ok(ExitCode::SUCCESS)
}

fn show_report(archive: &Path, patent: &str, company: &str, json: bool) -> Result<ExitCode> {
    let Some(report) = ReportArchive::new(archive).load(patent, company)? else {
        eprintln!(
            "{} no archived report for patent `{}` and company `{}`",
            "error:".red().bold(),
            patent,
            company
        );
        return Ok(ExitCode::from(2));
    };
    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    println!("{}", render_report(&report, format)?);
    Ok(ExitCode::SUCCESS)
}

fn print_names(names: &[String], json: bool, noun: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(names)?);
        return Ok(());
    }
    println!("{} {}(s) loaded", names.len(), noun);
    for name in names {
        println!("- {name}");
    }
    Ok(())
}

async fn health(file_config: FileConfig) -> Result<ExitCode> {
    let settings = LlmSettings::from_env_with(file_config.llm)?
        .fit_to_call_budget(file_config.analysis.call_timeout);
    let client = build_client(&settings)?;
    print!("Checking provider {} ... ", client.provider());

    let probe = CompletionRequest::new("Reply with the single word OK.", 5, 0.0);
    let timeout = file_config.analysis.call_timeout;
    match tokio::time::timeout(timeout, client.complete(&probe)).await {
        Ok(Ok(_)) => {
            println!("{}", "ok".green());
            Ok(ExitCode::SUCCESS)
        }
        Ok(Err(err)) => {
            println!("{}", "failed".red());
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
        Err(_) => {
            println!("{}", "timed out".red());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
