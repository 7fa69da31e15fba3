//! Command-line front end for the tender result cache.
//!
//! Stores the latest analysis result, shows it, and downloads the generated
//! spreadsheet from the analysis backend.

use std::{
    fs,
    io::{
        self,
        Read,
    },
    path::{
        Path,
        PathBuf,
    },
};

use anyhow::{
    anyhow,
    Context,
    Result,
};
use clap::{
    Parser,
    Subcommand,
};
use tender_results::{
    core::UploadResponse,
    exporter_for,
    open_store,
    AnalysisResult,
    AppConfig,
    TenderError,
};

#[derive(Parser)]
#[command(name = "tender-results")]
#[command(version, about = "Tender analysis result cache and spreadsheet export", long_about = None)]
struct Cli {
    /// Directory holding the stored result (defaults to the per-user data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored analysis result
    Show {
        /// Print the stored text as-is, even if it is not valid JSON
        #[arg(long)]
        raw: bool,
    },

    /// Store an analysis result read from a JSON file ('-' for stdin)
    Write { input: PathBuf },

    /// Merge an upload response ({"files": [...]}) and store the merged result
    Ingest { input: PathBuf },

    /// Download the spreadsheet for the stored result
    Export {
        /// Backend base URL (overrides TENDER_API_BASE and config.json)
        #[arg(long)]
        api_base: Option<String>,

        /// Directory to save the spreadsheet into
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,

        /// Give up waiting for the backend after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Remove the stored result
    Clear,

    /// Show or update the saved configuration
    Config {
        #[arg(long)]
        api_base: Option<String>,

        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }

    match cli.command {
        Commands::Show { raw } => {
            let store = open_store(&config)?;
            if raw {
                match store.read_raw() {
                    Some(text) => println!("{}", text),
                    None => println!("No tender result stored."),
                }
                return Ok(());
            }
            match store.read() {
                Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                None => println!("No tender result stored."),
            }
        }
        Commands::Write { input } => {
            let result: AnalysisResult = serde_json::from_str(&read_input(&input)?)
                .context("Input is not valid JSON")?;
            open_store(&config)?.write(&result)?;
            println!("Stored tender result.");
        }
        Commands::Ingest { input } => {
            let response: UploadResponse = serde_json::from_str(&read_input(&input)?)
                .context("Input is not an upload response")?;
            let merged = response.merged()?;
            open_store(&config)?.write(&merged)?;
            println!("Stored merged result of {} file(s).", response.files.len());
        }
        Commands::Export { api_base, out_dir, timeout_secs } => {
            if let Some(api_base) = api_base {
                config.api_base = api_base;
            }
            if let Some(out_dir) = out_dir {
                config.download_dir = Some(out_dir);
            }
            if let Some(secs) = timeout_secs {
                config.export_timeout_secs = secs;
            }

            let exporter = exporter_for(&config, open_store(&config)?)?;
            match exporter.export_current_result().await {
                Ok(Some(artifact)) => println!("{}", artifact.path.display()),
                Ok(None) => return Err(anyhow!("No tender result stored; nothing to export")),
                Err(failure) => return Err(TenderError::from(failure).into()),
            }
        }
        Commands::Clear => {
            open_store(&config)?.clear()?;
            println!("Cleared stored tender result.");
        }
        Commands::Config { api_base, timeout_secs } => {
            if api_base.is_none() && timeout_secs.is_none() {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }

            // Persist only what was asked for, not the environment overrides.
            let mut saved = AppConfig::load_saved();
            if let Some(api_base) = api_base {
                saved.api_base = api_base;
            }
            if let Some(secs) = timeout_secs {
                saved.export_timeout_secs = secs;
            }
            saved.save()?;
        }
    }

    Ok(())
}
