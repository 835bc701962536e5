use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medreport_lib::config::{self, AnalyzerConfig};
use medreport_lib::pipeline::processor::ReportAnalyzer;
use medreport_lib::server::{self, AppState};

/// Summarize a medical report PDF and flag out-of-range lab values
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (JSON). Defaults to ~/.medreport/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ollama base URL
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    /// Summarization model (default: best installed)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Directory with lab_ranges.json and condition_medicines.json
    #[arg(long, global = true)]
    reference_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the patient name and age found in a report
    Details {
        pdf: PathBuf,
    },
    /// Analyze a report and write the findings PDF
    Analyze {
        pdf: PathBuf,

        /// Directory the report is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Print the analysis as JSON instead of the report path
        #[arg(long, conflicts_with = "text")]
        json: bool,

        /// Print the report sections as plain text instead of the report path
        #[arg(long)]
        text: bool,
    },
    /// Serve the upload page over HTTP
    Serve {
        /// Listen address, e.g. 127.0.0.1:8501
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        config::verbose_log_filter()
    } else {
        config::default_log_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let config = load_config(&cli)?;

    match cli.command {
        Command::Details { pdf } => {
            let analyzer = ReportAnalyzer::from_config(&config)?;
            let bytes = read_pdf(&pdf)?;
            let details = analyzer.read_details(&bytes)?;
            println!("{}", details.patient);
        }
        Command::Analyze {
            pdf,
            out_dir,
            json,
            text,
        } => {
            let analyzer = ReportAnalyzer::from_config(&config)?;
            let bytes = read_pdf(&pdf)?;
            let analysis = analyzer
                .analyze(&bytes)
                .with_context(|| format!("Failed to analyze {}", pdf.display()))?;
            let path = analyzer.write(&analysis, &out_dir)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else if text {
                println!("{}", analysis.layout().to_text());
            } else {
                println!("{}", path.display());
            }
        }
        Command::Serve { bind } => {
            let addr = match bind {
                Some(bind) => bind
                    .parse::<std::net::SocketAddr>()
                    .with_context(|| format!("Invalid bind address '{bind}'"))?,
                None => config.socket_addr()?,
            };
            // Held here so the blocking HTTP client is dropped outside the runtime.
            let analyzer = Arc::new(ReportAnalyzer::from_config(&config)?);
            let state = AppState::new(analyzer.clone(), config.max_upload_bytes);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(server::serve(state, addr))?;
        }
    }

    Ok(())
}

/// Config file values with command-line overrides applied.
fn load_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut config = match cli.config.clone().or_else(config::default_config_path) {
        Some(path) => AnalyzerConfig::load(&path)?,
        None => AnalyzerConfig::default(),
    };

    if let Some(url) = &cli.ollama_url {
        config.ollama_url = url.clone();
    }
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(dir) = &cli.reference_dir {
        config.reference_dir = Some(dir.clone());
    }
    Ok(config)
}

fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))
}
