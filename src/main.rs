use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ocr_md::config::{ENV_API_BASE, ENV_MODEL, ENV_TIMEOUT, OcrConfig};
use ocr_md::ocr::{OcrClient, Protocol};
use ocr_md::output::{OutputLayout, write_results};
use ocr_md::runner::run_batch;
use ocr_md::scan::expand_paths;

/// OCR to Markdown - convert images through a local OCR model
#[derive(Parser, Debug)]
#[command(
    name = "ocr-md",
    about = "Convert images to Markdown via a locally hosted OCR model",
    after_help = "ENVIRONMENT VARIABLES:\n\
        OCR_MD_API       OCR server base URL\n\
        OCR_MD_MODEL     Model name\n\
        OCR_MD_TIMEOUT   Per-request timeout (seconds)\n\
        RUST_LOG         Log filter (default: ocr_md=info)"
)]
struct Args {
    /// Image files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// OCR server base URL [default: http://127.0.0.1:11434]
    #[arg(long, env = ENV_API_BASE)]
    api: Option<String>,

    /// Model name [default: deepseek-ocr]
    #[arg(long, env = ENV_MODEL)]
    model: Option<String>,

    /// Override the default prompt
    #[arg(long)]
    prompt: Option<String>,

    /// Disable the <|grounding|> prompt prefix
    #[arg(long)]
    no_grounding: bool,

    /// Disable cleanup of grounding tags in output
    #[arg(long)]
    no_clean: bool,

    /// Use /v1/chat/completions (OpenAI-compatible) instead of /api/generate
    #[arg(long)]
    openai: bool,

    /// Stream the reply from /api/generate
    #[arg(long)]
    stream: bool,

    /// Per-request timeout in seconds [default: 300]
    #[arg(long, env = ENV_TIMEOUT)]
    timeout: Option<u64>,

    /// Output markdown file (combine all inputs)
    #[arg(long)]
    out: Option<PathBuf>,
}

impl Args {
    fn to_config(&self) -> OcrConfig {
        let protocol = if self.openai { Protocol::Chat } else { Protocol::Native };
        if self.stream && self.openai {
            tracing::warn!("--stream is only supported by /api/generate, ignoring it");
        }

        let mut config = OcrConfig::from_env();
        if let Some(api) = &self.api {
            config.api_base = api.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }

        config
            .prompt(self.prompt.clone())
            .grounding(!self.no_grounding)
            .clean(!self.no_clean)
            .protocol(protocol)
            .stream(self.stream && !self.openai)
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ocr_md=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    let images = match expand_paths(&args.paths) {
        Ok(images) => images,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let config = args.to_config();
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return ExitCode::from(2);
    }

    let client = match OcrClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create OCR client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        endpoint = client.endpoint(),
        model = %config.model,
        images = images.len(),
        "Starting conversion"
    );

    let pages = run_batch(&client, &config, &images).await;
    let failed = pages.iter().filter(|p| p.failed).count();
    if failed > 0 {
        tracing::warn!(failed, total = pages.len(), "Some images could not be converted");
    }

    let layout = OutputLayout::resolve(args.out.as_deref(), &args.paths);
    if let Err(e) = write_results(&layout, &pages, |path| println!("Wrote {}", path.display())) {
        eprintln!("Failed to write output: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
