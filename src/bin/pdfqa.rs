//! CLI binary for pdf-qa.
//!
//! Two front-ends over the library: `pdfqa serve` runs the HTTP API and
//! `pdfqa chat <PDF>` runs the interactive question loop in the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_qa::{
    completion, server, session, BaiduOcr, OcrCredentials, OcrProgressCallback, PdfiumConverter, PipelineConfig,
    ProgressCallback, RasterCachePolicy,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for an OCR pass: one bar, one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("OCR");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl OcrProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page}"));
    }

    fn on_page_cached(&self, page: usize, total_pages: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            dim("↺"),
            page,
            total_pages,
            dim(&format!("{text_len:>5} chars")),
            dim("cached"),
        ));
        self.bar.inc(1);
    }

    fn on_page_recognized(&self, page: usize, total_pages: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page,
            total_pages,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_pages: usize, recognized: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages ready ({} recognised, {} from cache)",
            green("✔"),
            bold(&total_pages.to_string()),
            recognized,
            total_pages - recognized
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the HTTP API on port 5000
  pdfqa serve --port 5000

  # Ask questions about a local PDF in the terminal
  BAIDU_API_KEY=... BAIDU_SECRET_KEY=... DEEPSEEK_API_KEY=sk-... pdfqa chat pet-care.pdf

  # Re-rasterise when a different PDF is dropped into the same output directory
  pdfqa --raster-cache verify chat other.pdf

ENVIRONMENT VARIABLES:
  DEEPSEEK_API_KEY        Completion API key
  BAIDU_API_KEY           OCR API key (chat only; the HTTP API takes it per request)
  BAIDU_SECRET_KEY        OCR secret key (chat only)
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Log filter, e.g. pdf_qa=debug

A .env file in the working directory is loaded at startup.
"#;

/// Ask questions about a PDF using OCR and a chat model.
#[derive(Parser, Debug)]
#[command(
    name = "pdfqa",
    version,
    about = "Ask questions about a PDF using OCR and a chat model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory receiving uploaded PDFs.
    #[arg(long, global = true, env = "PDFQA_UPLOADS_DIR", default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Directory holding page images and their cached OCR text.
    #[arg(long, global = true, env = "PDFQA_OUTPUT_DIR", default_value = "output_images")]
    output_dir: PathBuf,

    /// How existing page images are treated: trust or verify.
    #[arg(long, global = true, env = "PDFQA_RASTER_CACHE", value_enum, default_value = "trust")]
    raster_cache: RasterCacheArg,

    /// Directory containing the pdfium shared library.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDFQA_PDF_PASSWORD")]
    pdf_password: Option<String>,

    /// Completion API key.
    #[arg(long, global = true, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat-completions endpoint URL.
    #[arg(long, global = true, env = "PDFQA_COMPLETION_URL")]
    completion_url: Option<String>,

    /// Completion model ID.
    #[arg(long, global = true, env = "PDFQA_MODEL")]
    model: Option<String>,

    /// Answer through an edgequake-llm provider (openai, anthropic, gemini, ollama, …).
    #[arg(long, global = true, env = "PDFQA_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, global = true, env = "PDFQA_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, env = "PDFQA_TEMPERATURE")]
    temperature: Option<f32>,

    /// Timeout for each provider call in seconds.
    #[arg(long, global = true, env = "PDFQA_TIMEOUT")]
    timeout: Option<u64>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFQA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFQA_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "PDFQA_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "PDFQA_PORT", default_value_t = 5000)]
        port: u16,
    },

    /// Rasterise and OCR a PDF, then answer questions typed on stdin.
    Chat {
        /// Local PDF file path.
        pdf: PathBuf,

        #[arg(long, env = "BAIDU_API_KEY", hide_env_values = true)]
        baidu_api_key: String,

        #[arg(long, env = "BAIDU_SECRET_KEY", hide_env_values = true)]
        baidu_secret_key: String,

        /// Disable the progress bar.
        #[arg(long, env = "PDFQA_NO_PROGRESS")]
        no_progress: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RasterCacheArg {
    Trust,
    Verify,
}

impl From<RasterCacheArg> for RasterCachePolicy {
    fn from(v: RasterCacheArg) -> Self {
        match v {
            RasterCacheArg::Trust => RasterCachePolicy::Trust,
            RasterCacheArg::Verify => RasterCachePolicy::Verify,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; the variables may come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, cli.quiet))),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    match cli.command {
        Command::Serve { ref host, port } => server::serve(config, host, port)
            .await
            .context("HTTP server failed"),
        Command::Chat {
            ref pdf,
            ref baidu_api_key,
            ref baidu_secret_key,
            no_progress,
        } => {
            let credentials = OcrCredentials::new(baidu_api_key.as_str(), baidu_secret_key.as_str());
            let progress: Option<ProgressCallback> = if no_progress || cli.quiet {
                None
            } else {
                Some(CliProgressCallback::new() as Arc<dyn OcrProgressCallback>)
            };
            chat(config, pdf.clone(), credentials, progress).await
        }
    }
}

/// Default log level when `RUST_LOG` is unset. `--quiet` wins over `--verbose`.
fn log_filter(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Rasterise once, OCR once, then answer questions until `exit`, `quit` or end of input.
async fn chat(
    config: PipelineConfig,
    pdf: PathBuf,
    credentials: OcrCredentials,
    progress: Option<ProgressCallback>,
) -> Result<()> {
    let converter = Arc::new(PdfiumConverter::new(&config));
    let document = session::open_document(converter, &config, &pdf)
        .await
        .with_context(|| format!("Failed to rasterise {}", pdf.display()))?;

    let ocr = BaiduOcr::from_config(&config).context("Failed to build OCR client")?;
    let (context, _) = session::build_context(
        Some(document.name.as_str()),
        &document.pages,
        &ocr,
        &credentials,
        progress.as_ref(),
    )
    .await
    .context("OCR failed")?;

    let answerer = completion::build_answerer(&config).context("Failed to build completion client")?;

    eprintln!(
        "{} Ask about {} (type {} to leave)",
        cyan("◆"),
        bold(&document.name),
        bold("exit")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", bold("?"));
        io::stdout().flush().context("Failed to write to stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match session::ask(answerer.as_ref(), Some(&context), question).await {
            Ok(answer) => println!("{answer}\n"),
            Err(e) if e.is_client_error() => eprintln!("{}", dim(&e.to_string())),
            Err(e) => eprintln!("{} {}", red("✗"), e),
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .uploads_dir(&cli.uploads_dir)
        .output_dir(&cli.output_dir)
        .raster_cache(cli.raster_cache.into());

    if let Some(ref dir) = cli.pdfium_lib_path {
        builder = builder.pdfium_library_path(dir);
    }
    if let Some(ref pwd) = cli.pdf_password {
        builder = builder.pdf_password(pwd);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.completion_api_key(key);
    }
    if let Some(ref url) = cli.completion_url {
        builder = builder.completion_endpoint(url);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_follows_flags() {
        assert_eq!(log_filter(false, false), "info");
        assert_eq!(log_filter(true, false), "debug");
        assert_eq!(log_filter(false, true), "error");
        assert_eq!(log_filter(true, true), "error");
    }

    #[test]
    fn quiet_flag_parses_after_subcommand() {
        let cli = Cli::try_parse_from(["pdfqa", "serve", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }
}
