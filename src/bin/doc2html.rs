//! CLI binary for edgequake-doc2html.
//!
//! Drives one session from the terminal: pick the input, convert, then
//! write the HTML and run any requested exports.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_doc2html::export::DOCUMENT_TITLE;
use edgequake_doc2html::pipeline::input::paste_from_system_clipboard;
use edgequake_doc2html::{
    write_atomic, ConversionConfig, ConversionOutput, ConversionProgressCallback, ConversionStats,
    Controller, Converter, CopyNotice, FileStore, PendingInput, PreviewOptions, ProgressCallback,
    SystemClipboard,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current status string.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self) {
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    fn on_conversion_complete(&self, html_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} converted  {}",
            green("✔"),
            dim(&format!("{html_len} bytes of HTML"))
        );
    }

    fn on_conversion_error(&self, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), error);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a scanned worksheet, HTML to stdout
  doc2html worksheet.pdf

  # Photo of an exam, saved as HTML and as a Word document
  doc2html exam.jpg -o exam.html --doc ./exports

  # Whatever is on the clipboard (image first, then text)
  doc2html --paste --copy

  # Pasted text, rendered into a MathJax preview page
  doc2html --text 'Solve x^2 - 5x + 6 = 0' --preview preview.html

  # Piped text
  cat notes.txt | doc2html -o notes.html

  # Remember the API key for later runs
  doc2html --set-api-key AIza...

  # Use a different key for one run, keeping the stored one
  doc2html exam.pdf --api-key AIza...

  # Stats and HTML as JSON, written to a file
  doc2html exam.pdf --json -o exam.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (used when none is stored)
  GEMINI_MODEL            Override model ID (default gemini-2.5-flash)
  DOC2HTML_OUTPUT         Default for -o
  DOC2HTML_TEMPERATURE    Default for --temperature
  DOC2HTML_MATHJAX_URL    MathJax script used by --preview
"#;

/// Convert PDFs, images and pasted text into Word-ready HTML with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "doc2html",
    version,
    about = "Convert PDFs, images and pasted text into Word-ready HTML with Gemini",
    long_about = "Convert a PDF, PNG or JPEG file, a clipboard image or plain text into \
formatted HTML using Google Gemini. Tables become real tables and formulas are kept as \
$…$ / $$…$$ so they survive in Word or render with MathJax.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF, PNG or JPEG file to convert.
    input: Option<PathBuf>,

    /// Take the input from the system clipboard.
    #[arg(long, conflicts_with_all = ["input", "text"])]
    paste: bool,

    /// Convert this text instead of a file.
    #[arg(long, conflicts_with = "input")]
    text: Option<String>,

    /// Write the HTML to this file instead of stdout.
    #[arg(short, long, env = "DOC2HTML_OUTPUT")]
    output: Option<PathBuf>,

    /// Save a Word document (Converted_<name>.doc) into this directory.
    #[arg(long, env = "DOC2HTML_DOC_DIR")]
    doc: Option<PathBuf>,

    /// Copy the result (HTML + plain text) to the clipboard.
    #[arg(long)]
    copy: bool,

    /// Write a standalone preview page with MathJax typesetting.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// MathJax script loaded by the preview page.
    #[arg(long, env = "DOC2HTML_MATHJAX_URL")]
    mathjax_url: Option<String>,

    /// Gemini model ID.
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "DOC2HTML_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// API key for this run only; overrides the stored key without replacing it.
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Store an API key for later runs and exit.
    #[arg(long, value_name = "KEY")]
    set_api_key: Option<String>,

    /// Path to a text file replacing the built-in formatting rules.
    #[arg(long, env = "DOC2HTML_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "DOC2HTML_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Output structured JSON (ConversionOutput) instead of HTML, to stdout
    /// or to the -o file.
    #[arg(long, env = "DOC2HTML_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2HTML_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the feedback; library INFO logs would tear it.
    let show_progress = !cli.quiet && !cli.json && io::stderr().is_terminal();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let store = FileStore::in_config_dir().context("Failed to locate settings storage")?;

    // ── Build config + controller ────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;
    let converter = Converter::gemini(config).context("Failed to create Gemini client")?;
    let mut controller = Controller::with_converter(Arc::new(converter), Box::new(store))
        .context("Failed to load stored settings")?;

    // ── Settings-only mode ───────────────────────────────────────────────
    if let Some(ref key) = cli.set_api_key {
        controller
            .change_credential(key.trim())
            .context("Failed to store API key")?;
        if !cli.quiet {
            eprintln!("{} API key saved", green("✔"));
        }
        return Ok(());
    }

    if let Some(ref key) = cli.api_key {
        controller.use_credential_for_session(key.trim())?;
    }

    // ── Select input ─────────────────────────────────────────────────────
    if let Some(ref path) = cli.input {
        controller
            .select_file(path)
            .with_context(|| format!("Cannot use {}", path.display()))?;
    } else if cli.paste {
        let event = paste_from_system_clipboard().context("Failed to read the clipboard")?;
        controller.paste(&event)?;
        if controller.session().input().is_none() {
            bail!("The clipboard holds no image or text");
        }
    } else if let Some(ref text) = cli.text {
        controller.select_input(PendingInput::PastedText(text.clone()))?;
    } else if !io::stdin().is_terminal() {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        controller.select_input(PendingInput::PastedText(text))?;
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let stats = match controller.convert().await {
        Ok(stats) => stats,
        Err(e) => {
            let message = controller
                .session()
                .error()
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string());
            bail!(message);
        }
    };
    let html = controller.session().result().to_string();

    // ── Outputs ──────────────────────────────────────────────────────────
    let body = output_body(&html, &stats, cli.json)?;
    if let Some(ref path) = cli.output {
        write_atomic(path, body.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(body.as_bytes())
            .context("Failed to write to stdout")?;
        if !body.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if let Some(ref path) = cli.preview {
        let mut options = PreviewOptions::default();
        if let Some(ref url) = cli.mathjax_url {
            options.mathjax_url = Some(url.clone());
        }
        controller.toggle_mode();
        let view = controller.render(&options);
        controller.toggle_mode();

        let title = controller
            .session()
            .input()
            .display_name()
            .unwrap_or(DOCUMENT_TITLE)
            .to_string();
        write_atomic(path, view.to_page(&title).as_bytes())
            .with_context(|| format!("Failed to write preview {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{}  preview  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    if let Some(ref dir) = cli.doc {
        if let Some(path) = controller
            .export_document(dir, None)
            .context("Failed to save Word document")?
        {
            if !cli.quiet {
                eprintln!("{}  document  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
    }

    if cli.copy {
        let notice = match SystemClipboard::new() {
            Ok(mut sink) => controller.copy(None, &mut sink),
            Err(e) => {
                tracing::warn!("Clipboard unavailable: {}", e);
                CopyNotice::Failed
            }
        };
        match notice {
            CopyNotice::Copied => eprintln!("{} {}", green("✔"), notice.message()),
            _ => eprintln!("{} {}", red("✘"), notice.message()),
        }
    }

    if !cli.quiet && !cli.json {
        let tokens = match (stats.prompt_tokens, stats.output_tokens) {
            (Some(i), Some(o)) => format!("{i} tokens in  /  {o} tokens out  —  "),
            _ => String::new(),
        };
        eprintln!(
            "   {}",
            dim(&format!("{}{}  {}ms", tokens, stats.model, stats.duration_ms))
        );
    }

    Ok(())
}

/// What goes to stdout or the `-o` file: the HTML, or the full
/// `ConversionOutput` as pretty JSON.
fn output_body(html: &str, stats: &ConversionStats, json: bool) -> Result<String> {
    if !json {
        return Ok(html.to_string());
    }
    let output = ConversionOutput {
        html: html.to_string(),
        stats: stats.clone(),
    };
    serde_json::to_string_pretty(&output).context("Failed to serialise output")
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ConversionConfig::builder().temperature(cli.temperature);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
