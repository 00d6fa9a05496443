//! luaseal: package Lua scripts for the TEE runtime
//!
//! Commands:
//!   seal <path>            - seal a script, or every script under a directory
//!   open <blob>            - verify and decrypt a blob
//!   verify <blob>          - check a blob's tag without writing plaintext
//!   inspect <blob>         - show the public frame fields of a blob
//!   config show            - display current configuration

mod batch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use luaseal_core::config::LuasealConfig;
use luaseal_core::load_master_key;
use luaseal_crypto::Frame;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "luaseal",
    version,
    about = "Seal Lua scripts for delivery into the TEE runtime",
    long_about = "luaseal: encrypt and authenticate scripts (HKDF-SHA512, AES-256-CTR, HMAC-SHA512) \
                  into opaque blobs the trusted application can verify and load"
)]
struct Cli {
    /// Path to luaseal.toml configuration file
    #[arg(long, short = 'c', env = "LUASEAL_CONFIG", default_value = "luaseal.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "LUASEAL_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "LUASEAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seal a script file, or every script under a directory (one blob per script)
    Seal {
        /// Script file or directory
        path: PathBuf,
        /// Write blobs under this directory instead of next to the inputs
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
        /// Hex master key file (overrides env and config)
        #[arg(long, short = 'k')]
        key_file: Option<PathBuf>,
        /// Replace existing blobs
        #[arg(long)]
        force: bool,
    },

    /// Verify and decrypt a blob
    Open {
        /// Sealed blob
        blob: PathBuf,
        /// Destination file, or "-" for stdout (default: blob path with the script extension)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Hex master key file (overrides env and config)
        #[arg(long, short = 'k')]
        key_file: Option<PathBuf>,
        /// Replace an existing output file
        #[arg(long)]
        force: bool,
    },

    /// Check a blob's authentication tag without writing plaintext
    Verify {
        /// Sealed blob
        blob: PathBuf,
        /// Hex master key file (overrides env and config)
        #[arg(long, short = 'k')]
        key_file: Option<PathBuf>,
    },

    /// Show the public frame fields (salt, nonce, payload length) of a blob
    Inspect {
        /// Sealed blob
        blob: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = LuasealConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, format);

    if !cli.config.exists() {
        warn!("config file not found: {}  (using defaults)", cli.config.display());
    }

    match cli.command {
        Commands::Seal { path, out_dir, key_file, force } => {
            cmd_seal(&config, &path, out_dir.as_deref(), key_file.as_deref(), force)
        }
        Commands::Open { blob, output, key_file, force } => {
            cmd_open(&config, &blob, output.as_deref(), key_file.as_deref(), force)
        }
        Commands::Verify { blob, key_file } => cmd_verify(&config, &blob, key_file.as_deref()),
        Commands::Inspect { blob } => cmd_inspect(&blob),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so `open -o -` can stream plaintext on stdout.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn make_progress_bar(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

// ── `luaseal seal` ────────────────────────────────────────────────────────────

fn cmd_seal(
    config: &LuasealConfig,
    path: &Path,
    out_dir: Option<&Path>,
    key_file: Option<&Path>,
    force: bool,
) -> Result<()> {
    let loaded = load_master_key(&config.key, key_file)?;
    info!(source = %loaded.source, "using master key");
    let overwrite = force || config.seal.overwrite;

    if path.is_file() {
        let root = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let output = batch::sealed_path_for(path, &root, out_dir, &config.seal.sealed_extension);

        match batch::seal_file(&loaded.key, path, &output, overwrite)? {
            Some(outcome) => {
                println!("Sealed {} → {}", outcome.input.display(), outcome.output.display());
                println!("  payload: {} bytes", outcome.payload_bytes);
                println!(
                    "  blob:    {} bytes",
                    luaseal_crypto::frame::sealed_len(outcome.payload_bytes)
                );
            }
            None => {
                println!("  skipped: {} exists (use --force)", output.display());
            }
        }
    } else if path.is_dir() {
        let pb = make_progress_bar("seal");
        let report = batch::seal_tree(&loaded.key, path, out_dir, &config.seal, overwrite, Some(&pb))
            .with_context(|| format!("sealing tree: {}", path.display()))?;
        pb.finish_with_message("done");

        println!();
        println!("Seal complete:");
        println!("  sealed:  {} scripts", report.sealed.len());
        println!("  skipped: {} scripts (output exists)", report.skipped.len());
        println!("  failed:  {} scripts", report.failed.len());
        println!("  total:   {} scripts", report.total());
        for (input, err) in &report.failed {
            println!("  ✗ {}: {err}", input.display());
        }

        if !report.failed.is_empty() {
            anyhow::bail!("{} of {} scripts failed to seal", report.failed.len(), report.total());
        }
    } else {
        anyhow::bail!("path not found or not a file/directory: {}", path.display());
    }

    Ok(())
}

// ── `luaseal open` ────────────────────────────────────────────────────────────

fn cmd_open(
    config: &LuasealConfig,
    blob: &Path,
    output: Option<&Path>,
    key_file: Option<&Path>,
    force: bool,
) -> Result<()> {
    let loaded = load_master_key(&config.key, key_file)?;
    let plaintext = batch::open_file(&loaded.key, blob)?;

    match output {
        Some(p) if p == Path::new("-") => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&plaintext).context("writing to stdout")?;
            stdout.flush().context("flushing stdout")?;
        }
        _ => {
            let dest = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| batch::opened_path_for(blob, &config.seal));
            batch::write_output(&dest, &plaintext, force || config.seal.overwrite)?;
            println!("Opened {} → {} ({} bytes)", blob.display(), dest.display(), plaintext.len());
        }
    }
    Ok(())
}

// ── `luaseal verify` ──────────────────────────────────────────────────────────

fn cmd_verify(config: &LuasealConfig, blob_path: &Path, key_file: Option<&Path>) -> Result<()> {
    let loaded = load_master_key(&config.key, key_file)?;
    let blob = std::fs::read(blob_path).with_context(|| format!("reading blob: {}", blob_path.display()))?;

    let payload_len = luaseal_crypto::verify(&loaded.key, &blob)
        .with_context(|| format!("verifying {}", blob_path.display()))?;
    println!("{}: OK ({} byte payload)", blob_path.display(), payload_len);
    Ok(())
}

// ── `luaseal inspect` ─────────────────────────────────────────────────────────

fn cmd_inspect(blob_path: &Path) -> Result<()> {
    let blob = std::fs::read(blob_path).with_context(|| format!("reading blob: {}", blob_path.display()))?;
    let frame = Frame::parse(&blob).with_context(|| format!("parsing {}", blob_path.display()))?;

    println!("{}", blob_path.display());
    println!("  size:    {} bytes", blob.len());
    println!("  salt:    {}", hex::encode(frame.salt));
    println!("  nonce:   {}", hex::encode(frame.nonce));
    println!("  payload: {} bytes", frame.payload_len());
    println!("  (tag not checked; use `luaseal verify`)");
    Ok(())
}

// ── `luaseal config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &LuasealConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
