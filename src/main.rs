use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use countdown_render::config::load_config;
use countdown_render::deadline::{Instant, SystemClock};
use countdown_render::encoding::RenderMode;
use countdown_render::engine::{CountdownEngine, CountdownRequest};
use countdown_render::error_codes::find_countdown_error;
use countdown_render::logging::init_logger;
use countdown_render::server::serve;

#[derive(Debug, Parser)]
#[command(name = "countdown")]
#[command(about = "Render countdown timers as PNG stills or looping GIFs")]
#[command(version = env!("COUNTDOWN_VERSION"))]
struct Cli {
    /// Debug-level logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render one countdown image to a file
    Render {
        #[arg(long)]
        end: String,
        #[arg(long)]
        bg: Option<String>,
        #[arg(long = "box")]
        box_fill: Option<String>,
        #[arg(long)]
        digit: Option<String>,
        /// Write a PNG still instead of the animated GIF
        #[arg(long)]
        still: bool,
        /// Pretend the current time is this deadline-formatted value
        #[arg(long)]
        now: Option<String>,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the remaining time as JSON
    Check {
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        listen: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.log_json);

    let result = match cli.command {
        Commands::Render {
            end,
            bg,
            box_fill,
            digit,
            still,
            now,
            output,
            config,
        } => {
            let request = CountdownRequest {
                end: Some(end),
                background: bg,
                box_fill,
                digit_color: digit,
            };
            let mode = if still {
                RenderMode::Still
            } else {
                RenderMode::Animated
            };
            run_render(config.as_deref(), &request, now.as_deref(), mode, &output)
        }
        Commands::Check { end, now, config } => {
            let request = CountdownRequest {
                end,
                ..CountdownRequest::default()
            };
            run_check(config.as_deref(), &request, now.as_deref())
        }
        Commands::Serve { config, listen } => run_serve(config.as_deref(), listen),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match find_countdown_error(&err) {
            Some(coded) => {
                match serde_json::to_string_pretty(&coded.envelope()) {
                    Ok(envelope) => println!("{envelope}"),
                    Err(_) => eprintln!("error: {err:#}"),
                }
                ExitCode::from(2)
            }
            None => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn load_engine(config_path: Option<&Path>) -> Result<CountdownEngine> {
    let config = load_config(config_path)?;
    CountdownEngine::new(config)
}

fn resolve_now(engine: &CountdownEngine, now: Option<&str>) -> Result<Instant> {
    match now {
        Some(raw) => {
            let deadline = engine
                .deadline(&CountdownRequest::new(raw))
                .context("invalid --now value")?;
            Ok(*deadline.instant())
        }
        None => Ok(engine.now(&SystemClock)),
    }
}

fn run_render(
    config_path: Option<&Path>,
    request: &CountdownRequest,
    now: Option<&str>,
    mode: RenderMode,
    output: &Path,
) -> Result<()> {
    let engine = load_engine(config_path)?;
    let now = resolve_now(&engine, now)?;
    let rendered = engine.render(request, &now, mode)?;

    fs::write(output, &rendered.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Wrote {} ({}, {} frame(s), {} bytes)",
        output.display(),
        rendered.media_type.content_type(),
        rendered.frame_count,
        rendered.bytes.len()
    );
    Ok(())
}

fn run_check(config_path: Option<&Path>, request: &CountdownRequest, now: Option<&str>) -> Result<()> {
    let engine = load_engine(config_path)?;
    let now = resolve_now(&engine, now)?;
    let deadline = engine.deadline(request)?;
    let remaining = engine.remaining(request, &now)?;

    let report = json!({
        "ok": true,
        "timezone": engine.timezone().name(),
        "now": now.to_rfc3339(),
        "deadline": deadline.instant().to_rfc3339(),
        "total_seconds": remaining.total_seconds(),
        "remaining": remaining,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_serve(config_path: Option<&Path>, listen: Option<String>) -> Result<()> {
    let engine = load_engine(config_path)?;
    let listen = listen.unwrap_or_else(|| engine.config().listen.clone());
    // Resolve fonts before the first request so a fallback warning shows at startup.
    let fonts = engine.fonts();
    tracing::info!(
        numeral = fonts.numeral.source(),
        label = fonts.label.source(),
        "fonts ready"
    );
    serve(Arc::new(engine), &listen)
}
