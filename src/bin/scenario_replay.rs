//! Scenario replay
//!
//! Drives one widget through a scripted list of intents on the virtual clock
//! and prints every view update as a JSON line.
//!
//! A script is a JSON array. Each step is either an action object such as
//! `{"action": "notify"}`, a clock step `{"advance_ms": 1500}`, or the
//! string `"reset"`.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use scenario_sim::{AnySimulator, SimConfig, SimError, SimResult, UpdateCause, ViewUpdate, Widget};

/// Replay configuration
struct Config {
    /// Widget to mount
    widget: String,
    /// Script file, stdin when absent
    script: Option<PathBuf>,
    /// JSON simulator config
    config: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            widget: "singleton".to_string(),
            script: None,
            config: None,
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--widget" | "-w" => {
                if i + 1 < args.len() {
                    config.widget = args[i + 1].clone();
                    i += 2;
                } else {
                    eprintln!("error: --widget requires a value");
                    std::process::exit(1);
                }
            }
            "--script" | "-s" => {
                if i + 1 < args.len() {
                    config.script = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --script requires a value");
                    std::process::exit(1);
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config.config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --config requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("scenario-replay - replay a widget script on the virtual clock");
                println!();
                println!("USAGE:");
                println!("    scenario-replay [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -w, --widget <NAME>       Widget to mount [default: singleton]");
                println!("    -s, --script <FILE>       JSON script [default: stdin]");
                println!("    -c, --config <FILE>       JSON simulator config");
                println!("    -h, --help                Print help information");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {}", arg);
                std::process::exit(1);
            }
        }
    }

    config
}

fn read_source(path: Option<&PathBuf>) -> SimResult<String> {
    let mut buf = String::new();
    match path {
        Some(path) => {
            buf = std::fs::read_to_string(path)
                .map_err(|e| SimError::internal(format!("read {}: {e}", path.display())))?;
        }
        None => {
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| SimError::internal(format!("read stdin: {e}")))?;
        }
    }
    Ok(buf)
}

fn emit(out: &mut impl Write, widget: &AnySimulator, cause: UpdateCause) -> SimResult<()> {
    let update = ViewUpdate {
        widget: widget.name(),
        now_ms: widget.now_ms(),
        cause,
        view: widget.view(),
    };
    let line = serde_json::to_string(&update).map_err(|e| SimError::internal(e.to_string()))?;
    writeln!(out, "{line}").map_err(|e| SimError::internal(format!("write stdout: {e}")))
}

fn run(config: &Config) -> SimResult<()> {
    let sim_config = match &config.config {
        Some(path) => SimConfig::from_json_str(&read_source(Some(path))?)?,
        None => SimConfig::default(),
    };
    let mut widget = AnySimulator::from_name(&config.widget, &sim_config)?;

    let script: Vec<Value> = serde_json::from_str(&read_source(config.script.as_ref())?)
        .map_err(|e| SimError::internal(format!("script must be a JSON array: {e}")))?;

    tracing::info!(widget = widget.name(), steps = script.len(), "replaying script");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, &widget, UpdateCause::Reset)?;

    for (index, step) in script.into_iter().enumerate() {
        if step.as_str() == Some("reset") {
            widget.reset();
            emit(&mut out, &widget, UpdateCause::Reset)?;
            continue;
        }
        if let Some(ms) = step.get("advance_ms").and_then(Value::as_u64) {
            let count = widget.advance(Duration::from_millis(ms));
            emit(&mut out, &widget, UpdateCause::TimersFired { count })?;
            continue;
        }
        let cause = match widget.dispatch_value(step) {
            Ok(transition) => UpdateCause::Dispatched { transition },
            Err(err) => {
                tracing::warn!(step = index, error = %err, "step rejected");
                UpdateCause::Rejected { error: err.to_string() }
            }
        };
        emit(&mut out, &widget, cause)?;
    }

    let cancelled = widget.cancel_timers();
    tracing::info!(widget = widget.name(), cancelled, "replay finished");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = parse_args();
    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
