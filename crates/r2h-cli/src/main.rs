//! `r2h-cli` – robot-to-human localisation node launcher
//!
//! This binary:
//!
//! 1. Loads `~/.r2h/config.toml` (or the file given with `--config <path>`),
//!    applying `R2H_*` environment overrides.
//! 2. Initialises logging (`debug`, `log_directory`, optional OTLP export).
//! 3. Builds the localisation node around the simulated filter.  An invalid
//!    configuration (e.g. `publish_rate = 0`) aborts with exit code 1.
//! 4. Spins the node on a multi-threaded Tokio runtime until **Ctrl-C**.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use r2h_filter::SimFilter;
use r2h_runtime::{LocalisationNode, init_tracing};
use r2h_types::{FsmState, Stamped};
use tokio::sync::watch;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "robot_to_human_localisation";

fn main() -> ExitCode {
    // ── Configuration ─────────────────────────────────────────────────────
    let path = match config_path_from_args(std::env::args().skip(1)) {
        Ok(p) => p.unwrap_or_else(config::config_path),
        Err(e) => {
            eprintln!("{}: {}", "Argument error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let cfg = match config::load_or_default(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Structured logging ────────────────────────────────────────────────
    // Hold the guard until exit so pending spans are flushed.
    let _tracing_guard = init_tracing(SERVICE_NAME, &cfg.log_settings());

    print_banner();
    if path.exists() {
        println!("  Config loaded from {}", path.display().to_string().bold());
    } else {
        println!("  No config at {}; using defaults.", path.display().to_string().dimmed());
    }

    // ── Shutdown signal ───────────────────────────────────────────────────
    // The scheduler stops once every sender is dropped; `main` keeps one.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctrlc_tx = shutdown_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after the current tick …".yellow().bold());
        let _ = ctrlc_tx.send(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the node can only be killed");
    }

    // ── Node ──────────────────────────────────────────────────────────────
    let node_config = match cfg.node_config() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let filter = SimFilter::new(cfg.sim.filter_config());
    let node = match LocalisationNode::new(node_config, Box::new(filter)) {
        Ok(node) => node,
        Err(e) => {
            error!(error = %e, "failed to start localisation node");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "  Publishing on {} at {} Hz (frame {}).\n",
        node.fully_qualified_name().bold(),
        cfg.publish_rate,
        cfg.base_footprint_frame_id.bold()
    );

    runtime.block_on(async {
        let status_logger = tokio::spawn(log_status_changes(node.bus().subscribe_status()));
        node.spin(shutdown_rx).await;
        status_logger.abort();
    });
    drop(shutdown_tx);

    println!("{}", "  ✓ Node stopped.".green());
    ExitCode::SUCCESS
}

/// Log every lifecycle transition seen on the status channel.
async fn log_status_changes(mut rx: watch::Receiver<Option<Stamped<FsmState>>>) {
    let mut last: Option<FsmState> = None;
    while rx.changed().await.is_ok() {
        let current = rx.borrow_and_update().as_ref().map(|m| m.data);
        if current != last {
            if let Some(state) = current {
                info!(from = ?last, to = %state, "filter lifecycle transition");
            }
            last = current;
        }
    }
}

/// Extract `--config <path>` from the command line.
fn config_path_from_args(
    mut args: impl Iterator<Item = String>,
) -> Result<Option<PathBuf>, String> {
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => match args.next() {
                Some(p) => path = Some(PathBuf::from(p)),
                None => return Err(format!("{arg} expects a path")),
            },
            other => return Err(format!("unknown argument `{other}`")),
        }
    }
    Ok(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}",
        "Robot-to-Human Localisation".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Leader position · status · diagnostics");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn no_arguments_means_default_path() {
        assert_eq!(config_path_from_args(args(&[])).unwrap(), None);
    }

    #[test]
    fn config_flag_sets_path() {
        assert_eq!(
            config_path_from_args(args(&["--config", "/etc/r2h.toml"])).unwrap(),
            Some(PathBuf::from("/etc/r2h.toml"))
        );
        assert_eq!(
            config_path_from_args(args(&["-c", "local.toml"])).unwrap(),
            Some(PathBuf::from("local.toml"))
        );
    }

    #[test]
    fn config_flag_without_value_is_an_error() {
        assert!(config_path_from_args(args(&["--config"])).is_err());
    }

    #[test]
    fn unknown_argument_is_an_error() {
        let err = config_path_from_args(args(&["--rate", "5"])).unwrap_err();
        assert!(err.contains("--rate"));
    }

    #[tokio::test]
    async fn status_logger_ends_when_channel_closes() {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(log_status_changes(rx));
        tx.send_replace(Some(Stamped {
            stamp: now(),
            frame_id: String::new(),
            data: FsmState::Running,
        }));
        drop(tx);
        task.await.expect("logger task must finish once the sender is gone");
    }

    fn now() -> r2h_types::Timestamp {
        std::time::SystemTime::now().into()
    }
}
