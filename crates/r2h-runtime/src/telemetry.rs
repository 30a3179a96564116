//! Logging and OpenTelemetry pipeline initialisation.
//!
//! Call [`init_tracing`] once at process startup, before the node is built.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). When set the OTLP HTTP exporter is activated. |
//! | `RUST_LOG` | Log filter.  Overrides the default of `"info"` (`"debug"` with [`LogSettings::debug`]). |
//! | `R2H_LOG_FORMAT=json` | Emit newline-delimited JSON logs on stderr. |
//!
//! When [`LogSettings::log_directory`] is set, a plain-text copy of every
//! record is appended to `<log_directory>/<service_name>.log`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging options of the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// Lower the default level to `debug`.
    pub debug: bool,
    /// Directory receiving a log file.
    pub log_directory: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// The returned [`TracerProviderGuard`] **must** be held for the lifetime of
/// the process; dropping it flushes all pending span batches.
///
/// Failing to open the log file or to build the OTLP exporter is reported on
/// stderr and the corresponding output is skipped; console logging always
/// works.
pub fn init_tracing(service_name: &str, settings: &LogSettings) -> TracerProviderGuard {
    let default_level = if settings.debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let use_json = std::env::var("R2H_LOG_FORMAT").as_deref() == Ok("json");

    let provider = build_provider(service_name);

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if let Some(ref p) = provider {
        let tracer = p.tracer("r2h");
        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
    }
    if use_json {
        layers.push(tracing_subscriber::fmt::layer().json().with_writer(io::stderr).boxed());
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(io::stderr)
                .boxed(),
        );
    }
    if let Some(ref dir) = settings.log_directory {
        match open_log_file(dir, service_name) {
            Ok(file) => layers.push(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            ),
            Err(e) => eprintln!("[r2h] cannot open log file in {}: {e}", dir.display()),
        }
    }

    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
    {
        eprintln!("[r2h] tracing subscriber already installed: {e}");
    }

    TracerProviderGuard(provider)
}

// ─────────────────────────────────────────────────────────────────────────────
// RAII guard
// ─────────────────────────────────────────────────────────────────────────────

/// RAII guard that shuts down the OTel [`SdkTracerProvider`] on drop.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[r2h] OpenTelemetry provider shutdown error: {e}");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Create `dir` if needed and open `<dir>/<service_name>.log` for appending.
fn open_log_file(dir: &Path, service_name: &str) -> io::Result<File> {
    fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(format!("{service_name}.log")))
}

/// Build an [`SdkTracerProvider`] when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[r2h] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // The simple exporter needs no Tokio runtime at init time; the
            // CLI builds its runtime after calling `init_tracing`.
            .with_simple_exporter(exporter)
            .build(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_provider_returns_none_without_endpoint() {
        // SAFETY: no other test in this crate touches this variable.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        assert!(build_provider("test-service").is_none());
    }

    #[test]
    fn tracer_provider_guard_drop_with_none_is_safe() {
        let guard = TracerProviderGuard(None);
        drop(guard);
    }

    #[test]
    fn log_file_is_created_under_nested_directory() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let nested = dir.path().join("logs").join("r2h");
        let file = open_log_file(&nested, "robot_to_human_localisation").expect("open");
        drop(file);
        assert!(nested.join("robot_to_human_localisation.log").exists());
    }

    #[test]
    fn log_file_is_appended_not_truncated() {
        use std::io::Write;
        let dir = tempfile::tempdir().expect("tmp dir");
        let mut first = open_log_file(dir.path(), "svc").unwrap();
        first.write_all(b"one\n").unwrap();
        let mut second = open_log_file(dir.path(), "svc").unwrap();
        second.write_all(b"two\n").unwrap();
        let content = std::fs::read_to_string(dir.path().join("svc.log")).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }
}
