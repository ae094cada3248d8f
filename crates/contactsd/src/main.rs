// # contactsd - Contact Directory Daemon
//
// Thin host for the contacts-core pipeline. All directory logic lives in
// contacts-core; this binary only:
// 1. Reads configuration from environment variables
// 2. Initializes logging and the runtime
// 3. Loads the initial payload and registers a logging observer
// 4. Runs until SIGTERM/SIGINT, then shuts the pipeline down
//
// ## Configuration
//
// ### Payload
// - `CONTACTS_PAYLOAD_PATH`: JSON file loaded at startup (optional)
//
// ### Periodic updates
// - `CONTACTS_SERVER_UPDATE`: Start the periodic mutator (true/false)
// - `CONTACTS_UPDATE_INTERVAL_MS`: Mutator interval in milliseconds
//
// ### Pipeline
// - `CONTACTS_MAX_NOTIFIERS`: Upper bound on notifier workers
// - `CONTACTS_QUEUE_CAPACITY`: Event queue capacity
// - `CONTACTS_DRAIN_RETRIES`: Shutdown drain polls
// - `CONTACTS_DRAIN_INTERVAL_MS`: Delay between drain polls
//
// ### Logging
// - `CONTACTS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export CONTACTS_PAYLOAD_PATH=/etc/contacts/contacts.json
// export CONTACTS_SERVER_UPDATE=true
// export CONTACTS_UPDATE_INTERVAL_MS=500
//
// contactsd
// ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use contacts_core::{Contact, ContactDirectory, ContactObserver, PipelineConfig};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ContactsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ContactsExitCode> for ExitCode {
    fn from(code: ContactsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    payload_path: Option<String>,
    server_update: bool,
    update_interval_ms: Option<u64>,
    max_notifiers: Option<usize>,
    queue_capacity: Option<usize>,
    drain_retries: Option<usize>,
    drain_interval_ms: Option<u64>,
    log_level: String,
}

/// Read an optional numeric variable; present but unparsable is an error
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number. Got: '{}'", name, raw)),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let server_update = match env::var("CONTACTS_SERVER_UPDATE") {
            Ok(raw) => match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => anyhow::bail!(
                    "CONTACTS_SERVER_UPDATE must be true or false. Got: '{}'",
                    raw
                ),
            },
            Err(_) => false,
        };

        Ok(Self {
            payload_path: env::var("CONTACTS_PAYLOAD_PATH").ok(),
            server_update,
            update_interval_ms: parse_var("CONTACTS_UPDATE_INTERVAL_MS")?,
            max_notifiers: parse_var("CONTACTS_MAX_NOTIFIERS")?,
            queue_capacity: parse_var("CONTACTS_QUEUE_CAPACITY")?,
            drain_retries: parse_var("CONTACTS_DRAIN_RETRIES")?,
            drain_interval_ms: parse_var("CONTACTS_DRAIN_INTERVAL_MS")?,
            log_level: env::var("CONTACTS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks the payload path and numeric ranges. The library re-validates
    /// the resulting [`PipelineConfig`].
    fn validate(&self) -> Result<()> {
        if let Some(ref path) = self.payload_path {
            if path.is_empty() {
                anyhow::bail!("CONTACTS_PAYLOAD_PATH cannot be empty when set");
            }

            if !std::path::Path::new(path).is_file() {
                anyhow::bail!("CONTACTS_PAYLOAD_PATH does not name a file: {}", path);
            }
        }

        if let Some(interval) = self.update_interval_ms
            && !(10..=3_600_000).contains(&interval)
        {
            anyhow::bail!(
                "CONTACTS_UPDATE_INTERVAL_MS must be between 10 and 3600000. Got: {}",
                interval
            );
        }

        if let Some(max_notifiers) = self.max_notifiers
            && (max_notifiers == 0 || max_notifiers > 64)
        {
            anyhow::bail!(
                "CONTACTS_MAX_NOTIFIERS must be between 1 and 64. Got: {}",
                max_notifiers
            );
        }

        if let Some(capacity) = self.queue_capacity
            && capacity == 0
        {
            anyhow::bail!("CONTACTS_QUEUE_CAPACITY must be at least 1");
        }

        if let Some(retries) = self.drain_retries
            && retries > 1000
        {
            anyhow::bail!(
                "CONTACTS_DRAIN_RETRIES must be at most 1000. Got: {}",
                retries
            );
        }

        if let Some(interval) = self.drain_interval_ms
            && !(1..=60_000).contains(&interval)
        {
            anyhow::bail!(
                "CONTACTS_DRAIN_INTERVAL_MS must be between 1 and 60000. Got: {}",
                interval
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "CONTACTS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn pipeline(&self) -> PipelineConfig {
        let mut pipeline = PipelineConfig::default().with_server_update(self.server_update);

        if let Some(max) = self.max_notifiers {
            pipeline = pipeline.with_max_notifiers(max);
        }
        if let Some(capacity) = self.queue_capacity {
            pipeline = pipeline.with_queue_capacity(capacity);
        }
        if let Some(ms) = self.update_interval_ms {
            pipeline = pipeline.with_update_interval(Duration::from_millis(ms));
        }
        if self.drain_retries.is_some() || self.drain_interval_ms.is_some() {
            let defaults = PipelineConfig::default();
            pipeline = pipeline.with_drain(
                self.drain_retries.unwrap_or(defaults.drain_retries),
                Duration::from_millis(self.drain_interval_ms.unwrap_or(defaults.drain_interval_ms)),
            );
        }

        pipeline
    }
}

/// Logs every change notification
struct LoggingObserver;

#[async_trait]
impl ContactObserver for LoggingObserver {
    async fn on_contact_added(&self, contact: Contact) {
        info!("Contact added: {}", contact);
    }

    async fn on_contact_updated(&self, contact: Contact) {
        info!("Contact updated (was {})", contact);
    }

    fn name(&self) -> &str {
        "logging"
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ContactsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ContactsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ContactsExitCode::ConfigError.into();
    }

    info!("Starting contactsd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ContactsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => ContactsExitCode::CleanShutdown,
            Err(e) if is_startup_error(&e) => {
                error!("Startup error: {:#}", e);
                ContactsExitCode::ConfigError
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                ContactsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

fn is_startup_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<contacts_core::Error>()
        .is_some_and(|e| matches!(e, contacts_core::Error::Config(_)))
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config) -> Result<()> {
    let directory = Arc::new(ContactDirectory::new(config.pipeline())?);
    directory.register_observer(Arc::new(LoggingObserver));

    if let Some(ref path) = config.payload_path {
        let loaded = directory
            .load_json_file(path)
            .await
            .with_context(|| format!("failed to load payload from {}", path))?;
        info!("Loaded {} contact(s) from {}", loaded, path);
    }

    info!(
        "Server updates {} (interval {:?})",
        if directory.is_server_update_enabled() {
            "enabled"
        } else {
            "disabled"
        },
        directory.update_interval()
    );
    info!("Daemon initialized successfully");

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    let report = directory.shutdown().await;
    info!(
        "Shutdown complete: {} event(s) dispatched, {} dropped, {} lost to overflow",
        report.dispatched, report.dropped, report.overflowed
    );

    Ok(())
}

/// Wait for SIGTERM or SIGINT
///
/// # Returns
///
/// The name of the signal received
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
