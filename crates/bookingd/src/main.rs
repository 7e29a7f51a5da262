// # bookingd - Booking Daemon
//
// The bookingd daemon is a THIN integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime and tracing
// 3. Wiring the booking store, the SMTP notifier and the lifecycle service
// 4. Draining lifecycle events into structured logs
//
// All booking logic lives in booking-core; all SMTP logic lives in
// booking-notify-smtp. The HTTP surface is owned by an external layer that
// consumes the `BookingService` handle this daemon constructs; nothing in
// this binary implements routing.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Mail relay
// - `BOOKING_SMTP_HOST`: Relay hostname
// - `BOOKING_SMTP_PORT`: Relay port (default 587; 465 selects implicit TLS)
// - `BOOKING_SMTP_USER`: Authentication username
// - `BOOKING_SMTP_PASSWORD`: Authentication password
// - `BOOKING_SMTP_FROM`: Sender address
// - `BOOKING_SMTP_FROM_NAME`: Sender display name (optional)
// - `BOOKING_SMTP_COPY_TO`: Operational bcc address (optional)
// - `BOOKING_SMTP_IMPLICIT_TLS`: Request implicit TLS (true/false)
// - `BOOKING_SMTP_CONNECT_TIMEOUT_SECS`: Connection bound (default 30)
// - `BOOKING_SMTP_GREETING_TIMEOUT_SECS`: Greeting bound (default 30)
// - `BOOKING_SMTP_IO_TIMEOUT_SECS`: Per-operation bound (default 30)
//
// ### Booking store
// - `BOOKING_STORE_TYPE`: Type of store (file, memory)
// - `BOOKING_STORE_PATH`: Path to the bookings file (for file store)
//
// ### Logging
// - `BOOKING_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export BOOKING_SMTP_HOST=mail.example.com
// export BOOKING_SMTP_PORT=587
// export BOOKING_SMTP_USER=office@example.com
// export BOOKING_SMTP_PASSWORD=relay_password
// export BOOKING_SMTP_FROM=office@example.com
// export BOOKING_STORE_TYPE=file
// export BOOKING_STORE_PATH=/var/lib/booking/bookings.json
//
// bookingd
// ```

use anyhow::Result;
use booking_core::config::{MailerConfig, ServiceConfig};
use booking_core::service::BookingEvent;
use booking_core::store::{FileBookingStore, MemoryBookingStore};
use booking_core::traits::BookingStore;
use booking_core::BookingService;
use booking_notify_smtp::SmtpNotifier;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum BookingExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<BookingExitCode> for ExitCode {
    fn from(code: BookingExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    smtp_host: String,
    smtp_port: u16,
    smtp_user: String,
    smtp_password: String,
    smtp_from: String,
    smtp_from_name: String,
    smtp_copy_to: Option<String>,
    smtp_implicit_tls: bool,
    connect_timeout_secs: u64,
    greeting_timeout_secs: u64,
    io_timeout_secs: u64,
    store_type: String,
    store_path: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: env::var("BOOKING_SMTP_HOST")?,
            smtp_port: parse_env("BOOKING_SMTP_PORT")?.unwrap_or(587),
            smtp_user: env::var("BOOKING_SMTP_USER")?,
            smtp_password: env::var("BOOKING_SMTP_PASSWORD")?,
            smtp_from: env::var("BOOKING_SMTP_FROM")?,
            smtp_from_name: env::var("BOOKING_SMTP_FROM_NAME").unwrap_or_default(),
            smtp_copy_to: env::var("BOOKING_SMTP_COPY_TO").ok().filter(|s| !s.is_empty()),
            smtp_implicit_tls: env::var("BOOKING_SMTP_IMPLICIT_TLS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            connect_timeout_secs: parse_env("BOOKING_SMTP_CONNECT_TIMEOUT_SECS")?.unwrap_or(30),
            greeting_timeout_secs: parse_env("BOOKING_SMTP_GREETING_TIMEOUT_SECS")?.unwrap_or(30),
            io_timeout_secs: parse_env("BOOKING_SMTP_IO_TIMEOUT_SECS")?.unwrap_or(30),
            store_type: env::var("BOOKING_STORE_TYPE").unwrap_or_else(|_| "file".to_string()),
            store_path: env::var("BOOKING_STORE_PATH").ok(),
            log_level: env::var("BOOKING_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs comprehensive validation including:
    /// - Required field presence
    /// - Value format validation (addresses, ports)
    /// - Numeric range validation
    /// - Type enumeration validation
    /// - Security checks (placeholder credentials)
    fn validate(&self) -> Result<()> {
        if self.smtp_host.is_empty() {
            anyhow::bail!(
                "BOOKING_SMTP_HOST is required. \
                Set it via: export BOOKING_SMTP_HOST=mail.example.com"
            );
        }

        if self.smtp_port == 0 {
            anyhow::bail!("BOOKING_SMTP_PORT cannot be 0");
        }

        if self.smtp_user.is_empty() {
            anyhow::bail!(
                "BOOKING_SMTP_USER is required. \
                Set it via: export BOOKING_SMTP_USER=office@example.com"
            );
        }

        if self.smtp_password.is_empty() {
            anyhow::bail!(
                "BOOKING_SMTP_PASSWORD is required. \
                Set it via: export BOOKING_SMTP_PASSWORD=your_relay_password"
            );
        }

        // Check for obvious placeholder credentials (common mistake)
        let password_lower = self.smtp_password.to_lowercase();
        if password_lower.contains("your_relay_password")
            || password_lower.contains("replace_me")
            || password_lower.contains("example")
            || password_lower == "password"
        {
            anyhow::bail!(
                "BOOKING_SMTP_PASSWORD appears to be a placeholder. \
                Use the actual mailbox password from your relay provider."
            );
        }

        if !booking_core::booking::is_valid_email(&self.smtp_from) {
            anyhow::bail!(
                "BOOKING_SMTP_FROM is not a valid email address. Got: {}",
                self.smtp_from
            );
        }

        if let Some(ref copy) = self.smtp_copy_to {
            if !booking_core::booking::is_valid_email(copy) {
                anyhow::bail!(
                    "BOOKING_SMTP_COPY_TO is not a valid email address. Got: {}",
                    copy
                );
            }
        }

        // Validate timeout ranges
        for (name, secs) in [
            ("BOOKING_SMTP_CONNECT_TIMEOUT_SECS", self.connect_timeout_secs),
            ("BOOKING_SMTP_GREETING_TIMEOUT_SECS", self.greeting_timeout_secs),
            ("BOOKING_SMTP_IO_TIMEOUT_SECS", self.io_timeout_secs),
        ] {
            if !(1..=300).contains(&secs) {
                anyhow::bail!("{} must be between 1 and 300 seconds. Got: {}", name, secs);
            }
        }

        // Validate store type
        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "BOOKING_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        // Validate store path for file store
        if self.store_type == "file" {
            if let Some(ref path) = self.store_path {
                if path.is_empty() {
                    anyhow::bail!(
                        "BOOKING_STORE_PATH cannot be empty when BOOKING_STORE_TYPE=file"
                    );
                }

                // Check parent directory exists or can be created
                if let Some(parent) = std::path::Path::new(path).parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    anyhow::bail!(
                        "BOOKING_STORE_PATH parent directory does not exist: {}. \
                            Create it first: sudo mkdir -p {}",
                        parent.display(),
                        parent.display()
                    );
                }
            } else {
                anyhow::bail!(
                    "BOOKING_STORE_PATH is required when BOOKING_STORE_TYPE=file. \
                    Set it via: export BOOKING_STORE_PATH=/var/lib/booking/bookings.json"
                );
            }
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "BOOKING_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// The mailer configuration consumed by the SMTP notifier
    fn mailer_config(&self) -> MailerConfig {
        MailerConfig {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
            sender: self.smtp_from.clone(),
            sender_name: self.smtp_from_name.clone(),
            copy_address: self.smtp_copy_to.clone(),
            implicit_tls: self.smtp_implicit_tls,
            connect_timeout_secs: self.connect_timeout_secs,
            greeting_timeout_secs: self.greeting_timeout_secs,
            io_timeout_secs: self.io_timeout_secs,
        }
    }
}

/// Parse an optional numeric environment variable strictly
fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} is not a valid number ({}): {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return BookingExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return BookingExitCode::ConfigError.into();
    }

    // Initialize tracing
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
        return BookingExitCode::ConfigError.into();
    }

    info!("Starting bookingd daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BookingExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            BookingExitCode::RuntimeError
        } else {
            BookingExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    // Booking store
    let store: Arc<dyn BookingStore> = match config.store_type.as_str() {
        "memory" => {
            info!("Using in-memory booking store");
            Arc::new(MemoryBookingStore::new())
        }
        _ => match config.store_path {
            Some(ref path) => {
                info!("Using file booking store at {}", path);
                Arc::new(FileBookingStore::new(path).await?)
            }
            None => anyhow::bail!("BOOKING_STORE_PATH is required when BOOKING_STORE_TYPE=file"),
        },
    };

    // SMTP notifier; construction re-validates the relay configuration
    let mailer = config.mailer_config();
    info!(
        host = %mailer.host,
        port = mailer.port,
        security = %mailer.security_mode(),
        "Mail relay configured"
    );
    let notifier = Arc::new(SmtpNotifier::new(mailer)?);

    // Lifecycle service; the HTTP layer consumes this handle
    let (service, events) = BookingService::new(store, notifier, ServiceConfig::default());
    let _service = service;

    // Drain lifecycle events into structured logs
    let event_logger = tokio::spawn(log_events(events));

    info!("Booking service ready");

    // Wait for shutdown signal
    let signal_name = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal_name);
    info!("Shutting down daemon");

    event_logger.abort();
    Ok(())
}

/// Log lifecycle events as they arrive
async fn log_events(mut events: tokio::sync::mpsc::Receiver<BookingEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            BookingEvent::BookingCreated { booking_id, price } => {
                info!(booking_id, price = %price, "event: booking created");
            }
            BookingEvent::BookingConfirmed { booking_id, repeat } => {
                info!(booking_id, repeat, "event: booking confirmed");
            }
            BookingEvent::NotificationSent {
                booking_id,
                message_id,
            } => {
                info!(booking_id, message_id = %message_id, "event: notification sent");
            }
            BookingEvent::NotificationFailed { booking_id, error } => {
                warn!(booking_id, error = %error, "event: notification failed");
            }
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    // Set up signal handlers for SIGTERM and SIGINT
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
