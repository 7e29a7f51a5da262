//! Configuration types for the booking system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Conventional implicit-TLS (SMTPS) port
pub const SMTPS_PORT: u16 = 465;

/// Default bound for each network step, in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Main booking system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Outbound mail relay configuration
    pub mailer: MailerConfig,

    /// Booking store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Optional lifecycle service settings
    #[serde(default)]
    pub service: ServiceConfig,
}

impl BookingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.mailer.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Outbound mail relay configuration
///
/// All credential fields are required; their absence is a configuration
/// error detectable before any network attempt.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    /// Relay hostname
    pub host: String,

    /// Relay port; 465 selects implicit TLS, anything else STARTTLS
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Authentication username
    pub username: String,

    /// Authentication password
    /// ⚠️ NEVER log this value
    pub password: String,

    /// Sender address for outbound notifications
    pub sender: String,

    /// Sender display name
    #[serde(default)]
    pub sender_name: String,

    /// Operational copy address; receives a bcc of every confirmation
    #[serde(default)]
    pub copy_address: Option<String>,

    /// Whether implicit TLS was explicitly requested.
    ///
    /// Requesting implicit TLS on a non-SMTPS port is a misconfiguration;
    /// the transport resolver downgrades it to opportunistic upgrade and
    /// records a warning instead of silently wrapping the wrong port.
    #[serde(default)]
    pub implicit_tls: bool,

    /// Bound on TCP connection establishment, in seconds
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Bound on the protocol greeting exchange, in seconds
    #[serde(default = "default_timeout_secs")]
    pub greeting_timeout_secs: u64,

    /// Bound on each subsequent protocol operation, in seconds
    #[serde(default = "default_timeout_secs")]
    pub io_timeout_secs: u64,
}

// Custom Debug implementation that hides the relay password
impl std::fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("sender", &self.sender)
            .field("sender_name", &self.sender_name)
            .field("copy_address", &self.copy_address)
            .field("implicit_tls", &self.implicit_tls)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("greeting_timeout_secs", &self.greeting_timeout_secs)
            .field("io_timeout_secs", &self.io_timeout_secs)
            .finish()
    }
}

impl MailerConfig {
    /// Validate the relay configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.is_empty() {
            return Err(crate::Error::config("mail relay host cannot be empty"));
        }
        if self.port == 0 {
            return Err(crate::Error::config("mail relay port cannot be 0"));
        }
        if self.username.is_empty() {
            return Err(crate::Error::config("mail relay username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("mail relay password cannot be empty"));
        }
        if !crate::booking::is_valid_email(&self.sender) {
            return Err(crate::Error::config(format!(
                "sender address is not a valid email: {}",
                self.sender
            )));
        }
        if let Some(ref copy) = self.copy_address {
            if !crate::booking::is_valid_email(copy) {
                return Err(crate::Error::config(format!(
                    "copy address is not a valid email: {}",
                    copy
                )));
            }
        }
        for (name, secs) in [
            ("connect", self.connect_timeout_secs),
            ("greeting", self.greeting_timeout_secs),
            ("io", self.io_timeout_secs),
        ] {
            if secs == 0 {
                return Err(crate::Error::config(format!(
                    "{} timeout must be greater than 0 seconds",
                    name
                )));
            }
        }
        Ok(())
    }

    /// The security mode the resolver will actually use.
    ///
    /// Only the SMTPS port gets implicit TLS; every other port negotiates
    /// the opportunistic upgrade, regardless of the `implicit_tls` flag.
    pub fn security_mode(&self) -> SecurityMode {
        if self.port == SMTPS_PORT {
            SecurityMode::Implicit
        } else {
            SecurityMode::Opportunistic
        }
    }

    /// Whether the configured security request will be downgraded
    /// (implicit TLS requested on an opportunistic-upgrade port)
    pub fn security_downgraded(&self) -> bool {
        self.implicit_tls && self.port != SMTPS_PORT
    }

    /// RFC 5322 `From` mailbox string (`"Name <addr>"`, or the bare address
    /// when no display name is configured)
    pub fn from_mailbox(&self) -> String {
        if self.sender_name.is_empty() {
            self.sender.clone()
        } else {
            format!("{} <{}>", self.sender_name, self.sender)
        }
    }
}

/// Negotiated transport security mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// TLS from the first byte (SMTPS)
    Implicit,
    /// Plaintext session upgraded in-band (STARTTLS)
    Opportunistic,
}

impl std::fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Implicit => write!(f, "implicit TLS"),
            Self::Opportunistic => write!(f, "STARTTLS"),
        }
    }
}

/// Booking store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// File-backed booking store
    File {
        /// Path to the bookings file
        path: String,
    },

    /// In-memory booking store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.is_empty() => {
                Err(crate::Error::config("booking store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Lifecycle service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Capacity of the lifecycle event channel
    ///
    /// When full, new events are dropped (with a warning log). This prevents
    /// unbounded memory growth when nothing drains the receiver.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_event_channel_capacity() -> usize {
    1000
}
