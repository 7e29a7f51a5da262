//! Mail transport resolution
//!
//! Produces a verified, ready-to-use transport handle, tolerating DNS and
//! address-family ambiguity around the relay:
//!
//! 1. Pick the security mode from the configured port (465 means implicit
//!    TLS; everything else negotiates STARTTLS, and an implicit-TLS request
//!    on a STARTTLS port is downgraded with a warning rather than honored).
//! 2. Establish and verify a session against the configured hostname.
//! 3. On failure, resolve the hostname to its IPv4 address explicitly and
//!    retry against the literal, same port/security/credentials.
//! 4. If that also fails, the *second* failure is surfaced and cached as
//!    fatal for the rest of the process.
//!
//! Resolution runs at most once per process. Concurrent callers arriving
//! during construction wait for the single in-flight attempt; nothing runs
//! twice in parallel. [`TransportResolver::invalidate`] is the explicit
//! extension point for forcing a new resolution; no production path calls it.

use crate::render::RenderedMail;
use async_trait::async_trait;
use booking_core::config::{MailerConfig, SecurityMode};
use booking_core::error::{Error, Result};
use booking_core::traits::DeliveryReceipt;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Network endpoint a transport session is established against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The configured relay hostname
    Hostname(String),
    /// An explicitly resolved IPv4 literal
    Ipv4(Ipv4Addr),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hostname(host) => write!(f, "{}", host),
            Self::Ipv4(addr) => write!(f, "{}", addr),
        }
    }
}

/// A verified handle capable of sending rendered mail
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Perform a single delivery attempt
    async fn send(&self, mail: &RenderedMail) -> Result<DeliveryReceipt>;
}

/// Establishes verified transport sessions against one endpoint at a time
///
/// The production implementation speaks SMTP via `lettre`; tests script it.
/// Implementations must not retry or fall back internally: ordering of
/// attempts is owned by [`TransportResolver`].
#[async_trait]
pub trait SmtpConnector: Send + Sync {
    /// Establish and verify a session against a single endpoint
    async fn establish(
        &self,
        endpoint: &Endpoint,
        security: SecurityMode,
        config: &MailerConfig,
    ) -> Result<Arc<dyn MailTransport>>;

    /// Resolve the relay hostname to its IPv4 address, bypassing default
    /// address-family selection
    async fn resolve_ipv4(&self, host: &str, port: u16) -> Result<Ipv4Addr>;
}

/// A resolved, verified transport and how it was reached
pub struct ResolvedTransport {
    /// Endpoint actually in use
    pub endpoint: Endpoint,
    /// Negotiated security mode
    pub security: SecurityMode,
    /// Identity the session is authenticated as
    pub identity: String,
    /// The verified sending handle
    transport: Arc<dyn MailTransport>,
}

impl ResolvedTransport {
    /// Perform a single delivery attempt through this handle
    pub async fn send(&self, mail: &RenderedMail) -> Result<DeliveryReceipt> {
        self.transport.send(mail).await
    }
}

impl fmt::Debug for ResolvedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedTransport")
            .field("endpoint", &self.endpoint)
            .field("security", &self.security)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Cached outcome of the single resolution attempt.
///
/// Failures cache the resolution message so later callers get the same
/// typed error without touching the network again.
type CachedOutcome = std::result::Result<Arc<ResolvedTransport>, String>;

/// Process-wide resolver for the outbound mail transport
pub struct TransportResolver {
    config: MailerConfig,
    connector: Arc<dyn SmtpConnector>,
    /// Single-flight cache slot. Holding the lock across the resolution
    /// attempt is what makes construction at-most-once: concurrent callers
    /// suspend here until the outcome is cached.
    slot: Mutex<Option<CachedOutcome>>,
}

impl TransportResolver {
    /// Create a resolver over a connector
    pub fn new(config: MailerConfig, connector: Arc<dyn SmtpConnector>) -> Self {
        Self {
            config,
            connector,
            slot: Mutex::new(None),
        }
    }

    /// Get the verified transport, resolving it on first use.
    ///
    /// The first caller performs the fallback algorithm; everyone else gets
    /// the cached outcome. A cached failure keeps failing until the process
    /// restarts (or [`invalidate`](Self::invalidate) is called explicitly).
    pub async fn resolve(&self) -> Result<Arc<ResolvedTransport>> {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            return match cached {
                Ok(transport) => Ok(Arc::clone(transport)),
                Err(message) => Err(Error::transport_resolution(message.clone())),
            };
        }

        match self.attempt_resolution().await {
            Ok(transport) => {
                *slot = Some(Ok(Arc::clone(&transport)));
                Ok(transport)
            }
            Err(e) => {
                let message = match e {
                    Error::TransportResolution(msg) => msg,
                    other => other.to_string(),
                };
                *slot = Some(Err(message.clone()));
                Err(Error::transport_resolution(message))
            }
        }
    }

    /// The endpoint in use, if resolution has succeeded
    pub async fn endpoint_in_use(&self) -> Option<Endpoint> {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(Ok(transport)) => Some(transport.endpoint.clone()),
            _ => None,
        }
    }

    /// Drop the cached outcome so the next send resolves again.
    ///
    /// Extension point for a future re-resolution policy (rotated
    /// credentials, moved relay). Not called by any production path.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }

    /// Run the ordered fallback algorithm once
    async fn attempt_resolution(&self) -> Result<Arc<ResolvedTransport>> {
        let security = self.config.security_mode();
        if self.config.security_downgraded() {
            warn!(
                port = self.config.port,
                "implicit TLS requested on a non-SMTPS port; downgrading to opportunistic upgrade"
            );
        }

        let hostname = Endpoint::Hostname(self.config.host.clone());
        let first_failure = match self
            .connector
            .establish(&hostname, security, &self.config)
            .await
        {
            Ok(transport) => {
                info!(endpoint = %hostname, security = %security, "mail transport verified");
                return Ok(Arc::new(ResolvedTransport {
                    endpoint: hostname,
                    security,
                    identity: self.config.username.clone(),
                    transport,
                }));
            }
            Err(e) => e,
        };

        warn!(
            host = %self.config.host,
            error = %first_failure,
            "hostname verification failed; retrying against explicit IPv4 address"
        );

        // Second tier. Whatever fails here, DNS lookup included, is the
        // failure that gets surfaced.
        let fallback = async {
            let addr = self
                .connector
                .resolve_ipv4(&self.config.host, self.config.port)
                .await?;
            let endpoint = Endpoint::Ipv4(addr);
            let transport = self
                .connector
                .establish(&endpoint, security, &self.config)
                .await?;
            Ok::<_, Error>((endpoint, transport))
        }
        .await;

        match fallback {
            Ok((endpoint, transport)) => {
                info!(endpoint = %endpoint, security = %security, "mail transport verified via IPv4 fallback");
                Ok(Arc::new(ResolvedTransport {
                    endpoint,
                    security,
                    identity: self.config.username.clone(),
                    transport,
                }))
            }
            Err(second_failure) => Err(Error::transport_resolution(format!(
                "IPv4 fallback for {} failed: {}",
                self.config.host, second_failure
            ))),
        }
    }
}

impl fmt::Debug for TransportResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResolver")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Transport double that records sends
    struct NullTransport;

    #[async_trait]
    impl MailTransport for NullTransport {
        async fn send(&self, mail: &RenderedMail) -> Result<DeliveryReceipt> {
            Ok(DeliveryReceipt {
                message_id: "null".to_string(),
                recipient: mail.to.clone(),
            })
        }
    }

    /// Connector double with scripted outcomes per endpoint kind
    struct ScriptedConnector {
        hostname_ok: bool,
        ipv4_ok: bool,
        dns_ok: bool,
        establish_delay: Duration,
        establish_calls: AtomicUsize,
        resolve_calls: AtomicUsize,
        seen_security: std::sync::Mutex<Vec<SecurityMode>>,
    }

    impl ScriptedConnector {
        fn new(hostname_ok: bool, ipv4_ok: bool, dns_ok: bool) -> Self {
            Self {
                hostname_ok,
                ipv4_ok,
                dns_ok,
                establish_delay: Duration::ZERO,
                establish_calls: AtomicUsize::new(0),
                resolve_calls: AtomicUsize::new(0),
                seen_security: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn establish_calls(&self) -> usize {
            self.establish_calls.load(Ordering::SeqCst)
        }

        fn resolve_calls(&self) -> usize {
            self.resolve_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SmtpConnector for ScriptedConnector {
        async fn establish(
            &self,
            endpoint: &Endpoint,
            security: SecurityMode,
            _config: &MailerConfig,
        ) -> Result<Arc<dyn MailTransport>> {
            self.establish_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_security.lock().unwrap().push(security);
            if !self.establish_delay.is_zero() {
                tokio::time::sleep(self.establish_delay).await;
            }

            let ok = match endpoint {
                Endpoint::Hostname(_) => self.hostname_ok,
                Endpoint::Ipv4(_) => self.ipv4_ok,
            };

            if ok {
                Ok(Arc::new(NullTransport))
            } else {
                Err(Error::transport_resolution(format!(
                    "scripted failure for {}",
                    endpoint
                )))
            }
        }

        async fn resolve_ipv4(&self, host: &str, _port: u16) -> Result<Ipv4Addr> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            if self.dns_ok {
                Ok(Ipv4Addr::new(192, 0, 2, 25))
            } else {
                Err(Error::transport_resolution(format!(
                    "no IPv4 address found for {}",
                    host
                )))
            }
        }
    }

    fn config() -> MailerConfig {
        MailerConfig {
            host: "mail.example.com".to_string(),
            port: 587,
            username: "office@example.com".to_string(),
            password: "secret".to_string(),
            sender: "office@example.com".to_string(),
            sender_name: String::new(),
            copy_address: None,
            implicit_tls: false,
            connect_timeout_secs: 30,
            greeting_timeout_secs: 30,
            io_timeout_secs: 30,
        }
    }

    fn resolver_with(connector: Arc<ScriptedConnector>) -> TransportResolver {
        TransportResolver::new(config(), connector)
    }

    #[tokio::test]
    async fn hostname_success_skips_fallback() {
        let connector = Arc::new(ScriptedConnector::new(true, true, true));
        let resolver = resolver_with(Arc::clone(&connector));

        let transport = resolver.resolve().await.unwrap();
        assert_eq!(
            transport.endpoint,
            Endpoint::Hostname("mail.example.com".to_string())
        );
        assert_eq!(connector.establish_calls(), 1);
        assert_eq!(connector.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn hostname_failure_falls_back_to_ipv4_literal() {
        let connector = Arc::new(ScriptedConnector::new(false, true, true));
        let resolver = resolver_with(Arc::clone(&connector));

        let transport = resolver.resolve().await.unwrap();
        assert_eq!(transport.endpoint, Endpoint::Ipv4(Ipv4Addr::new(192, 0, 2, 25)));
        assert_eq!(connector.establish_calls(), 2);
        assert_eq!(connector.resolve_calls(), 1);

        // Subsequent calls reuse the literal without re-resolving
        let again = resolver.resolve().await.unwrap();
        assert_eq!(again.endpoint, transport.endpoint);
        assert_eq!(connector.establish_calls(), 2);
        assert_eq!(connector.resolve_calls(), 1);
        assert_eq!(resolver.endpoint_in_use().await, Some(transport.endpoint.clone()));
    }

    #[tokio::test]
    async fn both_tiers_failing_surfaces_the_second_failure() {
        let connector = Arc::new(ScriptedConnector::new(false, false, true));
        let resolver = resolver_with(Arc::clone(&connector));

        let err = resolver.resolve().await.unwrap_err();
        match &err {
            Error::TransportResolution(message) => {
                assert!(
                    message.contains("192.0.2.25"),
                    "expected the IPv4-tier failure, got: {}",
                    message
                );
            }
            other => panic!("expected transport resolution error, got {:?}", other),
        }

        // Failure is cached: no further network attempts
        let again = resolver.resolve().await.unwrap_err();
        assert!(matches!(again, Error::TransportResolution(_)));
        assert_eq!(connector.establish_calls(), 2);
        assert_eq!(connector.resolve_calls(), 1);
        assert_eq!(resolver.endpoint_in_use().await, None);
    }

    #[tokio::test]
    async fn dns_failure_is_the_surfaced_second_failure() {
        let connector = Arc::new(ScriptedConnector::new(false, true, false));
        let resolver = resolver_with(Arc::clone(&connector));

        let err = resolver.resolve().await.unwrap_err();
        match err {
            Error::TransportResolution(message) => {
                assert!(message.contains("no IPv4 address"));
            }
            other => panic!("expected transport resolution error, got {:?}", other),
        }
        // The IPv4 establish never ran; DNS was the second failure
        assert_eq!(connector.establish_calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_resolution() {
        let mut connector = ScriptedConnector::new(true, true, true);
        connector.establish_delay = Duration::from_millis(50);
        let connector = Arc::new(connector);
        let resolver = Arc::new(resolver_with(Arc::clone(&connector)));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.resolve().await.map(|t| t.endpoint.clone()) })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(connector.establish_calls(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_resolution() {
        let connector = Arc::new(ScriptedConnector::new(true, true, true));
        let resolver = resolver_with(Arc::clone(&connector));

        resolver.resolve().await.unwrap();
        assert_eq!(connector.establish_calls(), 1);

        resolver.invalidate().await;
        assert_eq!(resolver.endpoint_in_use().await, None);

        resolver.resolve().await.unwrap();
        assert_eq!(connector.establish_calls(), 2);
    }

    #[tokio::test]
    async fn implicit_request_on_starttls_port_is_downgraded() {
        let connector = Arc::new(ScriptedConnector::new(true, true, true));
        let mut cfg = config();
        cfg.port = 587;
        cfg.implicit_tls = true;
        let resolver = TransportResolver::new(cfg, connector.clone());

        let transport = resolver.resolve().await.unwrap();
        assert_eq!(transport.security, SecurityMode::Opportunistic);
        assert_eq!(
            connector.seen_security.lock().unwrap().as_slice(),
            &[SecurityMode::Opportunistic]
        );
    }

    #[tokio::test]
    async fn smtps_port_uses_implicit_tls() {
        let connector = Arc::new(ScriptedConnector::new(true, true, true));
        let mut cfg = config();
        cfg.port = 465;
        cfg.implicit_tls = true;
        let resolver = TransportResolver::new(cfg, connector.clone());

        let transport = resolver.resolve().await.unwrap();
        assert_eq!(transport.security, SecurityMode::Implicit);
    }
}
