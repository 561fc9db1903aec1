//! HMAC Auth Server - demo host for HMAC request authentication.
//!
//! Every request must carry `Date`, `Nonce` and `Authorization: HMAC <id>:<sig>`
//! headers signed with the identity's secret. Authenticated requests are
//! answered by an echo handler that reports the verified identity.
//!
//! # Usage
//!
//! ```text
//! HMAC_CREDENTIALS=acct-1=s3cr3t hmac-auth-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HMAC_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `HMAC_CREDENTIALS` | *(empty)* | `id=secret` pairs, comma separated |
//! | `HMAC_ROLES` | *(empty)* | `id=role1\|role2` pairs, comma separated |
//! | `HMAC_ALLOWED_DRIFT_SECS` | `300` | Allowed `Date` skew in seconds |
//! | `HMAC_REQUIRE_AUTH` | `true` | Reject requests without HMAC credentials |
//! | `HMAC_PURGE_INTERVAL_SECS` | `60` | Replay cache sweep interval |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod config;
mod handler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use hmac_auth::{
    AuthenticationOptions, MemoryNonceCache, RoleResolver, SchemeRegistry, StaticSecretLookup,
};
use hmac_auth_http::{AuthHttpConfig, AuthHttpService};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::handler::EchoHandler;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the scheme options from the server config.
fn build_options(config: &ServerConfig) -> Result<AuthenticationOptions> {
    let drift = TimeDelta::try_seconds(config.allowed_drift_secs).with_context(|| {
        format!(
            "invalid HMAC_ALLOWED_DRIFT_SECS: {} is out of range",
            config.allowed_drift_secs
        )
    })?;
    let options = AuthenticationOptions::default().with_allowed_drift(drift);

    if config.roles.is_empty() {
        return Ok(options);
    }

    let roles = Arc::new(config.roles.clone());
    let resolver: RoleResolver = Arc::new(move |id: &str| roles.get(id).cloned());
    Ok(options.with_role_resolver(resolver))
}

/// Periodically drop expired nonces so idle entries do not accumulate.
fn spawn_purge_task(cache: Arc<MemoryNonceCache>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                debug!(removed, remaining = cache.len(), "purged expired nonces");
            }
        }
    });
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: AuthHttpService<EchoHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_level)?;

    if config.credentials.is_empty() {
        warn!("HMAC_CREDENTIALS is empty, every signed request will fail with invalid id");
    }

    let lookup = Arc::new(StaticSecretLookup::new(config.credentials.clone()));
    let nonces = Arc::new(MemoryNonceCache::new());
    let options = build_options(&config)?;
    info!(
        allowed_drift = %options.allowed_drift(),
        replay_ttl = %options.replay_ttl(),
        identities = lookup.len(),
        "initializing HMAC authentication",
    );

    let registry = SchemeRegistry::with_hmac(options, lookup, nonces.clone());
    spawn_purge_task(nonces, Duration::from_secs(config.purge_interval_secs.max(1)));

    let service = AuthHttpService::new(
        Arc::new(EchoHandler),
        registry,
        AuthHttpConfig {
            require_authentication: config.require_auth,
            ..AuthHttpConfig::default()
        },
    );

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        config = %serde_json::to_string(&config).unwrap_or_default(),
        version = VERSION,
        "starting HMAC Auth Server",
    );

    serve(listener, service).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_should_build_options_from_config() {
        let config = ServerConfig {
            allowed_drift_secs: 120,
            ..ServerConfig::default()
        };
        let options = build_options(&config).unwrap();
        assert_eq!(options.allowed_drift(), TimeDelta::minutes(2));
        assert_eq!(options.replay_ttl(), TimeDelta::minutes(4));
        assert_eq!(options.roles_for("anyone"), None);
    }

    #[test]
    fn test_should_resolve_configured_roles() {
        let config = ServerConfig {
            roles: BTreeMap::from([("acct-1".to_owned(), vec!["admin".to_owned()])]),
            ..ServerConfig::default()
        };
        let options = build_options(&config).unwrap();
        assert_eq!(options.roles_for("acct-1"), Some(vec!["admin".to_owned()]));
        assert_eq!(options.roles_for("acct-2"), None);
    }

    #[test]
    fn test_should_reject_out_of_range_drift() {
        for secs in [i64::MAX, i64::MIN] {
            let config = ServerConfig {
                allowed_drift_secs: secs,
                ..ServerConfig::default()
            };
            let err = build_options(&config).unwrap_err();
            assert!(err.to_string().contains("HMAC_ALLOWED_DRIFT_SECS"));
        }
    }
}
