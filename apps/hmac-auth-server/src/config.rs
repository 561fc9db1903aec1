//! Server configuration.
//!
//! All configuration is driven by environment variables.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};

/// Configuration for the demo server.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Bind address.
    pub listen: String,
    /// Log level.
    pub log_level: String,
    /// Allowed clock drift in seconds.
    pub allowed_drift_secs: i64,
    /// Reject requests that carry no HMAC credentials.
    pub require_auth: bool,
    /// Identity id to secret.
    #[serde(skip_serializing)]
    pub credentials: BTreeMap<String, String>,
    /// Identity id to roles.
    pub roles: BTreeMap<String, Vec<String>>,
    /// Seconds between replay cache sweeps.
    pub purge_interval_secs: u64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen", &self.listen)
            .field("log_level", &self.log_level)
            .field("allowed_drift_secs", &self.allowed_drift_secs)
            .field("require_auth", &self.require_auth)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .field("roles", &self.roles)
            .field("purge_interval_secs", &self.purge_interval_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            allowed_drift_secs: 300,
            require_auth: true,
            credentials: BTreeMap::new(),
            roles: BTreeMap::new(),
            purge_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or a credential
    /// or role list is malformed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("HMAC_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("HMAC_ALLOWED_DRIFT_SECS") {
            config.allowed_drift_secs = v
                .trim()
                .parse()
                .with_context(|| format!("invalid HMAC_ALLOWED_DRIFT_SECS: {v}"))?;
        }
        if let Ok(v) = std::env::var("HMAC_REQUIRE_AUTH") {
            config.require_auth = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("HMAC_CREDENTIALS") {
            config.credentials = parse_credentials(&v).context("invalid HMAC_CREDENTIALS")?;
        }
        if let Ok(v) = std::env::var("HMAC_ROLES") {
            config.roles = parse_roles(&v).context("invalid HMAC_ROLES")?;
        }
        if let Ok(v) = std::env::var("HMAC_PURGE_INTERVAL_SECS") {
            config.purge_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("invalid HMAC_PURGE_INTERVAL_SECS: {v}"))?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Split `key=value,key=value`, skipping blank entries.
fn parse_pairs(raw: &str) -> Result<Vec<(&str, &str)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
            _ => bail!("expected key=value, got {entry:?}"),
        })
        .collect()
}

/// Parse `id=secret,id2=secret2`.
fn parse_credentials(raw: &str) -> Result<BTreeMap<String, String>> {
    parse_pairs(raw)?
        .into_iter()
        .map(|(id, secret)| {
            if secret.is_empty() {
                bail!("empty secret for {id:?}");
            }
            if id.contains([' ', ':']) {
                bail!("identity id {id:?} must not contain spaces or colons");
            }
            Ok((id.to_owned(), secret.to_owned()))
        })
        .collect()
}

/// Parse `id=role1|role2,id2=role3`.
fn parse_roles(raw: &str) -> Result<BTreeMap<String, Vec<String>>> {
    Ok(parse_pairs(raw)?
        .into_iter()
        .map(|(id, roles)| {
            let roles = roles
                .split('|')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_owned)
                .collect();
            (id.to_owned(), roles)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.allowed_drift_secs, 300);
        assert!(config.require_auth);
        assert!(config.credentials.is_empty());
    }

    #[test]
    fn test_should_parse_credentials() {
        let creds = parse_credentials(" acct-1=s3cr3t , svc=k=v,").unwrap();
        assert_eq!(creds.len(), 2);
        assert_eq!(creds["acct-1"], "s3cr3t");
        assert_eq!(creds["svc"], "k=v");
    }

    #[test]
    fn test_should_reject_malformed_credentials() {
        assert!(parse_credentials("acct-1").is_err());
        assert!(parse_credentials("=secret").is_err());
        assert!(parse_credentials("acct-1=").is_err());
        assert!(parse_credentials("a:b=secret").is_err());
    }

    #[test]
    fn test_should_parse_roles() {
        let roles = parse_roles("admin=read|write,guest=").unwrap();
        assert_eq!(roles["admin"], vec!["read", "write"]);
        assert!(roles["guest"].is_empty());
    }

    #[test]
    fn test_should_parse_bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("no"));
    }

    #[test]
    fn test_should_not_serialize_secrets() {
        let mut config = ServerConfig::default();
        config
            .credentials
            .insert("acct-1".to_owned(), "s3cr3t".to_owned());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("s3cr3t"));
        assert!(!format!("{config:?}").contains("s3cr3t"));
    }
}
