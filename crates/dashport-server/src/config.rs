//! Server configuration, read once from the environment at startup.

use std::net::SocketAddr;

use dashport_access::{AccessConfig, GoTrueConfig, MembershipPolicy};
use dashport_db::DbConfig;
use dashport_embed::{EmbedConfig, MetabaseConfig, PowerBiConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub access: AccessConfig,
    pub identity: GoTrueConfig,
    pub embed: EmbedConfig,
}

/// Reads variables through `lookup`, treating blank values as unset.
struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.get(var).ok_or(ConfigError::Missing(var))
    }

    fn parsed<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(var) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };
        let db_defaults = DbConfig::default();
        let access_defaults = AccessConfig::default();

        let bind_addr = env.parsed("DASHPORT_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let db = DbConfig {
            url: env.or("DASHPORT_DB_URL", &db_defaults.url),
            namespace: env.or("DASHPORT_DB_NAMESPACE", &db_defaults.namespace),
            database: env.or("DASHPORT_DB_DATABASE", &db_defaults.database),
            username: env.or("DASHPORT_DB_USERNAME", &db_defaults.username),
            password: env.or("DASHPORT_DB_PASSWORD", &db_defaults.password),
        };

        let invitation_ttl_days = env.parsed("DASHPORT_INVITATION_TTL_DAYS", 7_i64)?;
        if invitation_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                var: "DASHPORT_INVITATION_TTL_DAYS",
                message: "must be positive".into(),
            });
        }
        let membership_policy = if env.parsed("DASHPORT_STRICT_MEMBERSHIP", false)? {
            MembershipPolicy::Required
        } else {
            MembershipPolicy::BestEffort
        };
        let access = AccessConfig {
            site_url: env.or("DASHPORT_SITE_URL", &access_defaults.site_url),
            invitation_ttl_days,
            membership_policy,
        };

        let identity = GoTrueConfig {
            url: env.required("IDENTITY_URL")?,
            anon_key: env.required("IDENTITY_ANON_KEY")?,
            service_key: env.required("IDENTITY_SERVICE_KEY")?,
        };

        // Each BI backend is enabled only when all of its settings are present.
        let powerbi = match (
            env.get("POWERBI_TENANT_ID"),
            env.get("POWERBI_CLIENT_ID"),
            env.get("POWERBI_CLIENT_SECRET"),
        ) {
            (Some(tenant), Some(client), Some(secret)) => {
                Some(PowerBiConfig::new(tenant, client, secret))
            }
            _ => None,
        };
        let metabase = match (env.get("METABASE_SITE_URL"), env.get("METABASE_SECRET_KEY")) {
            (Some(site_url), Some(secret_key)) => Some(MetabaseConfig {
                site_url,
                secret_key,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            db,
            access,
            identity,
            embed: EmbedConfig { powerbi, metabase },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| map.get(var).cloned())
    }

    const IDENTITY: [(&str, &str); 3] = [
        ("IDENTITY_URL", "https://id.example.com"),
        ("IDENTITY_ANON_KEY", "anon"),
        ("IDENTITY_SERVICE_KEY", "service"),
    ];

    #[test]
    fn defaults_apply_when_only_identity_is_set() {
        let config = load(&IDENTITY).unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.db.namespace, "dashport");
        assert_eq!(config.access.invitation_ttl_days, 7);
        assert_eq!(config.access.membership_policy, MembershipPolicy::BestEffort);
        assert!(config.embed.powerbi.is_none());
        assert!(config.embed.metabase.is_none());
    }

    #[test]
    fn identity_settings_are_required() {
        let err = load(&IDENTITY[..2]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("IDENTITY_SERVICE_KEY")));
    }

    #[test]
    fn partial_backend_settings_leave_it_disabled() {
        let mut vars = IDENTITY.to_vec();
        vars.extend([
            ("POWERBI_TENANT_ID", "t"),
            ("POWERBI_CLIENT_ID", "c"),
            ("METABASE_SITE_URL", "https://mb.example.com"),
            ("METABASE_SECRET_KEY", "k"),
        ]);
        let config = load(&vars).unwrap();
        assert!(config.embed.powerbi.is_none());
        assert_eq!(
            config.embed.metabase.map(|m| m.site_url).as_deref(),
            Some("https://mb.example.com")
        );
    }

    #[test]
    fn strict_membership_and_ttl_are_parsed() {
        let mut vars = IDENTITY.to_vec();
        vars.extend([
            ("DASHPORT_STRICT_MEMBERSHIP", "true"),
            ("DASHPORT_INVITATION_TTL_DAYS", "14"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.access.membership_policy, MembershipPolicy::Required);
        assert_eq!(config.access.invitation_ttl_days, 14);

        let mut vars = IDENTITY.to_vec();
        vars.push(("DASHPORT_INVITATION_TTL_DAYS", "soon"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: "DASHPORT_INVITATION_TTL_DAYS", .. })
        ));
    }
}
