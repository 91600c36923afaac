use std::net::SocketAddr;
use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumString};
use tracing::warn;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_EXPIRATION_DAYS: i64 = 7;
const DEFAULT_HISTORY_LIMIT: usize = 50;
const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;
const DEFAULT_SECRET: &str = "your-secret-key-change-in-production";

/// Who receives a `userStatusChange` when a user goes online or offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PresenceScope {
    /// Every live connection, O(connections) per transition
    #[default]
    Global,
    /// Only connections subscribed to a room the subject is subscribed to
    SharedRooms,
}

/// Process configuration, read once from the environment at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub token_expiration_days: i64,
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub presence_scope: PresenceScope,
    pub history_limit: usize,
    /// bcrypt work factor for stored password hashes
    pub password_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests don't touch the process env
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, falling back to the development secret");
            DEFAULT_SECRET.to_string()
        });

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            jwt_secret,
            token_expiration_days: parse_or(
                &lookup,
                "TOKEN_EXPIRATION_DAYS",
                DEFAULT_EXPIRATION_DAYS,
            ),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            cors_origins,
            presence_scope: parse_or(&lookup, "PRESENCE_SCOPE", PresenceScope::Global),
            history_limit: parse_or(&lookup, "HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
            password_cost: parse_or(&lookup, "PASSWORD_HASH_COST", DEFAULT_PASSWORD_COST),
        }
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "Ignoring unparsable config value");
            default
        }),
        None => default,
    }
}
