use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Stats use Postgres when set, an in-memory repository otherwise
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Expiry applied to every room-scoped key
    pub room_ttl: Duration,
    pub room_queue_capacity: usize,
    pub player_queue_capacity: usize,
    /// How long a room broadcast waits on a full queue before dropping
    pub broadcast_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            room_ttl: Duration::from_secs(3600),
            room_queue_capacity: 16,
            player_queue_capacity: 16,
            broadcast_timeout: Duration::from_millis(100),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source; unparsable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the development secret");
            defaults.jwt_secret.clone()
        });

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: lookup("DB_URL").filter(|url| !url.trim().is_empty()),
            jwt_secret,
            room_ttl: Duration::from_secs(parse_or(
                &lookup,
                "ROOM_TTL_SECS",
                defaults.room_ttl.as_secs(),
            )),
            room_queue_capacity: positive_or(
                parse_or(&lookup, "ROOM_QUEUE_CAPACITY", defaults.room_queue_capacity),
                "ROOM_QUEUE_CAPACITY",
                defaults.room_queue_capacity,
            ),
            player_queue_capacity: positive_or(
                parse_or(
                    &lookup,
                    "PLAYER_QUEUE_CAPACITY",
                    defaults.player_queue_capacity,
                ),
                "PLAYER_QUEUE_CAPACITY",
                defaults.player_queue_capacity,
            ),
            broadcast_timeout: Duration::from_millis(parse_or(
                &lookup,
                "BROADCAST_TIMEOUT_MS",
                defaults.broadcast_timeout.as_millis() as u64,
            )),
        }
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

// Zero-capacity channels are rejected by tokio
fn positive_or(value: usize, name: &str, default: usize) -> usize {
    if value == 0 {
        warn!(variable = name, "Capacity must be positive, using default");
        default
    } else {
        value
    }
}
