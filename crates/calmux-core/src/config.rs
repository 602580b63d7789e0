use anyhow::Result;
use config::Config;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub feeds: FeedConfig,
    pub calendar: CalendarConfig,
    pub directory: DirectoryConfig,
    pub booking: Option<BookingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Bounds applied to every remote feed fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Maximum payload size in bytes, declared or observed.
    pub max_bytes: u64,
    /// Overall per-source fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Cap on concurrently in-flight source fetches per request.
    pub max_concurrent_fetches: usize,
}

/// Metadata stamped into the merged envelope prolog.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// JSON file with users, groups, and access keys.
    pub users_file: String,
    /// Directory holding the static per-group `.ics` documents.
    pub ics_dir: String,
}

/// Third-party booking service the personal/global booking feeds proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub api_url: String,
    pub api_key: String,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8611)?
            .set_default("logging.level", "debug")?
            .set_default("feeds.max_bytes", 10 * 1024 * 1024)?
            .set_default("feeds.fetch_timeout_secs", 10)?
            .set_default("feeds.max_concurrent_fetches", 8)?
            .set_default("calendar.name", "Calmux aggregate")?
            .set_default("calendar.description", "Generated by Calmux")?
            .set_default("directory.users_file", "directory.json")?
            .set_default("directory.ics_dir", "ics")?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_a_complete_settings() {
        let settings = Settings::load().expect("default settings should load");

        assert_eq!(settings.feeds.max_bytes, 10 * 1024 * 1024);
        assert_eq!(settings.feeds.fetch_timeout_secs, 10);
        assert_eq!(settings.feeds.max_concurrent_fetches, 8);
        assert!(settings.booking.is_none());
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8611,
        };
        assert_eq!(server.bind_addr(), "127.0.0.1:8611");
    }
}
