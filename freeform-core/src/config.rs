//! Connection configuration.
//!
//! Drivers that talk to an external store take their settings from a
//! [`ConnectionConfig`]. The defaults mirror the usual local setup: localhost
//! on the conventional port, with the database named after the login user.

use bson::Document;
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, MapperResult};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 27017;

/// Settings for reaching a document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
    database: String,
    username: Option<String>,
    password: Option<String>,
    /// Driver-specific options passed through untouched.
    options: Document,
}

impl ConnectionConfig {
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// The fallback database name: the login user from `$USER`, or
    /// `"freeform"` when the environment gives nothing usable.
    pub fn default_database() -> String {
        std::env::var("USER")
            .ok()
            .filter(|user| !user.is_empty())
            .unwrap_or_else(|| "freeform".to_string())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn options(&self) -> &Document {
        &self.options
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: Self::default_database(),
            username: None,
            password: None,
            options: Document::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    options: Document,
}

impl ConnectionConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<bson::Bson>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> MapperResult<ConnectionConfig> {
        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.is_empty() {
            return Err(MapperError::Connection("host must not be empty".to_string()));
        }
        let database = self
            .database
            .unwrap_or_else(ConnectionConfig::default_database);
        if database.is_empty() {
            return Err(MapperError::Connection(
                "database name must not be empty".to_string(),
            ));
        }

        Ok(ConnectionConfig {
            host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            database,
            username: self.username,
            password: self.password,
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_in_defaults() {
        let config = ConnectionConfig::builder().build().unwrap();

        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.database(), ConnectionConfig::default_database());
        assert_eq!(config.username(), None);
    }

    #[test]
    fn builder_rejects_empty_names() {
        assert!(matches!(
            ConnectionConfig::builder().host("").build(),
            Err(MapperError::Connection(_))
        ));
        assert!(matches!(
            ConnectionConfig::builder().database("").build(),
            Err(MapperError::Connection(_))
        ));
    }

    #[test]
    fn builder_carries_credentials_and_options() {
        let config = ConnectionConfig::builder()
            .host("db.internal")
            .port(27018)
            .database("staging")
            .credentials("app", "hunter2")
            .option("replica_set", "rs0")
            .build()
            .unwrap();

        assert_eq!(config.host(), "db.internal");
        assert_eq!(config.port(), 27018);
        assert_eq!(config.database(), "staging");
        assert_eq!(config.username(), Some("app"));
        assert_eq!(config.password(), Some("hunter2"));
        assert_eq!(
            config.options().get("replica_set"),
            Some(&bson::Bson::String("rs0".to_string()))
        );
    }
}
