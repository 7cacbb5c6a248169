//! Application configuration loaded from environment variables.

use event_log::Topic;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `ORDERS_TOPIC` / `STOCK_TOPIC` / `PAYMENTS_TOPIC` — event log topics
/// - `DATABASE_URL` — if set, stored events go to PostgreSQL
/// - `INVENTORY_URL` / `PAYMENT_URL` / `ORDERS_URL` — if all set, the saga
///   engine calls real downstream services instead of in-memory ones
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub orders_topic: String,
    pub stock_topic: String,
    pub payments_topic: String,
    pub database_url: Option<String>,
    pub inventory_url: Option<String>,
    pub payment_url: Option<String>,
    pub orders_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            orders_topic: std::env::var("ORDERS_TOPIC")
                .unwrap_or_else(|_| "orders-events".to_string()),
            stock_topic: std::env::var("STOCK_TOPIC")
                .unwrap_or_else(|_| "stock-events".to_string()),
            payments_topic: std::env::var("PAYMENTS_TOPIC")
                .unwrap_or_else(|_| "payments-events".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            inventory_url: std::env::var("INVENTORY_URL").ok(),
            payment_url: std::env::var("PAYMENT_URL").ok(),
            orders_url: std::env::var("ORDERS_URL").ok(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn orders_topic(&self) -> Topic {
        Topic::new(self.orders_topic.clone())
    }

    pub fn stock_topic(&self) -> Topic {
        Topic::new(self.stock_topic.clone())
    }

    pub fn payments_topic(&self) -> Topic {
        Topic::new(self.payments_topic.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            orders_topic: "orders-events".to_string(),
            stock_topic: "stock-events".to_string(),
            payments_topic: "payments-events".to_string(),
            database_url: None,
            inventory_url: None,
            payment_url: None,
            orders_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.orders_topic().as_str(), "orders-events");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
