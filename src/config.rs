//! Configuration management

use anyhow::{self, Context, Result};
use chrono::NaiveTime;

use crate::defaults::{
    default_delivery_end, default_delivery_start, DEFAULT_ACTIVITY_TYPE, DEFAULT_DISTANCE_UNIT,
    DEFAULT_STOP_DELAY_MINUTES,
};
use crate::services::routing::DEFAULT_DIRECTIONS_BASE_URL;
use crate::types::DeliverySettings;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Directions / maps API key (route planning is unavailable without it)
    pub directions_api_key: Option<String>,

    /// Directions provider base URL
    pub directions_base_url: String,

    /// Directions request timeout in seconds
    pub directions_timeout_seconds: u64,

    pub delivery: DeliverySettings,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, value, e)),
        _ => Ok(default),
    }
}

fn env_time(name: &str, default: NaiveTime) -> Result<NaiveTime> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
            .with_context(|| format!("{} must be HH:MM, got {:?}", name, value)),
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let directions_api_key = std::env::var("DIRECTIONS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let directions_base_url = std::env::var("DIRECTIONS_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_DIRECTIONS_BASE_URL.to_string());

        let directions_timeout_seconds = env_or("DIRECTIONS_TIMEOUT_SECONDS", 30u64)?;

        let delivery_start_time = env_time("DELIVERY_START_TIME", default_delivery_start())?;
        let delivery_end_time = env_time("DELIVERY_END_TIME", default_delivery_end())?;
        if delivery_end_time <= delivery_start_time {
            anyhow::bail!(
                "DELIVERY_END_TIME ({}) must be after DELIVERY_START_TIME ({})",
                delivery_end_time,
                delivery_start_time
            );
        }

        let stop_delay_minutes = env_or("STOP_DELAY_MINUTES", DEFAULT_STOP_DELAY_MINUTES)?;
        if stop_delay_minutes < 0 {
            anyhow::bail!("STOP_DELAY_MINUTES must not be negative (got {})", stop_delay_minutes);
        }

        let default_activity_type = match std::env::var("DEFAULT_ACTIVITY_TYPE") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value),
            Err(_) => Some(DEFAULT_ACTIVITY_TYPE.to_string()),
        };

        let delivery = DeliverySettings {
            stop_delay_minutes,
            default_distance_unit: env_or("DEFAULT_DISTANCE_UNIT", DEFAULT_DISTANCE_UNIT.to_string())?,
            optimize_default: env_or("OPTIMIZE_DEFAULT", false)?,
            default_activity_type,
            delivery_start_time,
            delivery_end_time,
            maps_enabled: env_or("MAPS_ENABLED", false)?,
        };

        if delivery.maps_enabled && directions_api_key.is_none() {
            tracing::warn!("MAPS_ENABLED is set but DIRECTIONS_API_KEY is missing; no map embeds will be generated");
        }

        Ok(Self {
            nats_url,
            database_url,
            directions_api_key,
            directions_base_url,
            directions_timeout_seconds,
            delivery,
        })
    }

    /// API key for map embeds, only when maps are enabled
    pub fn map_embed_key(&self) -> Option<&str> {
        if self.delivery.maps_enabled {
            self.directions_api_key.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_defaults() {
        for name in [
            "DIRECTIONS_API_KEY",
            "DIRECTIONS_BASE_URL",
            "STOP_DELAY_MINUTES",
            "DEFAULT_DISTANCE_UNIT",
            "DELIVERY_START_TIME",
            "DELIVERY_END_TIME",
            "MAPS_ENABLED",
        ] {
            std::env::remove_var(name);
        }
        std::env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();
        assert!(config.directions_api_key.is_none());
        assert_eq!(config.directions_base_url, DEFAULT_DIRECTIONS_BASE_URL);
        assert_eq!(config.delivery.stop_delay_minutes, 0);
        assert_eq!(config.delivery.default_distance_unit, "Meter");
        assert!(config.map_embed_key().is_none());
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_reads_delivery_settings() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("STOP_DELAY_MINUTES", "10");
        std::env::set_var("DEFAULT_DISTANCE_UNIT", "Kilometer");
        std::env::set_var("DELIVERY_START_TIME", "07:30");
        std::env::set_var("DIRECTIONS_API_KEY", "k3y");
        std::env::set_var("MAPS_ENABLED", "true");

        let config = Config::from_env().unwrap();
        assert_eq!(config.delivery.stop_delay_minutes, 10);
        assert_eq!(config.delivery.default_distance_unit, "Kilometer");
        assert_eq!(config.delivery.delivery_start_time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(config.map_embed_key(), Some("k3y"));

        for name in ["STOP_DELAY_MINUTES", "DEFAULT_DISTANCE_UNIT", "DELIVERY_START_TIME", "DIRECTIONS_API_KEY", "MAPS_ENABLED"] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_env_or_rejects_garbage() {
        std::env::set_var("TRIP_WORKER_TEST_BAD_NUMBER", "ten");
        assert!(env_or("TRIP_WORKER_TEST_BAD_NUMBER", 0i64).is_err());
        std::env::remove_var("TRIP_WORKER_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_env_or_uses_default_when_unset() {
        std::env::remove_var("TRIP_WORKER_TEST_UNSET");
        assert_eq!(env_or("TRIP_WORKER_TEST_UNSET", 42u64).unwrap(), 42);
    }

    #[test]
    fn test_env_time_accepts_seconds() {
        std::env::set_var("TRIP_WORKER_TEST_TIME", "18:15:30");
        assert_eq!(
            env_time("TRIP_WORKER_TEST_TIME", default_delivery_end()).unwrap(),
            NaiveTime::from_hms_opt(18, 15, 30).unwrap()
        );
        std::env::remove_var("TRIP_WORKER_TEST_TIME");
    }
}
