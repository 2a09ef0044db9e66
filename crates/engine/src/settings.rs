//! Environment-driven configuration.

use std::path::PathBuf;

use chrono::Duration;
use zonewarden_domain::CycleConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Bind address for the inbound notification routes.
    pub server_host: String,
    pub server_port: u16,
    /// Game-client bridge host and per-identity ports.
    pub bridge_host: String,
    pub bridge_port: u16,
    pub scanner_bridge_port: u16,
    /// Directory holding the two state documents.
    pub data_dir: PathBuf,
    /// The group this deployment serves (roster lookups).
    pub home_group: String,
    pub cooldown_hours: i64,
    pub attack_window_minutes: i64,
    pub scanner_enabled: bool,
    pub drift_tolerance_minutes: i64,
    pub walker_max_pages: usize,
    /// Minute marks announced during a war.
    pub war_countdown_minutes: Vec<u64>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            server_host: env_or("SERVER_HOST", "0.0.0.0"),
            server_port: parse_env_or("SERVER_PORT", 3000),
            bridge_host: env_or("BRIDGE_HOST", "127.0.0.1"),
            bridge_port: parse_env_or("BRIDGE_PORT", 8080),
            scanner_bridge_port: parse_env_or("SCANNER_BRIDGE_PORT", 8081),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            home_group: env_or("HOME_GROUP", ""),
            cooldown_hours: parse_env_or("ZONE_COOLDOWN_HOURS", 6),
            attack_window_minutes: parse_env_or("ZONE_ATTACK_WINDOW_MINUTES", 60),
            scanner_enabled: parse_env_or("SCANNER_ENABLED", true),
            drift_tolerance_minutes: parse_env_or("SCANNER_DRIFT_TOLERANCE_MINUTES", 3),
            walker_max_pages: parse_env_or("DIALOG_MAX_PAGES", 10),
            war_countdown_minutes: list_env_or("WAR_COUNTDOWN_MINUTES", &[5, 10, 15]),
        }
    }

    pub fn cycle(&self) -> CycleConfig {
        CycleConfig::new(
            Duration::hours(self.cooldown_hours),
            Duration::minutes(self.attack_window_minutes),
        )
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn bridge_url(&self) -> String {
        format!("http://{}:{}/", self.bridge_host, self.bridge_port)
    }

    pub fn scanner_bridge_url(&self) -> String {
        format!("http://{}:{}/", self.bridge_host, self.scanner_bridge_port)
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("zones.json")
    }

    pub fn positions_path(&self) -> PathBuf {
        self.data_dir.join("zone_positions.json")
    }

    pub fn drift_tolerance(&self) -> Duration {
        Duration::minutes(self.drift_tolerance_minutes)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn list_env_or(key: &str, default: &[u64]) -> Vec<u64> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect()
        })
        .unwrap_or_else(|| default.to_vec())
}
