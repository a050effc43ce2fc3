use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("Unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub session_ready_timeout_secs: u64,
    pub clinic_name: String,
    pub clinic_utc_offset_minutes: i32,
    pub server_port: u16,
    pub store_backend: StoreBackend,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            session_ready_timeout_secs: 10,
            clinic_name: "MedVault Clinic".to_string(),
            clinic_utc_offset_minutes: 0,
            server_port: 3000,
            store_backend: StoreBackend::Supabase,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            session_ready_timeout_secs: parse_or("SESSION_READY_TIMEOUT_SECS", defaults.session_ready_timeout_secs),
            clinic_name: env::var("CLINIC_NAME")
                .unwrap_or(defaults.clinic_name),
            clinic_utc_offset_minutes: parse_or("CLINIC_UTC_OFFSET_MINUTES", defaults.clinic_utc_offset_minutes),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
            store_backend: parse_or("STORE_BACKEND", defaults.store_backend),
        };

        if !config.is_configured() && config.store_backend == StoreBackend::Supabase {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn session_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.session_ready_timeout_secs)
    }

    /// Offset used for "today" and "this month" when a caller sends none.
    pub fn clinic_offset(&self) -> FixedOffset {
        offset_from_minutes(self.clinic_utc_offset_minutes)
    }
}

/// Out-of-range offsets fall back to UTC.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60))
        .unwrap_or_else(|| {
            warn!("UTC offset of {} minutes is out of range, using UTC", minutes);
            Utc.fix()
        })
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value ({}), using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
