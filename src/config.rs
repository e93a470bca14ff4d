//! Engine configuration
//!
//! Hosts persist this as JSON (camelCase) alongside their own settings.
//! Every field has a default so an empty object deserializes to a working
//! config; `validate` rejects values the engine cannot run with.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tuning knobs for one engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// IANA timezone name used for all local-day math.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Seconds between notification scanner ticks.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Width of the due-soon notification window, in hours.
    #[serde(default = "default_notification_window_hours")]
    pub notification_window_hours: u32,
    /// Page size for filtered list views.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_scan_interval_secs() -> u64 {
    30
}

fn default_notification_window_hours() -> u32 {
    24
}

fn default_page_size() -> usize {
    20
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            scan_interval_secs: default_scan_interval_secs(),
            notification_window_hours: default_notification_window_hours(),
            page_size: default_page_size(),
        }
    }
}

impl EngineConfig {
    /// Parse the configured timezone, falling back to UTC with a warning
    /// when the name is unknown.
    pub fn resolve_timezone(&self) -> Tz {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                log::warn!("Unknown timezone '{}'; falling back to UTC", self.timezone);
                chrono_tz::UTC
            }
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.timezone.parse::<Tz>().is_err() {
            return Err(EngineError::InvalidConfig(format!(
                "unknown timezone '{}'",
                self.timezone
            )));
        }
        if self.scan_interval_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "scanIntervalSecs must be at least 1".to_string(),
            ));
        }
        if self.notification_window_hours == 0 {
            return Err(EngineError::InvalidConfig(
                "notificationWindowHours must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(EngineError::InvalidConfig(
                "pageSize must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
