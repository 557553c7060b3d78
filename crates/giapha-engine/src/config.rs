//! Engine configuration: which time zone "today" is taken in, the offset the
//! lunar calendar counts days at, and how far ahead an event counts as "soon".
//!
//! Values come from [`EngineConfig::default`], environment variables
//! (`GIAPHA_TIMEZONE`, `GIAPHA_LUNAR_UTC_OFFSET`, `GIAPHA_SOON_DAYS`) or a
//! JSON file, and can be adjusted with the `with_*` setters.

use std::env;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{GiaphaError, Result};
use crate::lunar::{LunarOptions, VIETNAM_UTC_OFFSET_HOURS};

pub const DEFAULT_TIMEZONE: &str = "Asia/Ho_Chi_Minh";
pub const DEFAULT_SOON_DAYS: i64 = 30;

const MAX_UTC_OFFSET_HOURS: f64 = 14.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// IANA zone used to derive "today" from an instant.
    pub timezone: String,
    /// Offset, in hours, at which lunar days begin.
    pub lunar_utc_offset_hours: f64,
    /// Events within this many days ahead are "soon".
    pub soon_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            lunar_utc_offset_hours: VIETNAM_UTC_OFFSET_HOURS,
            soon_days: DEFAULT_SOON_DAYS,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by any `GIAPHA_*` variables that are set.
    ///
    /// # Errors
    ///
    /// Returns [`GiaphaError::InvalidConfig`] when a variable does not parse
    /// or the result fails [`EngineConfig::validate`].
    #[instrument]
    pub fn from_env() -> Result<Self> {
        debug!("loading configuration from environment variables");
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(tz) = lookup("GIAPHA_TIMEZONE") {
            config.timezone = tz.trim().to_string();
        }
        if let Some(raw) = lookup("GIAPHA_LUNAR_UTC_OFFSET") {
            config.lunar_utc_offset_hours = parse_var("GIAPHA_LUNAR_UTC_OFFSET", &raw)?;
        }
        if let Some(raw) = lookup("GIAPHA_SOON_DAYS") {
            config.soon_days = parse_var("GIAPHA_SOON_DAYS", &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration file");
        let content = fs::read_to_string(path).map_err(|e| {
            GiaphaError::InvalidConfig(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let config: EngineConfig = serde_json::from_str(&content).map_err(|e| {
            GiaphaError::InvalidConfig(format!("cannot parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if !self.lunar_utc_offset_hours.is_finite()
            || self.lunar_utc_offset_hours.abs() > MAX_UTC_OFFSET_HOURS
        {
            return Err(GiaphaError::InvalidConfig(format!(
                "lunar UTC offset must be within ±{MAX_UTC_OFFSET_HOURS} hours, got {}",
                self.lunar_utc_offset_hours
            )));
        }
        if self.soon_days < 1 {
            return Err(GiaphaError::InvalidConfig(format!(
                "soon window must be at least 1 day, got {}",
                self.soon_days
            )));
        }
        Ok(())
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_lunar_utc_offset(mut self, hours: f64) -> Self {
        self.lunar_utc_offset_hours = hours;
        self
    }

    pub fn with_soon_days(mut self, days: i64) -> Self {
        self.soon_days = days;
        self
    }

    /// The configured zone, parsed.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| GiaphaError::InvalidTimezone(format!("'{}'", self.timezone)))
    }

    /// The calendar date of `now` in the configured zone.
    pub fn local_date(&self, now: DateTime<Utc>) -> Result<NaiveDate> {
        Ok(now.with_timezone(&self.tz()?).date_naive())
    }

    pub fn lunar_options(&self) -> LunarOptions {
        LunarOptions {
            utc_offset_hours: self.lunar_utc_offset_hours,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| GiaphaError::InvalidConfig(format!("{name}: cannot parse '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timezone, "Asia/Ho_Chi_Minh");
        assert_eq!(config.lunar_utc_offset_hours, 7.0);
        assert_eq!(config.soon_days, 30);
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("GIAPHA_TIMEZONE", "Europe/Berlin"),
            ("GIAPHA_SOON_DAYS", " 14 "),
        ]))
        .unwrap();
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.soon_days, 14);
        assert_eq!(config.lunar_utc_offset_hours, 7.0);
    }

    #[test]
    fn test_env_unparseable_value() {
        let err = EngineConfig::from_lookup(lookup_from(&[("GIAPHA_LUNAR_UTC_OFFSET", "seven")]))
            .unwrap_err()
            .to_string();
        assert!(err.contains("GIAPHA_LUNAR_UTC_OFFSET"), "got: {err}");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(EngineConfig::default()
            .with_timezone("Not/A_Zone")
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_lunar_utc_offset(15.0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_lunar_utc_offset(f64::NAN)
            .validate()
            .is_err());
        assert!(EngineConfig::default().with_soon_days(0).validate().is_err());
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timezone": "UTC", "soonDays": 7}}"#).unwrap();
        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.soon_days, 7);
        assert_eq!(config.lunar_utc_offset_hours, 7.0);
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = EngineConfig::from_json_file("/nonexistent/giapha.json")
            .unwrap_err()
            .to_string();
        assert!(err.contains("Invalid config"), "got: {err}");
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 17, 30, 0).unwrap();
        let vn = EngineConfig::default();
        assert_eq!(
            vn.local_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );
        let utc = EngineConfig::default().with_timezone("UTC");
        assert_eq!(
            utc.local_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
        );
    }
}
