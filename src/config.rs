use crate::scheduler::SchedError;
use crate::stats::DayWindow;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Paramètres par défaut du moteur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub day_window: DayWindow,
    pub default_days: u32,
    pub shift_start_hour: u32,
    pub shift_end_hour: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            day_window: DayWindow::default(),
            default_days: 7,
            shift_start_hour: 9,
            shift_end_hour: 17,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), SchedError> {
        self.day_window.validate()?;
        if self.default_days == 0 {
            return Err(SchedError::invalid_input("default_days must be > 0"));
        }
        validate_shift_hours(self.shift_start_hour, self.shift_end_hour)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}

/// `end_hour` peut valoir 24 (minuit du lendemain) ; `end <= start` signifie un créneau de nuit.
pub(crate) fn validate_shift_hours(start_hour: u32, end_hour: u32) -> Result<(), SchedError> {
    if start_hour > 23 || end_hour > 24 {
        return Err(SchedError::invalid_input(format!(
            "shift hours out of range: start {start_hour} (0-23), end {end_hour} (0-24)"
        )));
    }
    if start_hour == end_hour || (start_hour == 0 && end_hour == 24) {
        return Err(SchedError::invalid_input(format!(
            "shift hours {start_hour}-{end_hour} do not describe a shift shorter than a day"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rota.json");
        fs::write(&path, r#"{ "default_days": 14, "day_window": { "start_hour": 7, "end_hour": 19 } }"#)
            .unwrap();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.default_days, 14);
        assert_eq!(config.day_window, DayWindow { start_hour: 7, end_hour: 19 });
        assert_eq!(config.shift_start_hour, 9);
        assert_eq!(config.shift_end_hour, 17);
    }

    #[test]
    fn invalid_window_is_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rota.json");
        fs::write(&path, r#"{ "day_window": { "start_hour": 20, "end_hour": 6 } }"#).unwrap();
        assert!(Config::load_from_file(&path).is_err());
    }

    #[test]
    fn shift_hours_rules() {
        assert!(validate_shift_hours(9, 17).is_ok());
        assert!(validate_shift_hours(22, 6).is_ok());
        assert!(validate_shift_hours(18, 24).is_ok());
        assert!(validate_shift_hours(9, 9).is_err());
        assert!(validate_shift_hours(0, 24).is_err());
        assert!(validate_shift_hours(24, 8).is_err());
    }
}
