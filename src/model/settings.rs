use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::attendance::GeoPoint;

pub const KEY_WORK_START: &str = "work_start_time";
pub const KEY_WORK_END: &str = "work_end_time";
pub const KEY_OFFICE_LAT: &str = "office_lat";
pub const KEY_OFFICE_LNG: &str = "office_lng";
pub const KEY_ALLOWED_RADIUS: &str = "allowed_radius";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SystemSettings {
    #[schema(example = "08:00")]
    pub work_start_time: String,
    #[schema(example = "17:30")]
    pub work_end_time: String,
    #[schema(example = 10.7769)]
    pub office_lat: f64,
    #[schema(example = 106.7009)]
    pub office_lng: f64,
    /// Meters
    #[schema(example = 100.0)]
    pub allowed_radius: f64,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            work_start_time: "08:00".to_string(),
            work_end_time: "17:30".to_string(),
            office_lat: 0.0,
            office_lng: 0.0,
            allowed_radius: 100.0,
        }
    }
}

/// Hour and minute of a "HH:MM" setting.
pub fn parse_clock(value: &str) -> Result<(u32, u32), AppError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(|t| (t.hour(), t.minute()))
        .map_err(|_| AppError::validation(format!("Invalid time \"{value}\", expected HH:MM")))
}

impl SystemSettings {
    /// Builds settings from `system_settings` key/value rows. Missing or
    /// unparsable values keep their defaults.
    pub fn from_pairs<I, K, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = SystemSettings::default();

        for (key, value) in rows {
            let value = value.as_ref().trim();
            match key.as_ref() {
                KEY_WORK_START if !value.is_empty() => settings.work_start_time = value.to_string(),
                KEY_WORK_END if !value.is_empty() => settings.work_end_time = value.to_string(),
                KEY_OFFICE_LAT => {
                    if let Ok(v) = value.parse() {
                        settings.office_lat = v;
                    }
                }
                KEY_OFFICE_LNG => {
                    if let Ok(v) = value.parse() {
                        settings.office_lng = v;
                    }
                }
                KEY_ALLOWED_RADIUS => {
                    if let Ok(v) = value.parse() {
                        settings.allowed_radius = v;
                    }
                }
                other => tracing::debug!(key = other, "Ignoring setting"),
            }
        }

        settings
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_WORK_START, self.work_start_time.clone()),
            (KEY_WORK_END, self.work_end_time.clone()),
            (KEY_OFFICE_LAT, self.office_lat.to_string()),
            (KEY_OFFICE_LNG, self.office_lng.to_string()),
            (KEY_ALLOWED_RADIUS, self.allowed_radius.to_string()),
        ]
    }

    pub fn validate(&self) -> Result<(), AppError> {
        parse_clock(&self.work_start_time)?;
        parse_clock(&self.work_end_time)?;

        if !(-90.0..=90.0).contains(&self.office_lat) {
            return Err(AppError::validation("office_lat must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&self.office_lng) {
            return Err(AppError::validation("office_lng must be between -180 and 180"));
        }
        if !(self.allowed_radius >= 0.0) {
            return Err(AppError::validation("allowed_radius must not be negative"));
        }

        Ok(())
    }

    /// Office location, when both coordinates are set.
    pub fn office(&self) -> Option<GeoPoint> {
        (self.office_lat != 0.0 && self.office_lng != 0.0)
            .then(|| GeoPoint::new(self.office_lat, self.office_lng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_fall_back_to_defaults() {
        let settings = SystemSettings::from_pairs([("office_lat", "10.5"), ("work_end_time", "")]);
        assert_eq!(settings.office_lat, 10.5);
        assert_eq!(settings.work_start_time, "08:00");
        assert_eq!(settings.work_end_time, "17:30");
        assert_eq!(settings.allowed_radius, 100.0);
    }

    #[test]
    fn pairs_round_trip_through_storage_keys() {
        let settings = SystemSettings {
            work_start_time: "07:45".into(),
            work_end_time: "16:00".into(),
            office_lat: 21.0285,
            office_lng: 105.8542,
            allowed_radius: 250.0,
        };
        assert_eq!(SystemSettings::from_pairs(settings.to_pairs()), settings);
    }

    #[test]
    fn office_requires_both_coordinates() {
        let mut settings = SystemSettings::default();
        assert!(settings.office().is_none());
        settings.office_lat = 10.0;
        assert!(settings.office().is_none());
        settings.office_lng = 106.0;
        assert_eq!(settings.office(), Some(GeoPoint::new(10.0, 106.0)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut settings = SystemSettings::default();
        assert!(settings.validate().is_ok());

        settings.work_start_time = "8am".into();
        assert!(settings.validate().is_err());

        settings = SystemSettings::default();
        settings.allowed_radius = -1.0;
        assert!(settings.validate().is_err());

        settings = SystemSettings::default();
        settings.office_lat = 91.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn clock_parsing() {
        assert_eq!(parse_clock("08:00").unwrap(), (8, 0));
        assert_eq!(parse_clock("17:30").unwrap(), (17, 30));
        assert!(parse_clock("25:00").is_err());
    }
}
