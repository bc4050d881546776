use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Leave,
    Halfday,
    EarlyLeave,
}

impl AttendanceStatus {
    /// Single glyph used in the monthly timeline grid.
    pub fn short_label(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "✓",
            AttendanceStatus::Halfday => "½",
            AttendanceStatus::Absent => "✕",
            AttendanceStatus::Late => "M",
            AttendanceStatus::EarlyLeave => "S",
            AttendanceStatus::Leave => "P",
        }
    }
}

/// Calendar month, 1 = January.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
#[serde(try_from = "u8", into = "u8")]
pub struct MonthNumber(u8);

impl MonthNumber {
    pub fn new(month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(MonthNumber(month))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for MonthNumber {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MonthNumber::new(value).ok_or_else(|| format!("month out of range: {value}"))
    }
}

impl From<MonthNumber> for u8 {
    fn from(value: MonthNumber) -> Self {
        value.0
    }
}

/// Day of month, 1..=31. Displays zero-padded ("05"), the form stored in
/// the `attendance.day` column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "{:02}", _0)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfMonth(u8);

impl DayOfMonth {
    pub fn new(day: u8) -> Option<Self> {
        (1..=31).contains(&day).then_some(DayOfMonth(day))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Parses the stored two-digit key; unpadded input is accepted too.
    pub fn parse_key(key: &str) -> Option<Self> {
        key.trim().parse::<u8>().ok().and_then(DayOfMonth::new)
    }
}

impl TryFrom<u8> for DayOfMonth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DayOfMonth::new(value).ok_or_else(|| format!("day out of range: {value}"))
    }
}

impl From<DayOfMonth> for u8 {
    fn from(value: DayOfMonth) -> Self {
        value.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 10.7769)]
    pub latitude: f64,
    #[schema(example = 106.7009)]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Natural key of an attendance row.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct AttendanceKey {
    pub employee_id: String,
    pub month: MonthNumber,
    pub day: DayOfMonth,
}

impl AttendanceKey {
    pub fn new(employee_id: impl Into<String>, month: MonthNumber, day: DayOfMonth) -> Self {
        Self {
            employee_id: employee_id.into(),
            month,
            day,
        }
    }

    pub fn for_date(employee_id: impl Into<String>, date: NaiveDate) -> Self {
        // chrono guarantees month 1..=12 and day 1..=31
        Self::new(
            employee_id,
            MonthNumber(date.month() as u8),
            DayOfMonth(date.day() as u8),
        )
    }
}

/// One employee's attendance for one day. Writing a record replaces every
/// field of the slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    pub status: AttendanceStatus,
    /// Check-in time as displayed, "HH:MM".
    #[schema(example = "08:02")]
    pub timestamp: String,
    #[schema(example = "17:35", nullable = true)]
    pub check_out_time: Option<String>,
    #[schema(example = 2.0, nullable = true)]
    pub overtime_hours: Option<f64>,
    #[schema(example = 1.5, nullable = true)]
    pub overtime_multiplier: Option<f64>,
    #[schema(nullable = true)]
    pub location: Option<GeoPoint>,
    #[schema(nullable = true)]
    pub device_info: Option<String>,
    /// Meters from the office at check-in.
    #[schema(example = 42.0, nullable = true)]
    pub distance: Option<f64>,
}

impl AttendanceRecord {
    pub fn new(status: AttendanceStatus, timestamp: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: timestamp.into(),
            check_out_time: None,
            overtime_hours: None,
            overtime_multiplier: None,
            location: None,
            device_info: None,
            distance: None,
        }
    }

    pub fn has_checked_out(&self) -> bool {
        self.check_out_time.is_some()
    }

    /// Overtime expressed in pay-equivalent hours.
    pub fn weighted_overtime(&self) -> f64 {
        self.overtime_hours.unwrap_or(0.0) * self.overtime_multiplier.unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_uses_snake_case_names() {
        assert_eq!(AttendanceStatus::EarlyLeave.to_string(), "early_leave");
        assert_eq!(
            AttendanceStatus::from_str("halfday").unwrap(),
            AttendanceStatus::Halfday
        );
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::EarlyLeave).unwrap(),
            "\"early_leave\""
        );
    }

    #[test]
    fn day_key_is_zero_padded() {
        let day = DayOfMonth::new(5).unwrap();
        assert_eq!(day.to_string(), "05");
        assert_eq!(DayOfMonth::parse_key("05"), Some(day));
        assert_eq!(DayOfMonth::parse_key("5"), Some(day));
        assert_eq!(DayOfMonth::parse_key("32"), None);
        assert_eq!(DayOfMonth::parse_key("00"), None);
    }

    #[test]
    fn month_range_is_checked_on_deserialize() {
        assert!(serde_json::from_str::<MonthNumber>("12").is_ok());
        assert!(serde_json::from_str::<MonthNumber>("13").is_err());
        assert!(MonthNumber::new(0).is_none());
    }

    #[test]
    fn key_from_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let key = AttendanceKey::for_date("ID001", date);
        assert_eq!(key.month.get(), 3);
        assert_eq!(key.day.to_string(), "09");
    }

    #[test]
    fn weighted_overtime_defaults_multiplier_to_one() {
        let mut record = AttendanceRecord::new(AttendanceStatus::Present, "08:00");
        assert_eq!(record.weighted_overtime(), 0.0);
        record.overtime_hours = Some(3.0);
        assert_eq!(record.weighted_overtime(), 3.0);
        record.overtime_multiplier = Some(2.0);
        assert_eq!(record.weighted_overtime(), 6.0);
    }
}
