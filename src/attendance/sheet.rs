//! Per-day record resolution.
//!
//! A month of attendance is a sparse map from day to record. A missing key
//! is the only way to say "no record"; writes either replace the whole
//! record of a day or delete the key.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, Weekday};

use crate::model::attendance::{AttendanceKey, AttendanceRecord, DayOfMonth, MonthNumber};

pub const WEEKDAY_MULTIPLIER: f64 = 1.5;
pub const SUNDAY_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DayWrite {
    Replace(AttendanceRecord),
    Delete,
}

impl From<Option<AttendanceRecord>> for DayWrite {
    fn from(record: Option<AttendanceRecord>) -> Self {
        match record {
            Some(record) => DayWrite::Replace(record),
            None => DayWrite::Delete,
        }
    }
}

/// A write addressed to one (employee, month, day) slot.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceWrite {
    pub key: AttendanceKey,
    pub write: DayWrite,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthSheet {
    days: BTreeMap<DayOfMonth, AttendanceRecord>,
}

impl MonthSheet {
    pub fn get(&self, day: DayOfMonth) -> Option<&AttendanceRecord> {
        self.days.get(&day)
    }

    pub fn apply(&mut self, day: DayOfMonth, write: DayWrite) {
        match write {
            DayWrite::Replace(record) => {
                self.days.insert(day, record);
            }
            DayWrite::Delete => {
                self.days.remove(&day);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DayOfMonth, &AttendanceRecord)> {
        self.days.iter().map(|(day, record)| (*day, record))
    }

    pub fn records(&self) -> impl Iterator<Item = &AttendanceRecord> {
        self.days.values()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Attendance of many employees for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthBook {
    month: MonthNumber,
    sheets: HashMap<String, MonthSheet>,
}

impl MonthBook {
    pub fn new(month: MonthNumber) -> Self {
        Self {
            month,
            sheets: HashMap::new(),
        }
    }

    pub fn month(&self) -> MonthNumber {
        self.month
    }

    pub fn sheet(&self, employee_id: &str) -> Option<&MonthSheet> {
        self.sheets.get(employee_id)
    }

    pub fn record(&self, employee_id: &str, day: DayOfMonth) -> Option<&AttendanceRecord> {
        self.sheet(employee_id).and_then(|sheet| sheet.get(day))
    }

    /// Applies a write when it belongs to this book's month.
    pub fn apply(&mut self, write: AttendanceWrite) -> bool {
        if write.key.month != self.month {
            return false;
        }

        let AttendanceWrite { key, write } = write;
        match write {
            DayWrite::Delete => {
                if let Some(sheet) = self.sheets.get_mut(&key.employee_id) {
                    sheet.apply(key.day, DayWrite::Delete);
                    if sheet.is_empty() {
                        self.sheets.remove(&key.employee_id);
                    }
                }
            }
            replace => self
                .sheets
                .entry(key.employee_id)
                .or_default()
                .apply(key.day, replace),
        }
        true
    }

    pub fn employee_count(&self) -> usize {
        self.sheets.len()
    }
}

/// Multiplier to pre-fill when editing overtime for `date`.
///
/// A stored multiplier wins. Otherwise Sundays suggest 2.0 and every other
/// day 1.5. The suggestion is never written back on its own.
pub fn suggested_multiplier(date: NaiveDate, existing: Option<&AttendanceRecord>) -> f64 {
    if let Some(multiplier) = existing
        .filter(|r| r.overtime_hours.is_some())
        .and_then(|r| r.overtime_multiplier)
    {
        return multiplier;
    }

    if date.weekday() == Weekday::Sun {
        SUNDAY_MULTIPLIER
    } else {
        WEEKDAY_MULTIPLIER
    }
}

/// Attaches overtime only for a positive number of hours.
pub fn attach_overtime(record: &mut AttendanceRecord, hours: Option<f64>, multiplier: f64) {
    match hours {
        Some(h) if h.is_finite() && h > 0.0 => {
            record.overtime_hours = Some(h);
            record.overtime_multiplier = Some(multiplier);
        }
        _ => {
            record.overtime_hours = None;
            record.overtime_multiplier = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;

    fn day(d: u8) -> DayOfMonth {
        DayOfMonth::new(d).unwrap()
    }

    fn month(m: u8) -> MonthNumber {
        MonthNumber::new(m).unwrap()
    }

    fn present() -> AttendanceRecord {
        AttendanceRecord::new(AttendanceStatus::Present, "08:00")
    }

    #[test]
    fn replace_overwrites_every_field() {
        let mut sheet = MonthSheet::default();
        let mut first = present();
        first.overtime_hours = Some(2.0);
        first.device_info = Some("phone".into());
        sheet.apply(day(3), DayWrite::Replace(first));

        let second = AttendanceRecord::new(AttendanceStatus::Absent, "09:00");
        sheet.apply(day(3), DayWrite::Replace(second.clone()));

        assert_eq!(sheet.get(day(3)), Some(&second));
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn delete_removes_the_key() {
        let mut book = MonthBook::new(month(4));
        let key = AttendanceKey::new("E", month(4), day(12));

        book.apply(AttendanceWrite {
            key: key.clone(),
            write: DayWrite::Replace(present()),
        });
        assert!(book.record("E", day(12)).is_some());

        book.apply(AttendanceWrite {
            key,
            write: DayWrite::from(None::<AttendanceRecord>),
        });
        assert_eq!(book.record("E", day(12)), None);
        assert!(book.sheet("E").is_none());
    }

    #[test]
    fn writes_for_other_months_are_ignored() {
        let mut book = MonthBook::new(month(4));
        let applied = book.apply(AttendanceWrite {
            key: AttendanceKey::new("E", month(5), day(1)),
            write: DayWrite::Replace(present()),
        });
        assert!(!applied);
        assert_eq!(book.employee_count(), 0);
    }

    #[test]
    fn days_iterate_in_order() {
        let mut sheet = MonthSheet::default();
        for d in [20, 2, 11] {
            sheet.apply(day(d), DayWrite::Replace(present()));
        }
        let days: Vec<u8> = sheet.iter().map(|(d, _)| d.get()).collect();
        assert_eq!(days, vec![2, 11, 20]);
    }

    #[test]
    fn sunday_suggests_double_time() {
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(suggested_multiplier(sunday, None), 2.0);
        assert_eq!(suggested_multiplier(monday, None), 1.5);
    }

    #[test]
    fn stored_multiplier_is_not_recomputed() {
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut record = present();
        record.overtime_hours = Some(3.0);
        record.overtime_multiplier = Some(3.0);
        assert_eq!(suggested_multiplier(sunday, Some(&record)), 3.0);

        // a record without overtime still gets the calendar suggestion
        assert_eq!(suggested_multiplier(sunday, Some(&present())), 2.0);
    }

    #[test]
    fn overtime_needs_positive_hours() {
        let mut record = present();
        attach_overtime(&mut record, Some(0.0), 1.5);
        assert_eq!(record.overtime_hours, None);
        attach_overtime(&mut record, Some(-2.0), 1.5);
        assert_eq!(record.overtime_hours, None);
        attach_overtime(&mut record, Some(f64::NAN), 1.5);
        assert_eq!(record.overtime_hours, None);

        attach_overtime(&mut record, Some(2.5), 2.0);
        assert_eq!(record.overtime_hours, Some(2.5));
        assert_eq!(record.overtime_multiplier, Some(2.0));
    }
}
