//! Bulk assignment: one record template fanned out over employees x dates.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use crate::attendance::sheet::{AttendanceWrite, DayWrite, WEEKDAY_MULTIPLIER, attach_overtime};
use crate::error::AppError;
use crate::model::attendance::{AttendanceKey, AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone)]
pub struct BulkAssignment {
    pub employee_ids: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub status: AttendanceStatus,
    pub timestamp: String,
    pub overtime_hours: Option<f64>,
    pub overtime_multiplier: Option<f64>,
}

impl BulkAssignment {
    /// Every (employee, date) pair gets the same record. Rows are keyed by
    /// month and day, so duplicate ids and dates sharing a month and day
    /// collapse to one write.
    pub fn expand(&self) -> Result<Vec<AttendanceWrite>, AppError> {
        let employees: BTreeSet<&str> = self
            .employee_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        let dates: BTreeMap<(u32, u32), NaiveDate> = self
            .dates
            .iter()
            .map(|date| ((date.month(), date.day()), *date))
            .collect();

        if employees.is_empty() || dates.is_empty() {
            return Err(AppError::validation(
                "Select at least one employee and one date",
            ));
        }

        let mut template = AttendanceRecord::new(self.status, self.timestamp.clone());
        attach_overtime(
            &mut template,
            self.overtime_hours,
            self.overtime_multiplier.unwrap_or(WEEKDAY_MULTIPLIER),
        );

        let writes = employees
            .iter()
            .flat_map(|employee_id| {
                let template = &template;
                dates.values().map(move |date| AttendanceWrite {
                    key: AttendanceKey::for_date(*employee_id, *date),
                    write: DayWrite::Replace(template.clone()),
                })
            })
            .collect();

        Ok(writes)
    }
}

/// `leave` records for every date of an approved leave request.
pub fn leave_writes(
    employee_id: &str,
    dates: Vec<NaiveDate>,
    timestamp: String,
) -> Result<Vec<AttendanceWrite>, AppError> {
    BulkAssignment {
        employee_ids: vec![employee_id.to_string()],
        dates,
        status: AttendanceStatus::Leave,
        timestamp,
        overtime_hours: None,
        overtime_multiplier: None,
    }
    .expand()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    fn assignment() -> BulkAssignment {
        BulkAssignment {
            employee_ids: vec!["A".into(), "B".into(), "C".into()],
            dates: vec![date(4), date(5)],
            status: AttendanceStatus::Present,
            timestamp: "09:15".into(),
            overtime_hours: None,
            overtime_multiplier: None,
        }
    }

    #[test]
    fn three_employees_by_two_dates_is_six_writes() {
        let writes = assignment().expand().unwrap();
        assert_eq!(writes.len(), 6);

        let keys: HashSet<_> = writes.iter().map(|w| w.key.clone()).collect();
        assert_eq!(keys.len(), 6);

        for w in &writes {
            match &w.write {
                DayWrite::Replace(record) => {
                    assert_eq!(record.status, AttendanceStatus::Present);
                    assert_eq!(record.timestamp, "09:15");
                    assert_eq!(record.overtime_hours, None);
                }
                DayWrite::Delete => panic!("bulk never deletes"),
            }
        }
    }

    #[test]
    fn duplicates_collapse() {
        let mut a = assignment();
        a.employee_ids.push("A".into());
        a.dates.push(date(4));
        assert_eq!(a.expand().unwrap().len(), 6);
    }

    #[test]
    fn same_day_in_another_year_is_one_write() {
        let mut a = assignment();
        a.employee_ids = vec!["E".into()];
        a.dates = vec![
            NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
        ];

        let writes = a.expand().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].key, AttendanceKey::for_date("E", date(4)));
    }

    #[test]
    fn overtime_is_shared_and_defaults_to_weekday_multiplier() {
        let mut a = assignment();
        a.overtime_hours = Some(2.0);
        let writes = a.expand().unwrap();
        assert!(writes.iter().all(|w| matches!(
            &w.write,
            DayWrite::Replace(r) if r.overtime_hours == Some(2.0) && r.overtime_multiplier == Some(1.5)
        )));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let mut a = assignment();
        a.dates.clear();
        assert!(matches!(a.expand(), Err(AppError::Validation(_))));

        let mut a = assignment();
        a.employee_ids = vec!["  ".into()];
        assert!(matches!(a.expand(), Err(AppError::Validation(_))));
    }

    #[test]
    fn leave_request_fans_out_over_its_range() {
        let writes = leave_writes("E", vec![date(1), date(2), date(3)], "08:00".into()).unwrap();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|w| w.key.employee_id == "E"));
        assert!(writes.iter().all(|w| matches!(
            &w.write,
            DayWrite::Replace(r) if r.status == AttendanceStatus::Leave
        )));
    }

    #[test]
    fn leave_longer_than_a_year_writes_each_slot_once() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2029, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();

        let writes = leave_writes("E", dates, "08:00".into()).unwrap();
        let keys: HashSet<_> = writes.iter().map(|w| w.key.clone()).collect();
        assert_eq!(writes.len(), 366);
        assert_eq!(keys.len(), 366);
    }
}
