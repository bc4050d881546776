//! Monthly rollups: per-employee summaries, organization statistics,
//! the dashboard counters and the timeline grid.
//!
//! Callers pass the session's [`Scope`]; employees outside it are skipped
//! here as well as at the query, so a non-admin can never aggregate
//! anybody else's days.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::sheet::{MonthBook, MonthSheet};
use crate::auth::auth::Scope;
use crate::model::attendance::{AttendanceStatus, DayOfMonth, MonthNumber};
use crate::model::employee::Employee;

/// Group used when a non-admin looks at their own numbers.
pub const INDIVIDUAL_GROUP: &str = "Individual";

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub present: u32,
    pub halfday: u32,
    pub late: u32,
    pub absent: u32,
    pub leave: u32,
    pub early_leave: u32,
}

impl StatusCounts {
    fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Halfday => self.halfday += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Leave => self.leave += 1,
            AttendanceStatus::EarlyLeave => self.early_leave += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthSummary {
    #[schema(example = "ID002")]
    pub employee_id: String,
    /// present = 1, halfday = 0.5, late = 1
    #[schema(example = 21.5)]
    pub work_days: f64,
    /// Overtime in pay-equivalent hours (hours x multiplier).
    #[schema(example = 11.0)]
    pub overtime_total: f64,
    /// Overtime as entered, without multipliers.
    #[schema(example = 6.0)]
    pub overtime_hours: f64,
    pub counts: StatusCounts,
}

pub fn work_day_weight(status: AttendanceStatus) -> f64 {
    match status {
        AttendanceStatus::Present | AttendanceStatus::Late => 1.0,
        AttendanceStatus::Halfday => 0.5,
        _ => 0.0,
    }
}

pub fn summarize(employee_id: &str, sheet: Option<&MonthSheet>) -> MonthSummary {
    let mut summary = MonthSummary {
        employee_id: employee_id.to_string(),
        work_days: 0.0,
        overtime_total: 0.0,
        overtime_hours: 0.0,
        counts: StatusCounts::default(),
    };

    for record in sheet.into_iter().flat_map(|s| s.records()) {
        summary.work_days += work_day_weight(record.status);
        summary.overtime_total += record.weighted_overtime();
        summary.overtime_hours += record.overtime_hours.unwrap_or(0.0);
        summary.counts.add(record.status);
    }

    summary
}

/// Counters shown on the employee dashboard for the current month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DashboardStats {
    /// present + halfday
    pub present: u32,
    pub late: u32,
    pub absent: u32,
}

pub fn dashboard(sheet: Option<&MonthSheet>) -> DashboardStats {
    let counts = summarize("", sheet).counts;
    DashboardStats {
        present: counts.present + counts.halfday,
        late: counts.late,
        absent: counts.absent,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Tally {
    /// present + halfday
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub leave: u32,
}

impl Tally {
    fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present | AttendanceStatus::Halfday => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Leave => self.leave += 1,
            AttendanceStatus::EarlyLeave => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.present + self.late + self.absent + self.leave
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GroupStats {
    #[schema(example = "IT")]
    pub group: String,
    pub tally: Tally,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DailyTrend {
    #[schema(example = 1)]
    pub day: u8,
    pub present: u32,
    pub late: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrgStatistics {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 1)]
    pub month: u8,
    #[schema(example = 120)]
    pub total: u32,
    pub totals: Tally,
    pub groups: Vec<GroupStats>,
    pub daily: Vec<DailyTrend>,
}

pub fn days_in_month(year: i32, month: MonthNumber) -> u8 {
    let m = u32::from(month.get());
    let next = if m == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, m + 1, 1)
    };

    next.and_then(|d| d.pred_opt())
        .map(|d| d.day() as u8)
        .unwrap_or(31)
}

fn month_days(year: i32, month: MonthNumber) -> impl Iterator<Item = DayOfMonth> {
    (1..=days_in_month(year, month)).filter_map(DayOfMonth::new)
}

fn in_scope<'a>(scope: &'a Scope, employees: &'a [Employee]) -> impl Iterator<Item = &'a Employee> {
    employees.iter().filter(move |e| scope.admits(&e.id))
}

/// Organization-wide counters for a month, grouped by department (or the
/// single individual group for a non-admin).
pub fn organization_statistics(
    scope: &Scope,
    employees: &[Employee],
    book: &MonthBook,
    year: i32,
) -> OrgStatistics {
    let month = book.month();
    let mut totals = Tally::default();
    let mut groups: Vec<GroupStats> = Vec::new();
    let mut daily: Vec<DailyTrend> = month_days(year, month)
        .map(|d| DailyTrend {
            day: d.get(),
            ..DailyTrend::default()
        })
        .collect();

    for employee in in_scope(scope, employees) {
        let group_key = match scope {
            Scope::Organization => employee.department.as_str(),
            Scope::Employee(_) => INDIVIDUAL_GROUP,
        };

        let idx = match groups.iter().position(|g| g.group == group_key) {
            Some(idx) => idx,
            None => {
                groups.push(GroupStats {
                    group: group_key.to_string(),
                    tally: Tally::default(),
                });
                groups.len() - 1
            }
        };

        let Some(sheet) = book.sheet(&employee.id) else {
            continue;
        };

        for (day, record) in sheet.iter() {
            let Some(trend) = daily.get_mut(usize::from(day.get()) - 1) else {
                continue;
            };

            totals.add(record.status);
            groups[idx].tally.add(record.status);
            match record.status {
                AttendanceStatus::Present | AttendanceStatus::Halfday => trend.present += 1,
                AttendanceStatus::Late => trend.late += 1,
                _ => {}
            }
        }
    }

    OrgStatistics {
        year,
        month: month.get(),
        total: totals.total(),
        totals,
        groups,
        daily,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TimelineRow {
    pub employee_id: String,
    pub code: String,
    pub name: String,
    pub department: String,
    /// One entry per day of the month: the status glyph, or null.
    #[schema(example = json!(["✓", null, "M"]))]
    pub cells: Vec<Option<String>>,
    pub work_days: f64,
    pub overtime_hours: f64,
}

/// The employee x day grid, optionally narrowed to one department.
pub fn timeline(
    scope: &Scope,
    employees: &[Employee],
    book: &MonthBook,
    year: i32,
    department: Option<&str>,
) -> Vec<TimelineRow> {
    let month = book.month();

    in_scope(scope, employees)
        .filter(|e| department.is_none_or(|d| e.department == d))
        .map(|employee| {
            let sheet = book.sheet(&employee.id);
            let cells = month_days(year, month)
                .map(|d| {
                    sheet
                        .and_then(|s| s.get(d))
                        .map(|r| r.status.short_label().to_string())
                })
                .collect();
            let summary = summarize(&employee.id, sheet);

            TimelineRow {
                employee_id: employee.id.clone(),
                code: employee.code.clone(),
                name: employee.name.clone(),
                department: employee.department.clone(),
                cells,
                work_days: summary.work_days,
                overtime_hours: summary.overtime_hours,
            }
        })
        .collect()
}
