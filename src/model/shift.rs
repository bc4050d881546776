use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Named working time range. Reference data only; check-in never reads it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Shift {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Morning (A)")]
    pub name: String,
    #[schema(example = "06:00")]
    pub start_time: String,
    #[schema(example = "14:00")]
    pub end_time: String,
    #[schema(example = "#10b981")]
    pub color: String,
}

impl Shift {
    /// Used when the `shifts` table cannot be read.
    pub fn defaults() -> Vec<Shift> {
        let shift = |id, name: &str, start: &str, end: &str, color: &str| Shift {
            id,
            name: name.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            color: color.to_string(),
        };

        vec![
            shift(1, "Morning (A)", "06:00", "14:00", "#10b981"),
            shift(2, "Afternoon (B)", "14:00", "22:00", "#f59e0b"),
            shift(3, "Night (C)", "22:00", "06:00", "#6366f1"),
            shift(4, "Office hours", "08:00", "17:00", "#6b7280"),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EmployeeSchedule {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "ID002")]
    pub employee_id: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 1)]
    pub shift_id: u64,
}
