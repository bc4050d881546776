use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestType {
    Leave,
    Overtime,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Only a pending request can be decided; a decision is final.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self == RequestStatus::Pending && next != RequestStatus::Pending
    }
}

/// A leave or overtime request, joined with the requesting employee.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Request {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "ID002")]
    pub employee_id: String,
    #[schema(example = "John User", nullable = true)]
    pub employee_name: Option<String>,
    #[schema(nullable = true)]
    pub avatar: Option<String>,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family matters")]
    pub reason: String,
    pub status: RequestStatus,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String, nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
pub struct RequestRow {
    pub id: u64,
    pub employee_id: String,
    pub employee_name: Option<String>,
    pub avatar: Option<String>,
    pub request_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for Request {
    type Error = strum::ParseError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(Request {
            id: row.id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            avatar: row.avatar,
            request_type: row.request_type.parse()?,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// Every date from `start` to `end`, both inclusive.
pub fn dates_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_requests_can_be_decided() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Approved));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Rejected));
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::Pending));
        assert!(!RequestStatus::Approved.can_transition_to(RequestStatus::Rejected));
        assert!(!RequestStatus::Rejected.can_transition_to(RequestStatus::Approved));
    }

    #[test]
    fn date_range_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 30).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let dates = dates_in_range(start, end);
        assert_eq!(dates.len(), 4);
        assert_eq!(dates.last(), Some(&end));
        assert_eq!(dates_in_range(start, start), vec![start]);
        assert!(dates_in_range(end, start).is_empty());
    }

    #[test]
    fn request_type_serializes_lowercase() {
        assert_eq!(RequestType::Overtime.as_ref(), "overtime");
        assert_eq!("leave".parse::<RequestType>().unwrap(), RequestType::Leave);
    }
}
