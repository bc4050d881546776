use crate::{
    attendance::{
        bulk::BulkAssignment,
        decision::{self, GeofenceWarning, Punch, clock_label},
        sheet::{AttendanceWrite, DayWrite, MonthSheet, attach_overtime, suggested_multiplier},
        stats::{self, DashboardStats, MonthSummary, days_in_month},
    },
    auth::auth::{AuthUser, Scope},
    error::{AppError, AppResult},
    model::attendance::{AttendanceKey, AttendanceRecord, AttendanceStatus, DayOfMonth, GeoPoint, MonthNumber},
    store::{
        attendance as attendance_store,
        settings::{self as settings_store, SettingsSnapshot},
    },
    utils::change_feed::{ChangeFeed, Table},
};
use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PunchRequest {
    /// Omitted when the device denied or could not get a position.
    #[schema(example = 10.7769, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 106.7009, nullable = true)]
    pub longitude: Option<f64>,
    #[schema(example = "Mozilla/5.0 (iPhone)", nullable = true)]
    pub device_info: Option<String>,
}

impl PunchRequest {
    fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(GeoPoint::new(lat, lng))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PunchResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub record: AttendanceRecord,
    /// Present when the punch was outside the allowed radius.
    #[schema(nullable = true)]
    pub geofence_warning: Option<GeofenceWarning>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayResponse {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(nullable = true)]
    pub record: Option<AttendanceRecord>,
    pub stats: DashboardStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarDay {
    #[schema(example = 5)]
    pub day: u8,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(nullable = true)]
    pub record: Option<AttendanceRecord>,
    /// Pre-fill for the overtime multiplier field. Not stored.
    #[schema(example = 1.5)]
    pub suggested_overtime_multiplier: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthCalendar {
    #[schema(example = "ID002")]
    pub employee_id: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 1)]
    pub month: u8,
    pub days: Vec<CalendarDay>,
    pub summary: MonthSummary,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DayEdit {
    /// `null` clears the day.
    #[serde(default)]
    #[schema(nullable = true)]
    pub status: Option<AttendanceStatus>,
    #[schema(example = 2.0, nullable = true)]
    pub overtime_hours: Option<f64>,
    /// Defaults to the suggested multiplier for the day.
    #[schema(example = 1.5, nullable = true)]
    pub overtime_multiplier: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkRequest {
    #[schema(example = json!(["ID001", "ID002"]))]
    pub employee_ids: Vec<String>,
    #[schema(example = json!(["2026-01-05", "2026-01-06"]), value_type = Vec<String>)]
    pub dates: Vec<NaiveDate>,
    pub status: AttendanceStatus,
    #[schema(example = 2.0, nullable = true)]
    pub overtime_hours: Option<f64>,
    #[schema(example = 1.5, nullable = true)]
    pub overtime_multiplier: Option<f64>,
}

fn month_of(month: u8) -> AppResult<MonthNumber> {
    MonthNumber::new(month).ok_or_else(|| AppError::validation("month must be between 1 and 12"))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Checked in, possibly with a geofence warning", body = PunchResponse),
        (status = 400, description = "Settings not loaded or location unavailable", body = Object, example = json!({
            "message": "Location unavailable: enable GPS and allow location access"
        })),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    settings: web::Data<SettingsSnapshot>,
    feed: web::Data<ChangeFeed>,
    payload: web::Json<PunchRequest>,
) -> AppResult<HttpResponse> {
    let now = Local::now().naive_local();
    let key = AttendanceKey::for_date(auth.employee_id.clone(), now.date());

    let today = attendance_store::fetch_record(pool.get_ref(), &key).await?;
    let settings = settings_store::current(&settings, pool.get_ref()).await;

    let outcome = decision::check_in(
        Punch {
            at: now.time(),
            location: payload.location(),
            device_info: payload.device_info.clone(),
        },
        settings.as_deref(),
        today.as_ref(),
    )?;

    if let Some(warning) = &outcome.geofence {
        tracing::warn!(
            employee_id = %auth.employee_id,
            distance_m = warning.distance_m,
            allowed_radius_m = warning.allowed_radius_m,
            "Check-in outside allowed radius"
        );
    }

    attendance_store::apply_write(
        pool.get_ref(),
        &AttendanceWrite {
            key,
            write: DayWrite::Replace(outcome.record.clone()),
        },
    )
    .await?;
    feed.publish(Table::Attendance);

    tracing::info!(employee_id = %auth.employee_id, status = %outcome.record.status, "Checked in");

    Ok(HttpResponse::Ok().json(PunchResponse {
        message: "Checked in successfully".to_string(),
        record: outcome.record,
        geofence_warning: outcome.geofence,
    }))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Checked out", body = PunchResponse),
        (status = 400, description = "No check-in found for today", body = Object, example = json!({
            "message": "No check-in found for today"
        })),
        (status = 409, description = "Already checked out today"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    settings: web::Data<SettingsSnapshot>,
    feed: web::Data<ChangeFeed>,
    payload: web::Json<PunchRequest>,
) -> AppResult<HttpResponse> {
    let now = Local::now().naive_local();
    let key = AttendanceKey::for_date(auth.employee_id.clone(), now.date());

    let today = attendance_store::fetch_record(pool.get_ref(), &key).await?;
    let settings = settings_store::current(&settings, pool.get_ref()).await;

    let outcome = decision::check_out(
        Punch {
            at: now.time(),
            location: payload.location(),
            device_info: payload.device_info.clone(),
        },
        settings.as_deref(),
        today.as_ref(),
    )?;

    attendance_store::apply_write(
        pool.get_ref(),
        &AttendanceWrite {
            key,
            write: DayWrite::Replace(outcome.record.clone()),
        },
    )
    .await?;
    feed.publish(Table::Attendance);

    tracing::info!(employee_id = %auth.employee_id, status = %outcome.record.status, "Checked out");

    Ok(HttpResponse::Ok().json(PunchResponse {
        message: "Checked out successfully".to_string(),
        record: outcome.record,
        geofence_warning: outcome.geofence,
    }))
}

/// Today's record and this month's counters for the signed-in employee
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's attendance", body = TodayResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let date = Local::now().date_naive();
    let key = AttendanceKey::for_date(auth.employee_id.clone(), date);

    let scope = Scope::Employee(auth.employee_id.clone());
    let book = attendance_store::load_month(pool.get_ref(), key.month, &scope).await?;

    Ok(HttpResponse::Ok().json(TodayResponse {
        date,
        record: book.record(&auth.employee_id, key.day).cloned(),
        stats: stats::dashboard(book.sheet(&auth.employee_id)),
    }))
}

/// One employee's month, day by day
#[utoipa::path(
    get,
    path = "/api/attendance/{employee_id}/{year}/{month}",
    params(
        ("employee_id" = String, Path, description = "Employee id"),
        ("year" = i32, Path, description = "Year"),
        ("month" = u8, Path, description = "Month, 1-12")
    ),
    responses(
        (status = 200, description = "Month calendar", body = MonthCalendar),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Not your attendance")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn month_calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(String, i32, u8)>,
) -> AppResult<HttpResponse> {
    let (employee_id, year, month) = path.into_inner();
    let employee_id = auth.resolve_employee(Some(&employee_id))?;
    let month = month_of(month)?;

    let scope = Scope::Employee(employee_id.clone());
    let book = attendance_store::load_month(pool.get_ref(), month, &scope).await?;
    let sheet = book.sheet(&employee_id);
    tracing::debug!(
        employee_id = %employee_id,
        recorded_days = sheet.map_or(0, MonthSheet::len),
        "Loaded month calendar"
    );

    let days = (1..=days_in_month(year, month))
        .filter_map(|d| {
            let date = NaiveDate::from_ymd_opt(year, u32::from(month.get()), u32::from(d))?;
            let record = DayOfMonth::new(d).and_then(|day| sheet.and_then(|s| s.get(day)));
            Some(CalendarDay {
                day: d,
                date,
                record: record.cloned(),
                suggested_overtime_multiplier: suggested_multiplier(date, record),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(MonthCalendar {
        summary: stats::summarize(&employee_id, sheet),
        employee_id,
        year,
        month: month.get(),
        days,
    }))
}

/// Set or clear one day (Admin)
#[utoipa::path(
    put,
    path = "/api/attendance/{employee_id}/{year}/{month}/{day}",
    params(
        ("employee_id" = String, Path, description = "Employee id"),
        ("year" = i32, Path, description = "Year"),
        ("month" = u8, Path, description = "Month, 1-12"),
        ("day" = u8, Path, description = "Day of month")
    ),
    request_body = DayEdit,
    responses(
        (status = 200, description = "Day saved or cleared", body = Object, example = json!({
            "message": "Attendance saved"
        })),
        (status = 400, description = "Invalid date"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn set_day(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    path: web::Path<(String, i32, u8, u8)>,
    payload: web::Json<DayEdit>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let (employee_id, year, month, day) = path.into_inner();
    let date = NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day))
        .ok_or_else(|| AppError::validation("Invalid date"))?;
    let key = AttendanceKey::for_date(employee_id, date);

    let record = match payload.status {
        None => None,
        Some(status) => {
            let existing = attendance_store::fetch_record(pool.get_ref(), &key).await?;
            let multiplier = payload
                .overtime_multiplier
                .unwrap_or_else(|| suggested_multiplier(date, existing.as_ref()));

            let mut record = AttendanceRecord::new(status, clock_label(Local::now().time()));
            attach_overtime(&mut record, payload.overtime_hours, multiplier);
            Some(record)
        }
    };
    let message = if record.is_some() {
        "Attendance saved"
    } else {
        "Attendance cleared"
    };
    let write = DayWrite::from(record);

    attendance_store::apply_write(pool.get_ref(), &AttendanceWrite { key: key.clone(), write }).await?;
    feed.publish(Table::Attendance);

    tracing::info!(
        admin = %auth.username,
        employee_id = %key.employee_id,
        month = key.month.get(),
        day = %key.day,
        action = message,
        "Manual attendance edit"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message })))
}

/// Apply one status to many employees and dates
#[utoipa::path(
    post,
    path = "/api/attendance/bulk",
    request_body = BulkRequest,
    responses(
        (status = 200, description = "All rows written", body = Object, example = json!({
            "message": "Attendance saved for 3 employees on 2 days",
            "written": 6
        })),
        (status = 400, description = "Nothing selected"),
        (status = 403, description = "Employees outside your scope"),
        (status = 500, description = "Nothing was written")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn bulk(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    payload: web::Json<BulkRequest>,
) -> AppResult<HttpResponse> {
    let scope = auth.scope();
    if payload
        .employee_ids
        .iter()
        .map(|id| id.trim())
        .any(|id| !id.is_empty() && !scope.admits(id))
    {
        return Err(AppError::Forbidden("You can only assign attendance to yourself"));
    }

    let payload = payload.into_inner();
    let assignment = BulkAssignment {
        employee_ids: payload.employee_ids,
        dates: payload.dates,
        status: payload.status,
        timestamp: clock_label(Local::now().time()),
        overtime_hours: payload.overtime_hours,
        overtime_multiplier: payload.overtime_multiplier,
    };

    let writes = assignment.expand()?;
    let written = attendance_store::apply_all(pool.get_ref(), &writes).await?;
    feed.publish(Table::Attendance);

    let employees = writes
        .iter()
        .map(|w| w.key.employee_id.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    let days = written / employees.max(1);

    tracing::info!(by = %auth.username, written, "Bulk attendance saved");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Attendance saved for {employees} employees on {days} days"),
        "written": written
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn punch(latitude: Option<f64>, longitude: Option<f64>) -> PunchRequest {
        PunchRequest {
            latitude,
            longitude,
            device_info: None,
        }
    }

    #[test]
    fn location_needs_both_coordinates() {
        assert_eq!(
            punch(Some(10.0), Some(106.0)).location(),
            Some(GeoPoint::new(10.0, 106.0))
        );
        assert_eq!(punch(Some(10.0), None).location(), None);
        assert_eq!(punch(None, None).location(), None);
        assert_eq!(punch(Some(f64::NAN), Some(106.0)).location(), None);
    }

    #[test]
    fn null_status_clears_the_day() {
        let edit: DayEdit = serde_json::from_value(serde_json::json!({ "status": null })).unwrap();
        assert!(edit.status.is_none());

        let edit: DayEdit = serde_json::from_value(serde_json::json!({
            "status": "halfday",
            "overtime_hours": 2.0
        }))
        .unwrap();
        assert_eq!(edit.status, Some(AttendanceStatus::Halfday));
        assert!(edit.overtime_multiplier.is_none());
    }

    #[test]
    fn month_outside_range_is_rejected() {
        assert!(month_of(13).is_err());
        assert_eq!(month_of(12).unwrap().get(), 12);
    }
}
