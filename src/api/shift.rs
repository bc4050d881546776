use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::shift::{EmployeeSchedule, Shift},
    utils::change_feed::{ChangeFeed, Table},
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ScheduleQuery {
    pub year: Option<i32>,
    /// 1-12
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignShift {
    #[schema(example = "ID002")]
    pub employee_id: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// `null` clears the day.
    #[schema(example = 1, nullable = true)]
    pub shift_id: Option<u64>,
}

/// First day of the month and first day of the next.
fn month_bounds(year: i32, month: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let invalid = || AppError::validation("month must be between 1 and 12");
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((start, end))
}

/// Shift catalogue
#[utoipa::path(
    get,
    path = "/api/shifts",
    responses(
        (status = 200, description = "Shifts ordered by start time", body = [Shift])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shifts"
)]
pub async fn list_shifts(_auth: AuthUser, pool: web::Data<MySqlPool>) -> HttpResponse {
    let shifts = sqlx::query_as::<_, Shift>(
        "SELECT id, name, start_time, end_time, color FROM shifts ORDER BY start_time ASC",
    )
    .fetch_all(pool.get_ref())
    .await;

    match shifts {
        Ok(shifts) if !shifts.is_empty() => HttpResponse::Ok().json(shifts),
        Ok(_) => HttpResponse::Ok().json(Shift::defaults()),
        Err(e) => {
            tracing::warn!(error = %e, "Shifts unavailable, serving defaults");
            HttpResponse::Ok().json(Shift::defaults())
        }
    }
}

/// Schedules for one month
#[utoipa::path(
    get,
    path = "/api/schedules",
    params(ScheduleQuery),
    responses(
        (status = 200, description = "Assignments in the month", body = [EmployeeSchedule]),
        (status = 400, description = "Invalid month")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shifts"
)]
pub async fn list_schedules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ScheduleQuery>,
) -> AppResult<HttpResponse> {
    let today = Local::now().date_naive();
    let (start, end) = month_bounds(
        query.year.unwrap_or_else(|| today.year()),
        query.month.unwrap_or_else(|| today.month()),
    )?;

    let scope = auth.scope();
    let mut sql = String::from(
        "SELECT id, employee_id, date, shift_id FROM employee_schedules WHERE date >= ? AND date < ?",
    );
    if scope.employee_id().is_some() {
        sql.push_str(" AND employee_id = ?");
    }
    sql.push_str(" ORDER BY date ASC, employee_id ASC");

    let mut q = sqlx::query_as::<_, EmployeeSchedule>(&sql).bind(start).bind(end);
    if let Some(id) = scope.employee_id() {
        q = q.bind(id);
    }

    Ok(HttpResponse::Ok().json(q.fetch_all(pool.get_ref()).await?))
}

/// Assign or clear a shift (Admin)
#[utoipa::path(
    put,
    path = "/api/schedules",
    request_body = AssignShift,
    responses(
        (status = 200, description = "Schedule saved", body = Object, example = json!({
            "message": "Shift assigned"
        })),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shifts"
)]
pub async fn assign_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    payload: web::Json<AssignShift>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let message = match payload.shift_id {
        Some(shift_id) => {
            sqlx::query(
                r#"
                INSERT INTO employee_schedules (employee_id, date, shift_id)
                VALUES (?, ?, ?)
                ON DUPLICATE KEY UPDATE shift_id = VALUES(shift_id)
                "#,
            )
            .bind(&payload.employee_id)
            .bind(payload.date)
            .bind(shift_id)
            .execute(pool.get_ref())
            .await?;
            "Shift assigned"
        }
        None => {
            sqlx::query("DELETE FROM employee_schedules WHERE employee_id = ? AND date = ?")
                .bind(&payload.employee_id)
                .bind(payload.date)
                .execute(pool.get_ref())
                .await?;
            "Shift cleared"
        }
    };
    feed.publish(Table::EmployeeSchedules);

    tracing::info!(
        employee_id = %payload.employee_id,
        date = %payload.date,
        shift_id = ?payload.shift_id,
        "{message}"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn december_rolls_into_next_year() {
        let (start, end) = month_bounds(2026, 12).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(month_bounds(2026, 13).is_err());
    }

    #[test]
    fn null_shift_clears_the_day() {
        let body: AssignShift = serde_json::from_value(serde_json::json!({
            "employee_id": "ID002",
            "date": "2026-01-05",
            "shift_id": null
        }))
        .unwrap();
        assert!(body.shift_id.is_none());
    }
}
