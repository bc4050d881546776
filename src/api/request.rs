use crate::{
    attendance::{bulk::leave_writes, decision::clock_label},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::request::{Request, RequestRow, RequestStatus, RequestType, dates_in_range},
    store::attendance as attendance_store,
    utils::change_feed::{ChangeFeed, Table},
};
use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequest {
    #[serde(rename = "type")]
    #[schema(example = "leave")]
    pub request_type: RequestType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family matters")]
    pub reason: String,
}

/// Longest range a single request may cover, in days.
const MAX_REQUEST_DAYS: i64 = 366;

impl CreateRequest {
    fn validate(&self) -> AppResult<()> {
        if self.start_date > self.end_date {
            return Err(AppError::validation("start_date cannot be after end_date"));
        }
        if (self.end_date - self.start_date).num_days() >= MAX_REQUEST_DAYS {
            return Err(AppError::validation(format!(
                "A request may cover at most {MAX_REQUEST_DAYS} days"
            )));
        }
        if self.reason.trim().is_empty() {
            return Err(AppError::validation("reason is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RequestFilter {
    /// Only pending requests
    pub pending: Option<bool>,
}

const SELECT_REQUESTS: &str = r#"
    SELECT
        r.id,
        r.employee_id,
        e.name AS employee_name,
        e.avatar,
        r.type AS request_type,
        r.start_date,
        r.end_date,
        r.reason,
        r.status,
        r.created_at
    FROM requests r
    LEFT JOIN employees e ON e.id = r.employee_id
    WHERE 1=1
"#;

/// Submit a leave or overtime request
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body(
        content = CreateRequest,
        description = "Request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Request submitted", body = Object, example = json!({
            "message": "Request submitted",
            "status": "pending"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn create_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    payload: web::Json<CreateRequest>,
) -> AppResult<HttpResponse> {
    payload.validate()?;

    sqlx::query(
        r#"
        INSERT INTO requests
            (employee_id, type, start_date, end_date, reason)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&auth.employee_id)
    .bind(payload.request_type.as_ref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.reason.trim())
    .execute(pool.get_ref())
    .await?;
    feed.publish(Table::Requests);

    tracing::info!(
        employee_id = %auth.employee_id,
        request_type = %payload.request_type,
        "Request submitted"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Request submitted",
        "status": RequestStatus::Pending
    })))
}

/// List requests, newest first
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestFilter),
    responses(
        (status = 200, description = "All requests for admins, own requests otherwise", body = [Request]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn list_requests(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RequestFilter>,
) -> AppResult<HttpResponse> {
    let scope = auth.scope();
    let mut sql = String::from(SELECT_REQUESTS);

    if scope.employee_id().is_some() {
        sql.push_str(" AND r.employee_id = ?");
    }
    if query.pending.unwrap_or(false) {
        sql.push_str(" AND r.status = 'pending'");
    }
    sql.push_str(" ORDER BY r.created_at DESC, r.id DESC");

    let mut q = sqlx::query_as::<_, RequestRow>(&sql);
    if let Some(id) = scope.employee_id() {
        q = q.bind(id);
    }

    let rows = q.fetch_all(pool.get_ref()).await?;
    let requests: Vec<Request> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id;
            Request::try_from(row)
                .map_err(|e| tracing::warn!(request_id = id, error = %e, "Skipping malformed request row"))
                .ok()
        })
        .collect();

    Ok(HttpResponse::Ok().json(requests))
}

/// Moves a pending request to `next`; approved leave also lands on the
/// attendance sheet, in the same transaction.
async fn decide(pool: &MySqlPool, id: u64, next: RequestStatus) -> AppResult<Request> {
    let mut tx = pool.begin().await?;

    let sql = format!("{SELECT_REQUESTS} AND r.id = ? FOR UPDATE");
    let row = sqlx::query_as::<_, RequestRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Request not found"))?;

    let mut request = Request::try_from(row).map_err(|e| {
        tracing::error!(request_id = id, error = %e, "Malformed request row");
        AppError::AlreadyDecided
    })?;

    if !request.status.can_transition_to(next) {
        return Err(AppError::AlreadyDecided);
    }

    let result = sqlx::query("UPDATE requests SET status = ? WHERE id = ? AND status = 'pending'")
        .bind(next.as_ref())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::AlreadyDecided);
    }

    if next == RequestStatus::Approved && request.request_type == RequestType::Leave {
        let writes = leave_writes(
            &request.employee_id,
            dates_in_range(request.start_date, request.end_date),
            clock_label(Local::now().time()),
        )?;
        for write in &writes {
            attendance_store::apply_write(&mut *tx, write).await?;
        }
        tracing::info!(request_id = id, days = writes.len(), "Leave written to attendance");
    }

    tx.commit().await?;

    request.status = next;
    Ok(request)
}

/// Approve request (Admin)
#[utoipa::path(
    put,
    path = "/api/requests/{id}/approve",
    params(
        ("id" = u64, Path, description = "ID of the request to approve")
    ),
    responses(
        (status = 200, description = "Request approved", body = Request),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed", body = Object, example = json!({
            "message": "Request not found or already processed"
        })),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn approve_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let request = decide(pool.get_ref(), path.into_inner(), RequestStatus::Approved).await?;
    feed.publish(Table::Requests);
    if request.request_type == RequestType::Leave {
        feed.publish(Table::Attendance);
    }

    tracing::info!(request_id = request.id, by = %auth.username, "Request approved");
    Ok(HttpResponse::Ok().json(request))
}

/// Reject request (Admin)
#[utoipa::path(
    put,
    path = "/api/requests/{id}/reject",
    params(
        ("id" = u64, Path, description = "ID of the request to reject")
    ),
    responses(
        (status = 200, description = "Request rejected", body = Request),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn reject_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let request = decide(pool.get_ref(), path.into_inner(), RequestStatus::Rejected).await?;
    feed.publish(Table::Requests);

    tracing::info!(request_id = request.id, by = %auth.username, "Request rejected");
    Ok(HttpResponse::Ok().json(request))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(start: u32, end: u32, reason: &str) -> CreateRequest {
        CreateRequest {
            request_type: RequestType::Leave,
            start_date: NaiveDate::from_ymd_opt(2026, 3, start).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, end).unwrap(),
            reason: reason.into(),
        }
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(matches!(body(5, 4, "trip").validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn blank_reason_is_rejected() {
        assert!(matches!(body(4, 5, "  ").validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn single_day_request_is_valid() {
        assert!(body(4, 4, "doctor").validate().is_ok());
    }

    #[test]
    fn range_is_capped_at_a_leap_year() {
        let mut request = body(1, 1, "sabbatical");
        request.start_date = NaiveDate::from_ymd_opt(2028, 1, 1).unwrap();

        request.end_date = NaiveDate::from_ymd_opt(2028, 12, 31).unwrap();
        assert!(request.validate().is_ok());

        request.end_date = NaiveDate::from_ymd_opt(2029, 1, 1).unwrap();
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));

        request.end_date = NaiveDate::from_ymd_opt(2128, 1, 1).unwrap();
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn type_field_is_renamed() {
        let parsed: CreateRequest = serde_json::from_value(serde_json::json!({
            "type": "overtime",
            "start_date": "2026-03-04",
            "end_date": "2026-03-04",
            "reason": "release"
        }))
        .unwrap();
        assert_eq!(parsed.request_type, RequestType::Overtime);
    }
}
