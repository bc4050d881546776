use crate::{
    attendance::stats,
    auth::auth::{AuthUser, Scope},
    error::{AppError, AppResult},
    model::attendance::MonthNumber,
    store::{attendance as attendance_store, employee as employee_store},
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// 1-12, defaults to the current month
    pub month: Option<u8>,
    /// Admins only; others always get their own summary
    pub employee_id: Option<String>,
    /// Timeline only: restrict to one department
    pub department: Option<String>,
}

impl MonthQuery {
    fn period(&self) -> AppResult<(i32, MonthNumber)> {
        let today = Local::now().date_naive();
        let year = self.year.unwrap_or_else(|| today.year());
        let month = self.month.unwrap_or(today.month() as u8);
        let month = MonthNumber::new(month)
            .ok_or_else(|| AppError::validation("month must be between 1 and 12"))?;
        Ok((year, month))
    }
}

/// Organization statistics for one month
#[utoipa::path(
    get,
    path = "/api/statistics",
    params(MonthQuery),
    responses(
        (status = 200, description = "Totals, per-department tallies and the daily trend", body = OrgStatistics),
        (status = 400, description = "Invalid month")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Statistics"
)]
pub async fn organization(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> AppResult<HttpResponse> {
    let (year, month) = query.period()?;
    let scope = auth.scope();

    let employees = employee_store::list(pool.get_ref(), &scope, None).await?;
    let book = attendance_store::load_month(pool.get_ref(), month, &scope).await?;

    Ok(HttpResponse::Ok().json(stats::organization_statistics(&scope, &employees, &book, year)))
}

/// Work days and overtime for one employee and month
#[utoipa::path(
    get,
    path = "/api/statistics/summary",
    params(MonthQuery),
    responses(
        (status = 200, description = "Month summary", body = MonthSummary),
        (status = 403, description = "Not your attendance")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Statistics"
)]
pub async fn summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> AppResult<HttpResponse> {
    let (_, month) = query.period()?;
    let employee_id = auth.resolve_employee(query.employee_id.as_deref())?;

    let scope = Scope::Employee(employee_id.clone());
    let book = attendance_store::load_month(pool.get_ref(), month, &scope).await?;

    Ok(HttpResponse::Ok().json(stats::summarize(&employee_id, book.sheet(&employee_id))))
}

/// Employee × day grid with short status labels
#[utoipa::path(
    get,
    path = "/api/timeline",
    params(MonthQuery),
    responses(
        (status = 200, description = "One row per visible employee", body = [TimelineRow]),
        (status = 400, description = "Invalid month")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Statistics"
)]
pub async fn timeline(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> AppResult<HttpResponse> {
    let (year, month) = query.period()?;
    let scope = auth.scope();

    let employees = employee_store::list(pool.get_ref(), &scope, None).await?;
    let book = attendance_store::load_month(pool.get_ref(), month, &scope).await?;

    let department = query
        .department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("all"));

    Ok(HttpResponse::Ok().json(stats::timeline(&scope, &employees, &book, year, department)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(month: Option<u8>) -> MonthQuery {
        MonthQuery {
            year: Some(2026),
            month,
            employee_id: None,
            department: None,
        }
    }

    #[test]
    fn explicit_period_is_used() {
        let (year, month) = query(Some(2)).period().unwrap();
        assert_eq!((year, month.get()), (2026, 2));
    }

    #[test]
    fn out_of_range_month_is_rejected() {
        assert!(matches!(query(Some(13)).period(), Err(AppError::Validation(_))));
        assert!(matches!(query(Some(0)).period(), Err(AppError::Validation(_))));
    }

    #[test]
    fn month_defaults_to_current() {
        let (_, month) = query(None).period().unwrap();
        assert_eq!(u32::from(month.get()), Local::now().month());
    }
}
