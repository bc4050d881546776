use crate::api::attendance::{
    BulkRequest, CalendarDay, DayEdit, MonthCalendar, PunchRequest, PunchResponse, TodayResponse,
};
use crate::api::employee::{CreateEmployee, UpdateEmployee};
use crate::api::request::CreateRequest;
use crate::api::shift::AssignShift;
use crate::attendance::decision::GeofenceWarning;
use crate::attendance::stats::{
    DailyTrend, DashboardStats, GroupStats, MonthSummary, OrgStatistics, StatusCounts, Tally,
    TimelineRow,
};
use crate::auth::handlers::{ChangePasswordReq, LoginResponse};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, GeoPoint};
use crate::model::employee::Employee;
use crate::model::request::{Request, RequestStatus, RequestType};
use crate::model::role::Role;
use crate::model::settings::SystemSettings;
use crate::model::shift::{EmployeeSchedule, Shift};
use crate::models::LoginReqDto;
use crate::utils::change_feed::{Table, TableChange};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo Attendance API",
        version = "1.0.0",
        description = r#"
## Geofenced Attendance Service

Employees check in and out from their phones; the service classifies each
punch against the configured work hours and measures the distance to the
office.

### 🔹 Key Features
- **Attendance**
  - Check-in / check-out with late, early-leave and geofence detection
  - Monthly calendar, manual edits and bulk assignment
- **Statistics**
  - Work days, weighted overtime, per-department tallies and a timeline grid
- **Requests**
  - Leave and overtime requests with approval
- **Employees, settings and shifts**

### 🔐 Security
Endpoints under `/api` require a **JWT Bearer** access token.
Admins see the whole organization; everyone else sees only their own data.

### 🔄 Changes
`GET /api/changes` streams table change notifications as server-sent events.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::bootstrap,
        crate::auth::handlers::change_password,

        crate::api::attendance::today,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::month_calendar,
        crate::api::attendance::set_day,
        crate::api::attendance::bulk,

        crate::api::statistics::organization,
        crate::api::statistics::summary,
        crate::api::statistics::timeline,

        crate::api::request::list_requests,
        crate::api::request::create_request,
        crate::api::request::approve_request,
        crate::api::request::reject_request,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings,

        crate::api::shift::list_shifts,
        crate::api::shift::list_schedules,
        crate::api::shift::assign_shift,

        crate::api::changes::changes
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            ChangePasswordReq,
            Role,
            AttendanceStatus,
            AttendanceRecord,
            GeoPoint,
            GeofenceWarning,
            PunchRequest,
            PunchResponse,
            TodayResponse,
            CalendarDay,
            MonthCalendar,
            DayEdit,
            BulkRequest,
            StatusCounts,
            MonthSummary,
            DashboardStats,
            Tally,
            GroupStats,
            DailyTrend,
            OrgStatistics,
            TimelineRow,
            Request,
            RequestType,
            RequestStatus,
            CreateRequest,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            SystemSettings,
            Shift,
            EmployeeSchedule,
            AssignShift,
            Table,
            TableChange
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Session and password APIs"),
        (name = "Attendance", description = "Check-in, check-out and attendance sheet APIs"),
        (name = "Statistics", description = "Monthly rollups"),
        (name = "Requests", description = "Leave and overtime request APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Settings", description = "Work hours and geofence"),
        (name = "Shifts", description = "Shift catalogue and schedules"),
        (name = "Changes", description = "Table change notifications"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/api/attendance/check-in",
            "/api/attendance/{employee_id}/{year}/{month}/{day}",
            "/api/statistics/summary",
            "/api/requests/{id}/approve",
            "/api/settings",
            "/api/changes",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
