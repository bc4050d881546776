use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::settings::SystemSettings,
    store::settings::{self as settings_store, SettingsSnapshot},
    utils::change_feed::{ChangeFeed, Table},
};
use actix_web::{HttpResponse, web};
use sqlx::MySqlPool;

/// Current system settings
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Work hours and geofence", body = SystemSettings),
        (status = 400, description = "Settings not loaded yet")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn get_settings(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    snapshot: web::Data<SettingsSnapshot>,
) -> AppResult<HttpResponse> {
    let settings = settings_store::current(&snapshot, pool.get_ref())
        .await
        .ok_or(AppError::SettingsNotLoaded)?;
    Ok(HttpResponse::Ok().json(settings.as_ref()))
}

/// Update system settings (Admin)
#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = SystemSettings,
    responses(
        (status = 200, description = "Settings saved", body = SystemSettings),
        (status = 400, description = "Invalid time, coordinate or radius", body = Object, example = json!({
            "message": "work_start_time must be HH:MM"
        })),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn update_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    snapshot: web::Data<SettingsSnapshot>,
    feed: web::Data<ChangeFeed>,
    payload: web::Json<SystemSettings>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let settings = payload.into_inner();
    settings.validate()?;

    let ticket = snapshot.begin();
    settings_store::save(pool.get_ref(), &settings).await?;
    snapshot.commit(ticket, settings.clone());
    feed.publish(Table::SystemSettings);

    tracing::info!(
        by = %auth.username,
        work_start = %settings.work_start_time,
        work_end = %settings.work_end_time,
        allowed_radius = settings.allowed_radius,
        "System settings updated"
    );

    Ok(HttpResponse::Ok().json(settings))
}
