use std::sync::Arc;

use actix_web::web;
use sqlx::MySqlPool;
use tokio::sync::broadcast::error::RecvError;

use crate::model::settings::SystemSettings;
use crate::utils::change_feed::{ChangeFeed, Table};
use crate::utils::snapshot::VersionedSnapshot;

pub type SettingsSnapshot = VersionedSnapshot<SystemSettings>;

pub async fn load(pool: &MySqlPool) -> Result<SystemSettings, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String)>("SELECT `key`, `value` FROM system_settings")
        .fetch_all(pool)
        .await?;

    Ok(SystemSettings::from_pairs(rows))
}

pub async fn save(pool: &MySqlPool, settings: &SystemSettings) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for (key, value) in settings.to_pairs() {
        sqlx::query(
            r#"
            INSERT INTO system_settings (`key`, `value`)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE `value` = VALUES(`value`)
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Reloads the snapshot. Returns false when a newer reload won the race.
pub async fn reload(snapshot: &SettingsSnapshot, pool: &MySqlPool) -> Result<bool, sqlx::Error> {
    let ticket = snapshot.begin();
    let settings = load(pool).await?;
    Ok(snapshot.commit(ticket, settings))
}

/// The loaded settings, fetched from the database when the snapshot is
/// still empty (e.g. the startup load failed).
pub async fn current(snapshot: &SettingsSnapshot, pool: &MySqlPool) -> Option<Arc<SystemSettings>> {
    match snapshot.get_or_load(|| load(pool)).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load system settings");
            None
        }
    }
}

/// Keeps the snapshot fresh: every `system_settings` change triggers a
/// reload. Reloads may overlap; the snapshot keeps the newest.
pub async fn watch(feed: ChangeFeed, snapshot: web::Data<SettingsSnapshot>, pool: MySqlPool) {
    let mut rx = feed.subscribe();

    loop {
        match rx.recv().await {
            Ok(change) if change.table != Table::SystemSettings => continue,
            Ok(_) | Err(RecvError::Lagged(_)) => {
                let snapshot = snapshot.clone();
                let pool = pool.clone();
                actix_web::rt::spawn(async move {
                    match reload(&snapshot, &pool).await {
                        Ok(true) => tracing::info!(version = snapshot.version(), "System settings reloaded"),
                        Ok(false) => {}
                        Err(e) => tracing::error!(error = %e, "Failed to reload system settings"),
                    }
                });
            }
            Err(RecvError::Closed) => break,
        }
    }
}
