use anyhow::{Context, Result};
use sqlx::MySqlPool;

pub async fn init_db(database_url: &str, run_migrations: bool) -> Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    if run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Migrations applied");
    }

    Ok(pool)
}
