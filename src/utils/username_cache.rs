use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// username (lowercase) => id of the employee holding it
pub static USERNAME_CACHE: Lazy<Cache<String, String>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

pub async fn mark_taken(username: &str, employee_id: &str) {
    USERNAME_CACHE
        .insert(normalize(username), employee_id.to_string())
        .await;
}

pub async fn release(username: &str) {
    USERNAME_CACHE.invalidate(&normalize(username)).await;
}

/// Employee holding `username`: the cache answers positives, the database
/// everything else.
pub async fn owner_of(username: &str, pool: &MySqlPool) -> Result<Option<String>, sqlx::Error> {
    let username = normalize(username);

    if let Some(owner) = USERNAME_CACHE.get(&username).await {
        return Ok(Some(owner));
    }

    let owner = sqlx::query_scalar::<_, String>(
        "SELECT id FROM employees WHERE LOWER(username) = ? LIMIT 1",
    )
    .bind(&username)
    .fetch_optional(pool)
    .await?;

    if let Some(owner) = &owner {
        USERNAME_CACHE.insert(username, owner.clone()).await;
    }

    Ok(owner)
}

/// True when nobody but `employee_id` (if given) holds `username`.
pub async fn is_available(
    username: &str,
    employee_id: Option<&str>,
    pool: &MySqlPool,
) -> Result<bool, sqlx::Error> {
    Ok(match owner_of(username, pool).await? {
        None => true,
        Some(owner) => Some(owner.as_str()) == employee_id,
    })
}

/// Load every username into the cache, in batches.
pub async fn warmup_username_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String, String)>(
        "SELECT username, id FROM employees WHERE username IS NOT NULL",
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(row?);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    tracing::info!(total_count, "Username cache warmup complete");

    Ok(())
}

async fn batch_mark(rows: &[(String, String)]) {
    let futures: Vec<_> = rows
        .iter()
        .map(|(username, id)| USERNAME_CACHE.insert(normalize(username), id.clone()))
        .collect();

    futures::future::join_all(futures).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marked_usernames_are_case_insensitive() {
        mark_taken("  Cache.Test.User ", "ID777").await;
        assert_eq!(
            USERNAME_CACHE.get("cache.test.user").await.as_deref(),
            Some("ID777")
        );

        release("CACHE.TEST.USER").await;
        assert!(USERNAME_CACHE.get("cache.test.user").await.is_none());
    }
}
