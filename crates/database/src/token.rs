//! Token storage operations.
//!
//! The issued -> used transition is a single conditional UPDATE keyed on the
//! expected prior state. Under concurrent redemption of the same code exactly
//! one statement reports an affected row; every other caller observes the
//! changed state and classifies the failure from a re-read.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Token;

/// Insert a newly issued token.
///
/// Fails with [`DatabaseError::AlreadyExists`] on a code collision so the
/// caller can regenerate and retry.
pub async fn create_token(pool: &SqlitePool, token: &Token) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tokens (code, phone, status, created_at, expires_at, used_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&token.code)
    .bind(&token.phone)
    .bind(&token.status)
    .bind(&token.created_at)
    .bind(&token.expires_at)
    .bind(&token.used_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Token",
                    id: token.code.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get a token by code, or None if it was never issued.
pub async fn get_token(pool: &SqlitePool, code: &str) -> Result<Option<Token>> {
    let token = sqlx::query_as::<_, Token>(
        r#"
        SELECT code, phone, status, created_at, expires_at, used_at
        FROM tokens
        WHERE code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(token)
}

/// Atomically transition a token from issued to used.
///
/// Returns true if this call won the transition. False means the token was
/// missing, already used, expired (by status or by `expires_at <= now`),
/// or deleted; re-read to distinguish.
pub async fn mark_used_if_issued(pool: &SqlitePool, code: &str, now: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tokens
        SET status = 'used', used_at = ?2
        WHERE code = ?1 AND status = 'issued' AND expires_at > ?2
        "#,
    )
    .bind(code)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Lazily transition a single past-expiry issued token to expired.
pub async fn mark_expired_if_due(pool: &SqlitePool, code: &str, now: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tokens
        SET status = 'expired'
        WHERE code = ?1 AND status = 'issued' AND expires_at <= ?2
        "#,
    )
    .bind(code)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Lazily transition every past-expiry issued token to expired.
///
/// Called before listing so stored status matches observable status; there
/// is no background sweep.
pub async fn expire_due(pool: &SqlitePool, now: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE tokens
        SET status = 'expired'
        WHERE status = 'issued' AND expires_at <= ?
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Revert a just-consumed token to issued.
///
/// Only used when the redemption policy leaves ineligible tokens retryable.
pub async fn restore_issued(pool: &SqlitePool, code: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tokens
        SET status = 'issued', used_at = NULL
        WHERE code = ? AND status = 'used'
        "#,
    )
    .bind(code)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Soft-delete an issued or expired token.
///
/// Returns true if the token was deleted. False means the token was missing,
/// already deleted, or used; used tokens must never be deleted.
pub async fn mark_deleted(pool: &SqlitePool, code: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tokens
        SET status = 'deleted'
        WHERE code = ? AND status IN ('issued', 'expired')
        "#,
    )
    .bind(code)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// List tokens newest-first, optionally filtered by status.
pub async fn list_tokens(
    pool: &SqlitePool,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<Token>> {
    let tokens = sqlx::query_as::<_, Token>(
        r#"
        SELECT code, phone, status, created_at, expires_at, used_at
        FROM tokens
        WHERE (?1 IS NULL OR status = ?1)
        ORDER BY created_at DESC, code
        LIMIT ?2
        "#,
    )
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn issued(code: &str, created_at: &str, expires_at: &str) -> Token {
        Token {
            code: code.to_string(),
            phone: None,
            status: "issued".to_string(),
            created_at: created_at.to_string(),
            expires_at: expires_at.to_string(),
            used_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_token_collision() {
        let db = test_db().await;
        let token = issued("K7DWMQ4R", "2026-01-01T00:00:00.000000Z", "2026-01-02T00:00:00.000000Z");

        create_token(db.pool(), &token).await.unwrap();
        let result = create_token(db.pool(), &token).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_mark_used_is_single_shot() {
        let db = test_db().await;
        let token = issued("AAAA1111", "2026-01-01T00:00:00.000000Z", "2026-01-02T00:00:00.000000Z");
        create_token(db.pool(), &token).await.unwrap();

        let now = "2026-01-01T12:00:00.000000Z";
        assert!(mark_used_if_issued(db.pool(), "AAAA1111", now).await.unwrap());
        // Second attempt loses: status is no longer issued.
        assert!(!mark_used_if_issued(db.pool(), "AAAA1111", now).await.unwrap());

        let stored = get_token(db.pool(), "AAAA1111").await.unwrap().unwrap();
        assert_eq!(stored.status, "used");
        assert_eq!(stored.used_at.as_deref(), Some(now));
    }

    #[tokio::test]
    async fn test_mark_used_refuses_past_expiry() {
        let db = test_db().await;
        let token = issued("BBBB2222", "2026-01-01T00:00:00.000000Z", "2026-01-02T00:00:00.000000Z");
        create_token(db.pool(), &token).await.unwrap();

        let later = "2026-01-03T00:00:00.000000Z";
        assert!(!mark_used_if_issued(db.pool(), "BBBB2222", later).await.unwrap());
        assert!(mark_expired_if_due(db.pool(), "BBBB2222", later).await.unwrap());

        let stored = get_token(db.pool(), "BBBB2222").await.unwrap().unwrap();
        assert_eq!(stored.status, "expired");
        assert!(stored.used_at.is_none());
    }

    #[tokio::test]
    async fn test_restore_issued() {
        let db = test_db().await;
        let token = issued("CCCC3333", "2026-01-01T00:00:00.000000Z", "2026-01-02T00:00:00.000000Z");
        create_token(db.pool(), &token).await.unwrap();

        let now = "2026-01-01T06:00:00.000000Z";
        assert!(mark_used_if_issued(db.pool(), "CCCC3333", now).await.unwrap());
        assert!(restore_issued(db.pool(), "CCCC3333").await.unwrap());

        let stored = get_token(db.pool(), "CCCC3333").await.unwrap().unwrap();
        assert_eq!(stored.status, "issued");
        assert!(stored.used_at.is_none());

        // Restoring an issued token is a no-op.
        assert!(!restore_issued(db.pool(), "CCCC3333").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let db = test_db().await;
        let now = "2026-01-01T06:00:00.000000Z";

        let live = issued("DDDD4444", "2026-01-01T00:00:00.000000Z", "2026-01-02T00:00:00.000000Z");
        create_token(db.pool(), &live).await.unwrap();
        let spent = issued("EEEE5555", "2026-01-01T00:00:00.000000Z", "2026-01-02T00:00:00.000000Z");
        create_token(db.pool(), &spent).await.unwrap();
        mark_used_if_issued(db.pool(), "EEEE5555", now).await.unwrap();

        // Issued tokens can be deleted; used tokens cannot.
        assert!(mark_deleted(db.pool(), "DDDD4444").await.unwrap());
        assert!(!mark_deleted(db.pool(), "EEEE5555").await.unwrap());
        // Deleting twice is not a deletion.
        assert!(!mark_deleted(db.pool(), "DDDD4444").await.unwrap());

        let stored = get_token(db.pool(), "EEEE5555").await.unwrap().unwrap();
        assert_eq!(stored.status, "used");
    }

    #[tokio::test]
    async fn test_expire_due_and_list_filter() {
        let db = test_db().await;
        let fresh = issued("FFFF6666", "2026-01-02T00:00:00.000000Z", "2026-01-03T00:00:00.000000Z");
        let stale = issued("GGGG7777", "2026-01-01T00:00:00.000000Z", "2026-01-01T12:00:00.000000Z");
        create_token(db.pool(), &fresh).await.unwrap();
        create_token(db.pool(), &stale).await.unwrap();

        let swept = expire_due(db.pool(), "2026-01-02T00:00:00.000000Z").await.unwrap();
        assert_eq!(swept, 1);

        let all = list_tokens(db.pool(), None, 50).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].code, "FFFF6666");

        let expired = list_tokens(db.pool(), Some("expired"), 50).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].code, "GGGG7777");
    }
}
