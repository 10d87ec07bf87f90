//! SQLite store access.
//!
//! Queries use the runtime-verified `sqlx::query_as` form deliberately so
//! that no `DATABASE_URL` is needed at compile time.  Migrations live in
//! `./migrations` and are embedded into the binary by `sqlx::migrate!`.

use crate::db_types::{BlogPost, CallLog, CallStats, PhoneRecord, PhoneStats, RecentCall};
use crate::db_types::PhoneStatus;
use crate::twilio_types::CallStatus;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::time::OffsetDateTime;
use sqlx::SqlitePool;
use std::str::FromStr;

const PHONE_COLUMNS: &str = "id, number, name, status, uploaded_at, created_at, updated_at";

const CALL_LOG_COLUMNS: &str =
    "id, phone_number_id, call_sid, status, duration, started_at, ended_at, created_at";

const BLOG_COLUMNS: &str = "id, title, content, author, published_at, created_at";

/// Open (or create) the SQLite database at `url` and run pending migrations.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Whether an insert failed on a UNIQUE constraint rather than a real fault.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

pub struct PhoneRepo;

impl PhoneRepo {
    pub async fn insert(
        pool: &SqlitePool,
        number: &str,
        name: &str,
    ) -> Result<PhoneRecord, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        let query = format!(
            "INSERT INTO phone_numbers (number, name, status, uploaded_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING {PHONE_COLUMNS}"
        );
        sqlx::query_as::<_, PhoneRecord>(&query)
            .bind(number)
            .bind(name)
            .bind(PhoneStatus::Pending)
            .bind(now)
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<PhoneRecord>, sqlx::Error> {
        let query = format!("SELECT {PHONE_COLUMNS} FROM phone_numbers WHERE id = ?1");
        sqlx::query_as::<_, PhoneRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_number(
        pool: &SqlitePool,
        number: &str,
    ) -> Result<Option<PhoneRecord>, sqlx::Error> {
        let query = format!("SELECT {PHONE_COLUMNS} FROM phone_numbers WHERE number = ?1");
        sqlx::query_as::<_, PhoneRecord>(&query)
            .bind(number)
            .fetch_optional(pool)
            .await
    }

    /// Up to `limit` records still waiting to be dialed, in store order.
    pub async fn find_pending(
        pool: &SqlitePool,
        limit: i64,
    ) -> Result<Vec<PhoneRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {PHONE_COLUMNS} FROM phone_numbers WHERE status = ?1 ORDER BY id LIMIT ?2"
        );
        sqlx::query_as::<_, PhoneRecord>(&query)
            .bind(PhoneStatus::Pending)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: i64,
        status: PhoneStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE phone_numbers SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status)
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// All records grouped by status, oldest first within each group.
    pub async fn list_by_status(pool: &SqlitePool) -> Result<Vec<PhoneRecord>, sqlx::Error> {
        let query =
            format!("SELECT {PHONE_COLUMNS} FROM phone_numbers ORDER BY status, created_at");
        sqlx::query_as::<_, PhoneRecord>(&query).fetch_all(pool).await
    }

    pub async fn list(pool: &SqlitePool, limit: i64) -> Result<Vec<PhoneRecord>, sqlx::Error> {
        let query = format!("SELECT {PHONE_COLUMNS} FROM phone_numbers ORDER BY id LIMIT ?1");
        sqlx::query_as::<_, PhoneRecord>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn stats(pool: &SqlitePool) -> Result<PhoneStats, sqlx::Error> {
        let (total, pending, called, failed): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
             COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN status = 'called' THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) \
             FROM phone_numbers",
        )
        .fetch_one(pool)
        .await?;
        Ok(PhoneStats {
            total,
            pending,
            called,
            failed,
        })
    }
}

pub struct CallLogRepo;

impl CallLogRepo {
    pub async fn insert(
        pool: &SqlitePool,
        phone_number_id: i64,
        call_sid: &str,
        status: CallStatus,
        started_at: Option<OffsetDateTime>,
        duration: Option<i64>,
    ) -> Result<CallLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO call_logs (phone_number_id, call_sid, status, duration, started_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING {CALL_LOG_COLUMNS}"
        );
        sqlx::query_as::<_, CallLog>(&query)
            .bind(phone_number_id)
            .bind(call_sid)
            .bind(status)
            .bind(duration)
            .bind(started_at)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(pool)
            .await
    }

    /// Look up a call log by provider identifier, scoped to its record.
    pub async fn find_by_sid(
        pool: &SqlitePool,
        phone_number_id: i64,
        call_sid: &str,
    ) -> Result<Option<CallLog>, sqlx::Error> {
        let query = format!(
            "SELECT {CALL_LOG_COLUMNS} FROM call_logs \
             WHERE phone_number_id = ?1 AND call_sid = ?2"
        );
        sqlx::query_as::<_, CallLog>(&query)
            .bind(phone_number_id)
            .bind(call_sid)
            .fetch_optional(pool)
            .await
    }

    /// Reconcile a delivery event into an existing log.  `ended_at` is set
    /// only for completed calls and cleared otherwise.
    pub async fn update_delivery(
        pool: &SqlitePool,
        id: i64,
        status: CallStatus,
        duration: i64,
        ended_at: Option<OffsetDateTime>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE call_logs SET status = ?1, duration = ?2, ended_at = ?3 WHERE id = ?4")
            .bind(status)
            .bind(duration)
            .bind(ended_at)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn for_phone_number(
        pool: &SqlitePool,
        phone_number_id: i64,
    ) -> Result<Vec<CallLog>, sqlx::Error> {
        let query = format!(
            "SELECT {CALL_LOG_COLUMNS} FROM call_logs \
             WHERE phone_number_id = ?1 ORDER BY id DESC"
        );
        sqlx::query_as::<_, CallLog>(&query)
            .bind(phone_number_id)
            .fetch_all(pool)
            .await
    }

    pub async fn stats(pool: &SqlitePool) -> Result<CallStats, sqlx::Error> {
        let (successful, failed): (i64, i64) = sqlx::query_as(
            "SELECT \
             COALESCE(SUM(CASE WHEN status IN ('answered', 'completed') THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN status IN ('busy', 'no-answer', 'failed') THEN 1 ELSE 0 END), 0) \
             FROM call_logs",
        )
        .fetch_one(pool)
        .await?;
        Ok(CallStats { successful, failed })
    }

    pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<RecentCall>, sqlx::Error> {
        sqlx::query_as::<_, RecentCall>(
            "SELECT cl.id, pn.number, pn.name, cl.status, cl.duration, cl.created_at \
             FROM call_logs cl \
             JOIN phone_numbers pn ON pn.id = cl.phone_number_id \
             ORDER BY cl.id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

pub struct BlogRepo;

impl BlogRepo {
    pub async fn insert(
        pool: &SqlitePool,
        title: &str,
        content: &str,
        author: &str,
        published_at: Option<OffsetDateTime>,
    ) -> Result<BlogPost, sqlx::Error> {
        let query = format!(
            "INSERT INTO blog_posts (title, content, author, published_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             RETURNING {BLOG_COLUMNS}"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(title)
            .bind(content)
            .bind(author)
            .bind(published_at)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<BlogPost>, sqlx::Error> {
        let query = format!("SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = ?1");
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_published(pool: &SqlitePool) -> Result<Vec<BlogPost>, sqlx::Error> {
        let query = format!(
            "SELECT {BLOG_COLUMNS} FROM blog_posts \
             WHERE published_at IS NOT NULL ORDER BY published_at DESC"
        );
        sqlx::query_as::<_, BlogPost>(&query).fetch_all(pool).await
    }
}
