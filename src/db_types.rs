use crate::twilio_types::CallStatus;

use serde::{Deserialize, Serialize};
use sqlx::types::time::OffsetDateTime;

/// Coarse dial state of a phone record.  A record's status is an
/// eventually-consistent projection of its most recent call log; the two may
/// disagree between call submission and webhook delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PhoneStatus {
    Pending,
    Called,
    Failed,
}

impl PhoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Called => "called",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PhoneRecord {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub status: PhoneStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One attempted or completed call against a phone record.  Created by the
/// dispatcher on submission; only the webhook handler mutates it afterwards.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CallLog {
    pub id: i64,
    pub phone_number_id: i64,
    pub call_sid: String,
    pub status: CallStatus,
    pub duration: Option<i64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Default, Serialize)]
pub struct PhoneStats {
    pub total: i64,
    pub pending: i64,
    pub called: i64,
    pub failed: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct CallStats {
    pub successful: i64,
    pub failed: i64,
}

/// Call log joined with its phone record, for dashboard listings.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentCall {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub status: CallStatus,
    pub duration: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
