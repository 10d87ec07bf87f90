use crate::config::Config;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub db_pool: SqlitePool,
}

/// Intent recovered from a chat message, either from the model's structured
/// reply or from the regex fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    CallSingle,
    CallAll,
    ShowNumbers,
    ShowStats,
    UploadGuide,
    Help,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct ChatCommand {
    pub action: ChatAction,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub message: String,
}

impl ChatCommand {
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNumberRequest {
    pub number: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub default_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallSingleRequest {
    pub phone_number_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateBlogPostsRequest {
    pub titles_list: String,
}
