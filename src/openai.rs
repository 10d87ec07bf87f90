//! Chat-command interpretation and blog generation through the OpenAI
//! chat-completion API.

use crate::db_types::PhoneStats;
use crate::error::AppError;
use crate::openai_types::{OpenAIBatchResponse, OpenAIMessage, OpenAIPayload};
use crate::repo::PhoneRepo;
use crate::types::{AppState, ChatAction, ChatCommand};

use regex::Regex;
use tracing::error;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const CHAT_MODEL: &str = "gpt-3.5-turbo";

async fn chat_completion(
    app_state: &AppState,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
) -> Result<String, AppError> {
    let key = app_state.config.openai_api_key.as_str();
    let payload = OpenAIPayload {
        model: CHAT_MODEL.to_string(),
        messages,
        max_tokens: Some(max_tokens),
        temperature: Some(temperature),
    };
    let resp = app_state
        .http_client
        .post(OPENAI_CHAT_URL)
        .header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"))
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            error!(error=%e, "failed to send request to OpenAI");
            AppError("Failed to send request to OpenAI")
        })?;
    let resp = resp.json::<OpenAIBatchResponse>().await.map_err(|e| {
        error!(error=%e, "failed to deserialize openai response");
        AppError("deserialize")
    })?;
    resp.choices
        .first()
        .map(|c| c.message.content.clone())
        .ok_or(AppError("openai returned no choices"))
}

/// Interpret a free-text chat message into a command, falling back to regex
/// heuristics when the model reply carries no parseable JSON.
pub async fn process_chat_command(
    app_state: &AppState,
    message: &str,
) -> Result<ChatCommand, AppError> {
    let stats = PhoneRepo::stats(&app_state.db_pool).await.map_err(|e| {
        error!(error=%e, "failed to load phone stats");
        AppError("db error")
    })?;
    let prompt = vec![
        OpenAIMessage {
            role: "system".to_string(),
            content: build_system_prompt(&stats),
        },
        OpenAIMessage {
            role: "user".to_string(),
            content: message.to_string(),
        },
    ];
    let content = chat_completion(app_state, prompt, 500, 0.7).await?;
    Ok(parse_ai_response(&content, message))
}

fn build_system_prompt(stats: &PhoneStats) -> String {
    format!(
        "You are an AI assistant for an autodialer system. You can help with the following commands:\n\
         \n\
         Current Status:\n\
         - Total phone numbers: {total}\n\
         - Pending calls: {pending}\n\
         - Completed calls: {called}\n\
         \n\
         Available Commands:\n\
         1. 'call [phone_number]' - Make a call to a specific number\n\
         2. 'call all' - Call all pending numbers\n\
         3. 'show numbers' or 'list numbers' - Show all phone numbers\n\
         4. 'show stats' or 'show statistics' - Show call statistics\n\
         5. 'upload numbers' - Guide user to upload phone numbers\n\
         \n\
         Please respond with a JSON object containing:\n\
         - action: one of ['call_single', 'call_all', 'show_numbers', 'show_stats', 'upload_guide', 'help', 'unknown']\n\
         - parameters: relevant parameters (like phone number for call_single)\n\
         - message: A friendly response to the user\n\
         \n\
         Be conversational and helpful!",
        total = stats.total,
        pending = stats.pending,
        called = stats.called,
    )
}

/// Recover a command from the model reply.  A JSON object embedded anywhere
/// in the reply wins; otherwise deterministic heuristics over the original
/// message decide.
pub fn parse_ai_response(content: &str, original_message: &str) -> ChatCommand {
    let json_re = Regex::new(r"(?s)\{.*\}").unwrap();
    if let Some(found) = json_re.find(content) {
        if let Ok(mut command) = serde_json::from_str::<ChatCommand>(found.as_str()) {
            if command.message.is_empty() {
                command.message = content.to_string();
            }
            return command;
        }
    }

    let lowered = original_message.to_lowercase();
    let digits_re = Regex::new(r"\d{10,}").unwrap();
    if lowered.contains("call") {
        if let Some(number) = digits_re.find(original_message) {
            let mut parameters = serde_json::Map::new();
            parameters.insert(
                "phone_number".to_string(),
                serde_json::Value::String(number.as_str().to_string()),
            );
            return ChatCommand {
                action: ChatAction::CallSingle,
                parameters,
                message: format!("I'll initiate a call to {}", number.as_str()),
            };
        }
    }
    if lowered.contains("call all") {
        return ChatCommand {
            action: ChatAction::CallAll,
            parameters: serde_json::Map::new(),
            message: "I'll start calling all pending numbers".to_string(),
        };
    }
    if lowered.contains("show") && (lowered.contains("number") || lowered.contains("list")) {
        return ChatCommand {
            action: ChatAction::ShowNumbers,
            parameters: serde_json::Map::new(),
            message: "Here are all the phone numbers in the system".to_string(),
        };
    }
    if lowered.contains("stat") {
        return ChatCommand {
            action: ChatAction::ShowStats,
            parameters: serde_json::Map::new(),
            message: "Here are the current call statistics".to_string(),
        };
    }
    ChatCommand {
        action: ChatAction::Help,
        parameters: serde_json::Map::new(),
        message: content.to_string(),
    }
}

/// Generate one blog article for `title`, optionally steered by
/// `description`.
pub async fn generate_blog_post(
    app_state: &AppState,
    title: &str,
    description: &str,
) -> Result<String, AppError> {
    let context = if description.is_empty() {
        String::new()
    } else {
        format!("Additional context: {description}")
    };
    let prompt = format!(
        "Write a comprehensive blog post about '{title}'. {context}\n\
         \n\
         Please write an engaging, informative article that includes:\n\
         - An engaging introduction\n\
         - Main content with practical examples where applicable\n\
         - Key takeaways or conclusion\n\
         - Make it around 800-1200 words\n\
         - Write in a professional yet accessible tone"
    );
    let messages = vec![
        OpenAIMessage {
            role: "system".to_string(),
            content: "You are a professional technical writer who creates engaging and \
                      informative blog posts about programming and technology topics."
                .to_string(),
        },
        OpenAIMessage {
            role: "user".to_string(),
            content: prompt,
        },
    ];
    chat_completion(app_state, messages, 2000, 0.8).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_reply_wins() {
        let content = r#"{"action": "show_stats", "parameters": {}, "message": "Here you go"}"#;
        let command = parse_ai_response(content, "how are we doing?");
        assert_eq!(command.action, ChatAction::ShowStats);
        assert_eq!(command.message, "Here you go");
    }

    #[test]
    fn json_embedded_in_prose_is_extracted() {
        let content = "Sure thing!\n{\"action\": \"call_all\", \"message\": \"Dialing now\"}\nAnything else?";
        let command = parse_ai_response(content, "call all");
        assert_eq!(command.action, ChatAction::CallAll);
        assert_eq!(command.message, "Dialing now");
    }

    #[test]
    fn missing_message_falls_back_to_content() {
        let content = r#"{"action": "call_all"}"#;
        let command = parse_ai_response(content, "call all");
        assert_eq!(command.action, ChatAction::CallAll);
        assert_eq!(command.message, content);
    }

    #[test]
    fn unknown_action_word_is_tolerated() {
        let content = r#"{"action": "dance", "message": "no idea"}"#;
        let command = parse_ai_response(content, "dance for me");
        assert_eq!(command.action, ChatAction::Unknown);
    }

    #[test]
    fn fallback_call_with_digits() {
        let command = parse_ai_response("sorry, no JSON here", "please call 15005550006 now");
        assert_eq!(command.action, ChatAction::CallSingle);
        assert_eq!(command.parameter("phone_number"), Some("15005550006"));
    }

    #[test]
    fn fallback_call_all_without_json() {
        let command = parse_ai_response("plain text reply", "call all");
        assert_eq!(command.action, ChatAction::CallAll);
    }

    #[test]
    fn fallback_show_numbers() {
        let command = parse_ai_response("??", "show me the list of numbers");
        assert_eq!(command.action, ChatAction::ShowNumbers);
    }

    #[test]
    fn fallback_stats() {
        let command = parse_ai_response("??", "any stats?");
        assert_eq!(command.action, ChatAction::ShowStats);
    }

    #[test]
    fn fallback_defaults_to_help_with_model_text() {
        let command = parse_ai_response("I can help with calling numbers.", "hello there");
        assert_eq!(command.action, ChatAction::Help);
        assert_eq!(command.message, "I can help with calling numbers.");
    }

    #[test]
    fn short_digit_runs_are_not_numbers() {
        let command = parse_ai_response("no json", "call 12345");
        assert_ne!(command.action, ChatAction::CallSingle);
    }
}
