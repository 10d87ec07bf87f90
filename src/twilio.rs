//! Boundary wrapper around the Twilio call-creation API.
//!
//! In mock mode (the default outside production) no network is touched:
//! a completed call is synthesized so the system stays runnable without
//! live credentials.

use crate::consts::SIMULATED_DURATION_SECS;
use crate::db_types::PhoneStatus;
use crate::error::AppError;
use crate::repo::{CallLogRepo, PhoneRepo};
use crate::twilio_types::{
    wrap_twiml, CallResource, CallStatus, PauseAction, Response, ResponseAction, SayAction,
};
use crate::types::AppState;

use rand::Rng;
use sqlx::types::time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result of one call submission.  Provider rejection is data, not a fault.
#[derive(Debug)]
pub enum CallOutcome {
    Submitted { call_sid: String },
    Rejected { error: String },
}

/// Submit one outbound call to `to_number` on behalf of the phone record
/// `record_id`, recording a call log on success.
pub async fn submit_call(
    app_state: &AppState,
    to_number: &str,
    record_id: i64,
) -> Result<CallOutcome, AppError> {
    if app_state.config.mock_mode {
        return simulate_call(app_state, to_number, record_id).await;
    }

    let account_sid = &app_state.config.twilio_account_sid;
    let url = format!("https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Calls.json");
    let mut form: Vec<(&str, String)> = vec![
        ("To", to_number.to_string()),
        ("From", app_state.config.twilio_from_number.clone()),
        ("Twiml", demo_voice_twiml()),
    ];
    if let Some(base_url) = &app_state.config.public_base_url {
        form.push((
            "StatusCallback",
            format!("{base_url}/twilio/status_callback/{record_id}"),
        ));
        for event in ["initiated", "ringing", "answered", "completed"] {
            form.push(("StatusCallbackEvent", event.to_string()));
        }
        form.push(("StatusCallbackMethod", "POST".to_string()));
    }

    let resp = match app_state
        .http_client
        .post(url)
        .basic_auth(account_sid, Some(&app_state.config.twilio_auth_token))
        .form(&form)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            error!(error=%e, "failed to send call request to twilio");
            return Ok(CallOutcome::Rejected {
                error: e.to_string(),
            });
        }
    };
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        warn!(%status, body=%body, "twilio rejected call submission");
        return Ok(CallOutcome::Rejected {
            error: format!("twilio returned {status}"),
        });
    }
    let call = match resp.json::<CallResource>().await {
        Ok(call) => call,
        Err(e) => {
            error!(error=%e, "failed to deserialize twilio call resource");
            return Ok(CallOutcome::Rejected {
                error: "unreadable provider response".to_string(),
            });
        }
    };

    CallLogRepo::insert(
        &app_state.db_pool,
        record_id,
        &call.sid,
        CallStatus::Initiated,
        Some(OffsetDateTime::now_utc()),
        None,
    )
    .await
    .map_err(|e| {
        error!(error=%e, "failed to insert call log");
        AppError("db error")
    })?;
    info!(call_sid=%call.sid, to=%to_number, "call submitted");

    Ok(CallOutcome::Submitted { call_sid: call.sid })
}

/// Synthesize a successful call: a fake provider sid, an immediately
/// completed log with a random short duration, and the record marked called.
async fn simulate_call(
    app_state: &AppState,
    to_number: &str,
    record_id: i64,
) -> Result<CallOutcome, AppError> {
    let call_sid = format!("CAdev{}", Uuid::new_v4().simple());
    let duration = rand::thread_rng().gen_range(SIMULATED_DURATION_SECS);

    CallLogRepo::insert(
        &app_state.db_pool,
        record_id,
        &call_sid,
        CallStatus::Completed,
        Some(OffsetDateTime::now_utc()),
        Some(duration),
    )
    .await
    .map_err(|e| {
        error!(error=%e, "failed to insert simulated call log");
        AppError("db error")
    })?;
    PhoneRepo::update_status(&app_state.db_pool, record_id, PhoneStatus::Called)
        .await
        .map_err(|e| {
            error!(error=%e, "failed to mark record called");
            AppError("db error")
        })?;
    info!(to=%to_number, call_sid=%call_sid, "SIMULATED CALL");

    Ok(CallOutcome::Submitted { call_sid })
}

/// The fixed demo script read to every callee.
pub fn demo_voice_twiml() -> String {
    let response = Response {
        actions: vec![
            ResponseAction::Say(SayAction {
                text: "Hello! This is a demo call from our autodialer system. \
                       This is just a test call for development purposes. Thank you!"
                    .to_string(),
                voice: Some("alice".to_string()),
                ..Default::default()
            }),
            ResponseAction::Pause(PauseAction { length: Some(2) }),
            ResponseAction::Say(SayAction {
                text: "Have a great day!".to_string(),
                voice: Some("alice".to_string()),
                ..Default::default()
            }),
        ],
    };
    wrap_twiml(xmlserde::xml_serialize(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_twiml_has_voice_and_pause() {
        let twiml = demo_voice_twiml();
        assert!(twiml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(twiml.contains("<Say voice=\"alice\">"));
        assert!(twiml.contains("<Pause length=\"2\""));
        assert!(twiml.contains("Have a great day!"));
    }
}
