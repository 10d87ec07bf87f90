pub fn wrap_twiml(twiml: String) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{twiml}")
}

mod twiml {
    use xmlserde_derives::XmlSerialize;

    #[derive(PartialEq, Eq, XmlSerialize)]
    #[xmlserde(root = b"Response")]
    pub struct Response {
        #[xmlserde(ty = "untag")]
        pub actions: Vec<ResponseAction>,
    }

    impl Response {
        /// The minimal acknowledgment body Twilio expects from a webhook.
        pub fn empty() -> Self {
            Self { actions: vec![] }
        }
    }

    #[derive(PartialEq, Eq, XmlSerialize)]
    pub enum ResponseAction {
        #[xmlserde(name = b"Say")]
        Say(SayAction),
        #[xmlserde(name = b"Pause")]
        Pause(PauseAction),
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct SayAction {
        #[xmlserde(ty = "text")]
        pub text: String,
        #[xmlserde(name = b"voice", ty = "attr")]
        pub voice: Option<String>,
        #[xmlserde(name = b"loop", ty = "attr")]
        pub lp: Option<u16>,
        #[xmlserde(name = b"language", ty = "attr")]
        pub language: Option<String>,
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct PauseAction {
        #[xmlserde(name = b"length", ty = "attr")]
        pub length: Option<u16>,
    }
}
pub use twiml::*;

mod status {
    use crate::db_types::PhoneStatus;

    use serde::{Deserialize, Serialize};

    /// Provider-side lifecycle of one call, as reported by status callbacks.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
    #[serde(rename_all = "kebab-case")]
    #[sqlx(rename_all = "kebab-case")]
    pub enum CallStatus {
        Initiated,
        Ringing,
        Answered,
        Completed,
        Busy,
        NoAnswer,
        Failed,
    }

    impl CallStatus {
        /// Case-normalized parse of a provider status word.  Words outside
        /// the fixed vocabulary yield `None`.
        pub fn parse(raw: &str) -> Option<Self> {
            match raw.to_ascii_lowercase().as_str() {
                "initiated" => Some(Self::Initiated),
                "ringing" => Some(Self::Ringing),
                "answered" => Some(Self::Answered),
                "completed" => Some(Self::Completed),
                "busy" => Some(Self::Busy),
                "no-answer" => Some(Self::NoAnswer),
                "failed" => Some(Self::Failed),
                _ => None,
            }
        }

        /// Coarse record-level outcome for this delivery status; `None`
        /// leaves the record as it was.
        pub fn phone_outcome(&self) -> Option<PhoneStatus> {
            match self {
                Self::Completed | Self::Answered => Some(PhoneStatus::Called),
                Self::Busy | Self::NoAnswer | Self::Failed => Some(PhoneStatus::Failed),
                Self::Initiated | Self::Ringing => None,
            }
        }
    }
}
pub use status::*;

mod rest {
    use serde::Deserialize;

    /// The slice of Twilio's call-creation response we care about.
    #[allow(dead_code)]
    #[derive(Deserialize, Debug)]
    pub struct CallResource {
        pub sid: String,
        #[serde(default)]
        pub status: Option<String>,
    }
}
pub use rest::*;

mod callback {
    use serde::Deserialize;

    /// Form fields of a Twilio status callback.  Everything is optional:
    /// a malformed delivery is acknowledged, never bounced.
    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct StatusCallbackPayload {
        pub call_sid: Option<String>,
        pub call_status: Option<String>,
        pub call_duration: Option<String>,
    }
}
pub use callback::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_types::PhoneStatus;

    #[test]
    fn parse_is_case_normalized() {
        assert_eq!(CallStatus::parse("Completed"), Some(CallStatus::Completed));
        assert_eq!(CallStatus::parse("NO-ANSWER"), Some(CallStatus::NoAnswer));
        assert_eq!(CallStatus::parse("busy"), Some(CallStatus::Busy));
        assert_eq!(CallStatus::parse("in-progress"), None);
    }

    #[test]
    fn phone_outcome_mapping() {
        assert_eq!(
            CallStatus::Completed.phone_outcome(),
            Some(PhoneStatus::Called)
        );
        assert_eq!(
            CallStatus::Answered.phone_outcome(),
            Some(PhoneStatus::Called)
        );
        assert_eq!(CallStatus::Busy.phone_outcome(), Some(PhoneStatus::Failed));
        assert_eq!(
            CallStatus::NoAnswer.phone_outcome(),
            Some(PhoneStatus::Failed)
        );
        assert_eq!(
            CallStatus::Failed.phone_outcome(),
            Some(PhoneStatus::Failed)
        );
        assert_eq!(CallStatus::Ringing.phone_outcome(), None);
        assert_eq!(CallStatus::Initiated.phone_outcome(), None);
    }

    #[test]
    fn status_callback_payload_tolerates_missing_fields() {
        let payload: StatusCallbackPayload =
            serde_urlencoded::from_str("CallSid=CA123&CallStatus=busy").unwrap();
        assert_eq!(payload.call_sid.as_deref(), Some("CA123"));
        assert_eq!(payload.call_status.as_deref(), Some("busy"));
        assert!(payload.call_duration.is_none());
    }
}
