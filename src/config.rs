use std::env;
use std::time::Duration;

/// Runtime configuration, read from the environment once in `main` and
/// carried inside `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub openai_api_key: String,
    /// Synthesize calls instead of dialing through Twilio.  On by default;
    /// set TWILIO_MOCK_MODE=false to dial for real.
    pub mock_mode: bool,
    /// Public base URL for Twilio status callbacks, e.g.
    /// "https://dialer.example.com".  Callbacks are only requested when set.
    pub public_base_url: Option<String>,
    /// Fixed pause between submissions within a batch.
    pub dispatch_delay: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let mock_mode = env::var("TWILIO_MOCK_MODE")
            .map(|v| v != "false")
            .unwrap_or(true);
        // Twilio credentials are only needed when actually dialing.
        let twilio_var = |key: &str| {
            if mock_mode {
                env::var(key).unwrap_or_default()
            } else {
                env::var(key).unwrap_or_else(|_| panic!("{key} not set!"))
            }
        };
        let dispatch_delay_ms = env::var("DISPATCH_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1_000);

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://autodialer.db".to_string()),
            twilio_account_sid: twilio_var("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: twilio_var("TWILIO_AUTH_TOKEN"),
            twilio_from_number: twilio_var("TWILIO_FROM_NUMBER"),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            mock_mode,
            public_base_url: env::var("PUBLIC_BASE_URL").ok(),
            dispatch_delay: Duration::from_millis(dispatch_delay_ms),
        }
    }

    /// Configuration for tests: mock gateway, no inter-call pause.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            database_url: "sqlite::memory:".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_from_number: String::new(),
            openai_api_key: String::new(),
            mock_mode: true,
            public_base_url: None,
            dispatch_delay: Duration::ZERO,
        }
    }
}
