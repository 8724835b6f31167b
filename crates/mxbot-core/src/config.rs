use std::{env, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration for the bot.
///
/// Values come from the environment (a `.env` file is loaded first if present).
/// Defaults match the demo deployment against a local homeserver.
#[derive(Clone, Debug)]
pub struct Config {
    // Homeserver
    pub homeserver_url: String,

    // Bot account
    pub username: String,
    pub password: String,
    pub display_name: String,

    // Sync loop timings
    pub sync_timeout: Duration,
    pub request_timeout: Duration,
    pub error_cooldown: Duration,
    pub idle_delay: Duration,
    pub reply_delay: Duration,

    // Demo room
    pub create_demo_room: bool,
    pub demo_room_name: String,
    pub demo_room_topic: String,
}

/// Timing knobs consumed by the sync loop.
#[derive(Clone, Copy, Debug)]
pub struct SyncSettings {
    /// How long the server may hold a long-poll open.
    pub sync_timeout: Duration,
    /// Client-side ceiling for a single poll request.
    pub request_timeout: Duration,
    /// Pause after a transport/protocol failure.
    pub error_cooldown: Duration,
    /// Pause between two successful polls.
    pub idle_delay: Duration,
    /// Simulated typing delay before a free-text reply.
    pub reply_delay: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            sync_timeout: Duration::from_millis(10_000),
            request_timeout: Duration::from_millis(15_000),
            error_cooldown: Duration::from_millis(5_000),
            idle_delay: Duration::from_millis(100),
            reply_delay: Duration::from_millis(1_000),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // A missing .env is fine; a malformed one is reported.
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("failed to load .env: {e}"))),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);
        let millis = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| Error::Config(format!("{key} must be an integer (ms), got {v:?}"))),
                None => Ok(Duration::from_millis(default)),
            }
        };

        let defaults = SyncSettings::default();

        let homeserver_url = get("MXBOT_HOMESERVER_URL")
            .unwrap_or_else(|| "http://localhost:6167".to_string())
            .trim_end_matches('/')
            .to_string();
        let username = get("MXBOT_USERNAME").unwrap_or_else(|| "demo_ai_bot".to_string());
        let password = get("MXBOT_PASSWORD").unwrap_or_else(|| "AIBotDemo123!".to_string());
        let display_name =
            get("MXBOT_DISPLAY_NAME").unwrap_or_else(|| "Demo AI Assistant 🤖".to_string());

        let sync_timeout = millis(
            "MXBOT_SYNC_TIMEOUT_MS",
            defaults.sync_timeout.as_millis() as u64,
        )?;
        let request_timeout = millis(
            "MXBOT_REQUEST_TIMEOUT_MS",
            defaults.request_timeout.as_millis() as u64,
        )?;
        let error_cooldown = millis(
            "MXBOT_ERROR_COOLDOWN_MS",
            defaults.error_cooldown.as_millis() as u64,
        )?;
        let idle_delay = millis("MXBOT_IDLE_DELAY_MS", defaults.idle_delay.as_millis() as u64)?;
        let reply_delay = millis(
            "MXBOT_REPLY_DELAY_MS",
            defaults.reply_delay.as_millis() as u64,
        )?;

        let create_demo_room = get("MXBOT_CREATE_DEMO_ROOM")
            .map(|s| parse_bool(&s))
            .unwrap_or(true);
        let demo_room_name =
            get("MXBOT_DEMO_ROOM_NAME").unwrap_or_else(|| "AI Bot Demo Room".to_string());
        let demo_room_topic = get("MXBOT_DEMO_ROOM_TOPIC")
            .unwrap_or_else(|| "🤖 Chat with the Demo AI Assistant Bot".to_string());

        if homeserver_url.is_empty() {
            return Err(Error::Config(
                "MXBOT_HOMESERVER_URL must not be empty".to_string(),
            ));
        }
        if request_timeout <= sync_timeout {
            return Err(Error::Config(format!(
                "MXBOT_REQUEST_TIMEOUT_MS ({}ms) must exceed MXBOT_SYNC_TIMEOUT_MS ({}ms)",
                request_timeout.as_millis(),
                sync_timeout.as_millis()
            )));
        }

        Ok(Self {
            homeserver_url,
            username,
            password,
            display_name,
            sync_timeout,
            request_timeout,
            error_cooldown,
            idle_delay,
            reply_delay,
            create_demo_room,
            demo_room_name,
            demo_room_topic,
        })
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            sync_timeout: self.sync_timeout,
            request_timeout: self.request_timeout,
            error_cooldown: self.error_cooldown,
            idle_delay: self.idle_delay,
            reply_delay: self.reply_delay,
        }
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
