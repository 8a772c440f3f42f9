//! Runtime configuration loaded from environment variables

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Timers and limits for one room's round state machine
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub role_reveal: Duration,
    pub turn: Duration,
    pub voting: Duration,
    pub guess: Duration,
    pub result_cooldown: Duration,
    /// How long a dropped participant keeps their seat (zero = removed at once)
    pub disconnect_grace: Duration,
    /// Role reveal ends early only once every seated participant confirmed,
    /// instead of just the one who started the round
    pub require_all_confirm: bool,
    pub min_players: usize,
    pub max_players: usize,
    pub max_speech_chars: usize,
    pub max_name_chars: usize,
    pub max_chat_chars: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            role_reveal: Duration::from_secs(4),
            turn: Duration::from_secs(30),
            voting: Duration::from_secs(20),
            guess: Duration::from_secs(20),
            result_cooldown: Duration::from_secs(10),
            disconnect_grace: Duration::ZERO,
            require_all_confirm: false,
            min_players: 3,
            max_players: 8,
            max_speech_chars: 40,
            max_name_chars: 8,
            max_chat_chars: 200,
        }
    }
}

impl GameConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            role_reveal: env_seconds("LIAR_REVEAL_SECONDS").unwrap_or(defaults.role_reveal),
            turn: env_seconds("LIAR_TURN_SECONDS").unwrap_or(defaults.turn),
            voting: env_seconds("LIAR_VOTE_SECONDS").unwrap_or(defaults.voting),
            guess: env_seconds("LIAR_GUESS_SECONDS").unwrap_or(defaults.guess),
            result_cooldown: env_seconds("LIAR_RESULT_SECONDS")
                .unwrap_or(defaults.result_cooldown),
            disconnect_grace: env_seconds("LIAR_DISCONNECT_GRACE_SECONDS")
                .unwrap_or(defaults.disconnect_grace),
            require_all_confirm: std::env::var("LIAR_REQUIRE_ALL_CONFIRM")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.require_all_confirm),
            ..defaults
        }
    }
}

/// Parse a whole number of seconds, warning about garbage values
fn env_seconds(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: expected whole seconds", key, raw);
            None
        }
    }
}

/// Process-level settings for the HTTP/WebSocket server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub static_dir: PathBuf,
    /// JSON word bank replacing the built-in one
    pub word_bank_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(3000);
        let ip = std::env::var("BIND_ADDR")
            .ok()
            .and_then(|a| a.trim().parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "static".to_string());
        let word_bank_path = std::env::var("WORD_BANK_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Self {
            addr: SocketAddr::new(ip, port),
            static_dir: PathBuf::from(static_dir),
            word_bank_path,
        }
    }
}
