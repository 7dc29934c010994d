use crate::args::DEFAULT_BOARD_LIMIT;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: Option<String>,
    pub discord_api_base: String,
    pub discord_gateway_url: String,
    /// Overrides the `@<bot name>` prefix learned from the gateway.
    pub mention_prefix: Option<String>,
    pub default_limit: u32,
    pub db_path: String,
    pub nats_url: String,
    pub nats_user: Option<String>,
    pub nats_pass: Option<String>,
    pub request_subject: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            discord_token: var("POPPLEBOT_DISCORD_TOKEN"),
            discord_api_base: var("DISCORD_API_BASE")
                .unwrap_or_else(|| "https://discord.com/api/v10".to_string()),
            discord_gateway_url: var("DISCORD_GATEWAY_URL")
                .unwrap_or_else(|| "wss://gateway.discord.gg/?v=10&encoding=json".to_string()),
            mention_prefix: var("POPPLE_MENTION_PREFIX").filter(|p| !p.is_empty()),
            default_limit: var("POPPLE_DEFAULT_LIMIT")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_BOARD_LIMIT),
            db_path: var("POPPLE_DB_PATH").unwrap_or_else(|| "popple.sqlite".to_string()),
            nats_url: var("POPPLE_NATS_URL").unwrap_or_else(|| "nats://127.0.0.1:4222".to_string()),
            nats_user: var("POPPLE_NATS_USER"),
            nats_pass: var("POPPLE_NATS_PASS"),
            request_subject: var("POPPLE_REQUEST_SUBJECT").unwrap_or_else(|| "requests".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.default_limit, 10);
        assert_eq!(cfg.request_subject, "requests");
        assert_eq!(cfg.db_path, "popple.sqlite");
        assert!(cfg.mention_prefix.is_none());
        assert!(cfg.discord_token.is_none());
    }

    #[test]
    fn overrides_and_bad_values() {
        let env: HashMap<&str, &str> = [
            ("POPPLE_DEFAULT_LIMIT", "0"),
            ("POPPLE_MENTION_PREFIX", "@karma"),
            ("POPPLE_REQUEST_SUBJECT", "popple.requests"),
        ]
        .into_iter()
        .collect();
        let cfg = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.default_limit, 10);
        assert_eq!(cfg.mention_prefix.as_deref(), Some("@karma"));
        assert_eq!(cfg.request_subject, "popple.requests");
    }
}
