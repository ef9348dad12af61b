use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::chat::MentionMatch;
use crate::store::default_store_path;

pub(crate) const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o";
pub(crate) const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_OWNER: &str = "MintSoda07";
const DEFAULT_REPO: &str = "foodtable";

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ConfigError {
    #[error("identity '{0}' is not an email address")]
    InvalidIdentity(String),
    #[error("poll interval must be at least 10ms")]
    PollIntervalTooShort,
    #[error("temperature {0} is outside 0.0..=2.0")]
    TemperatureOutOfRange(f32),
}

#[derive(Debug, Parser)]
#[command(name = "chattograph", version, about = "Shared terminal chat with a Freeman bot")]
pub(crate) struct Cli {
    /// Email identity messages are posted under.
    #[arg(long, env = "CHATTOGRAPH_USER")]
    pub(crate) user: Option<String>,

    /// Shared chat database.
    #[arg(long, env = "CHATTOGRAPH_STORE")]
    pub(crate) store: Option<PathBuf>,

    /// How often the feed is polled, in milliseconds.
    #[arg(long, env = "CHATTOGRAPH_POLL_MS", default_value_t = 500)]
    pub(crate) poll_ms: u64,

    #[arg(long, env = "CHATTOGRAPH_GITHUB_OWNER", default_value = DEFAULT_OWNER)]
    pub(crate) owner: String,

    /// Repository preselected once the owner's repositories load.
    #[arg(long, env = "CHATTOGRAPH_GITHUB_REPO", default_value = DEFAULT_REPO)]
    pub(crate) repo: String,

    #[arg(long, env = "CHATTOGRAPH_GITHUB_API", default_value = DEFAULT_GITHUB_API)]
    pub(crate) github_api: String,

    #[arg(long, env = "CHATTOGRAPH_MODEL", default_value = DEFAULT_MODEL)]
    pub(crate) model: String,

    #[arg(long, env = "CHATTOGRAPH_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub(crate) endpoint: String,

    #[arg(long, env = "CHATTOGRAPH_MAX_TOKENS", default_value_t = 4000)]
    pub(crate) max_tokens: u32,

    #[arg(long, env = "CHATTOGRAPH_TEMPERATURE", default_value_t = 0.7)]
    pub(crate) temperature: f32,

    /// Model call timeout in seconds; expiry is reported like any other failure.
    #[arg(long, env = "CHATTOGRAPH_TIMEOUT", default_value_t = 60)]
    pub(crate) timeout: u64,

    #[arg(long, env = "CHATTOGRAPH_MENTION_MATCH", value_enum, default_value_t = MentionMatch::Substring)]
    pub(crate) mention_match: MentionMatch,

    /// Disable desktop notifications for incoming messages.
    #[arg(long, env = "CHATTOGRAPH_NO_NOTIFY")]
    pub(crate) no_notify: bool,

    /// Store the model API key in the shared secret table and exit.
    #[arg(long, value_name = "KEY")]
    pub(crate) set_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ModelConfig {
    pub(crate) endpoint: String,
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f32,
    pub(crate) timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GitHubConfig {
    pub(crate) api_base: String,
    pub(crate) owner: String,
    pub(crate) repo: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ChatConfig {
    pub(crate) identity: Option<String>,
    pub(crate) store_path: PathBuf,
    pub(crate) poll_interval: Duration,
    pub(crate) notifications: bool,
    pub(crate) mention: MentionMatch,
    pub(crate) model: ModelConfig,
    pub(crate) github: GitHubConfig,
}

impl ChatConfig {
    pub(crate) fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let identity = match cli.user.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) if is_email_like(raw) => Some(raw.to_string()),
            Some(raw) => return Err(ConfigError::InvalidIdentity(raw.to_string())),
        };
        if cli.poll_ms < 10 {
            return Err(ConfigError::PollIntervalTooShort);
        }
        if !(0.0..=2.0).contains(&cli.temperature) {
            return Err(ConfigError::TemperatureOutOfRange(cli.temperature));
        }

        let repo = cli.repo.trim();
        Ok(Self {
            identity,
            store_path: cli.store.clone().unwrap_or_else(default_store_path),
            poll_interval: Duration::from_millis(cli.poll_ms),
            notifications: !cli.no_notify,
            mention: cli.mention_match,
            model: ModelConfig {
                endpoint: cli.endpoint.clone(),
                model: cli.model.clone(),
                max_tokens: cli.max_tokens,
                temperature: cli.temperature,
                timeout_secs: cli.timeout.max(1),
            },
            github: GitHubConfig {
                api_base: cli.github_api.trim_end_matches('/').to_string(),
                owner: cli.owner.trim().to_string(),
                repo: (!repo.is_empty()).then(|| repo.to_string()),
            },
        })
    }

    pub(crate) fn log_path(&self) -> PathBuf {
        self.store_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(|parent| parent.join("chattograph.log"))
            .unwrap_or_else(|| PathBuf::from("chattograph.log"))
    }
}

pub(crate) fn is_email_like(raw: &str) -> bool {
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !raw.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["chattograph"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("cli parses")
    }

    #[test]
    fn defaults_fill_model_and_github_settings() {
        let config = ChatConfig::from_cli(&parse(&["--store", "/tmp/x/chat.db"])).expect("config");
        assert_eq!(config.model.model, DEFAULT_MODEL);
        assert_eq!(config.model.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model.max_tokens, 4000);
        assert_eq!(config.github.owner, DEFAULT_OWNER);
        assert_eq!(config.github.repo.as_deref(), Some(DEFAULT_REPO));
        assert_eq!(config.mention, MentionMatch::Substring);
        assert!(config.notifications);
        assert_eq!(config.log_path(), PathBuf::from("/tmp/x/chattograph.log"));
    }

    #[test]
    fn identity_must_look_like_an_email() {
        let cli = parse(&["--user", "not-an-email"]);
        assert_eq!(
            ChatConfig::from_cli(&cli),
            Err(ConfigError::InvalidIdentity("not-an-email".to_string()))
        );

        let config = ChatConfig::from_cli(&parse(&["--user", " a@b.com "])).expect("config");
        assert_eq!(config.identity.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn blank_identity_means_signed_out() {
        let config = ChatConfig::from_cli(&parse(&["--user", "  "])).expect("config");
        assert_eq!(config.identity, None);
    }

    #[test]
    fn mention_mode_and_notifications_are_configurable() {
        let config =
            ChatConfig::from_cli(&parse(&["--mention-match", "word", "--no-notify"])).expect("config");
        assert_eq!(config.mention, MentionMatch::Word);
        assert!(!config.notifications);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_eq!(
            ChatConfig::from_cli(&parse(&["--poll-ms", "1"])),
            Err(ConfigError::PollIntervalTooShort)
        );
        assert_eq!(
            ChatConfig::from_cli(&parse(&["--temperature", "3.5"])),
            Err(ConfigError::TemperatureOutOfRange(3.5))
        );
    }

    #[test]
    fn email_check_rejects_malformed_addresses() {
        assert!(is_email_like("a@b.com"));
        assert!(!is_email_like("@b.com"));
        assert!(!is_email_like("a@"));
        assert!(!is_email_like("a@com"));
        assert!(!is_email_like("a b@c.com"));
    }
}
