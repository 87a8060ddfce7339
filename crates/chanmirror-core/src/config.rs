use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    domain::{ChannelId, ChannelPair},
    errors::Error,
    pipeline::history::MAX_PAGE_LIMIT,
    Result,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Typed configuration for one replication run.
#[derive(Clone, Debug)]
pub struct Config {
    // Channels
    pub source: ChannelId,
    pub destination: ChannelId,

    // Pacing
    pub send_rate_per_minute: u32,
    pub history_page_delay: Duration,
    pub history_page_limit: usize,

    // Content
    pub link_preview: bool,
    pub rewrite_rules_file: Option<PathBuf>,
    pub caption_header: String,
    pub caption_footer: String,

    // Output
    pub run_report_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    /// Read `.env` (without overriding the environment), then the environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_str = |key: &str| lookup(key).and_then(non_empty);

        // Required channels
        let source = channel(env_str("SRC_CHAT"), "SRC_CHAT")?;
        let destination = channel(env_str("DST_CHAT"), "DST_CHAT")?;
        if source == destination {
            return Err(Error::Config(format!(
                "SRC_CHAT and DST_CHAT must differ (both are {source})"
            )));
        }

        // Pacing
        let send_rate_per_minute = parse(env_str("SEND_RATE_PER_MINUTE"), "SEND_RATE_PER_MINUTE")?
            .unwrap_or(20u32);
        if send_rate_per_minute == 0 {
            return Err(Error::Config(
                "SEND_RATE_PER_MINUTE must be greater than zero".to_string(),
            ));
        }
        let history_page_delay = Duration::from_millis(
            parse(env_str("HISTORY_PAGE_DELAY_MS"), "HISTORY_PAGE_DELAY_MS")?.unwrap_or(100u64),
        );
        let history_page_limit = parse(env_str("HISTORY_PAGE_LIMIT"), "HISTORY_PAGE_LIMIT")?
            .unwrap_or(MAX_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);

        // Content
        let link_preview = env_str("LINK_PREVIEW").map(|s| truthy(&s)).unwrap_or(false);
        let rewrite_rules_file = env_str("REWRITE_RULES_FILE").map(PathBuf::from);
        let caption_header = env_str("CAPTION_HEADER").unwrap_or_default();
        let caption_footer = env_str("CAPTION_FOOTER").unwrap_or_default();

        // Output
        let run_report_path = env_str("RUN_REPORT_PATH").map(PathBuf::from);
        let log_format = match env_str("LOG_FORMAT").map(|s| s.trim().to_lowercase()) {
            None => LogFormat::Text,
            Some(s) if s == "text" => LogFormat::Text,
            Some(s) if s == "json" => LogFormat::Json,
            Some(other) => {
                return Err(Error::Config(format!(
                    "LOG_FORMAT must be `text` or `json`, got `{other}`"
                )))
            }
        };

        Ok(Self {
            source,
            destination,
            send_rate_per_minute,
            history_page_delay,
            history_page_limit,
            link_preview,
            rewrite_rules_file,
            caption_header,
            caption_footer,
            run_report_path,
            log_format,
        })
    }

    pub fn pair(&self) -> ChannelPair {
        ChannelPair {
            source: self.source,
            destination: self.destination,
        }
    }
}

fn channel(raw: Option<String>, key: &str) -> Result<ChannelId> {
    let raw =
        raw.ok_or_else(|| Error::Config(format!("{key} environment variable is required")))?;
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(ChannelId::from_dialog_id)
        .ok_or_else(|| Error::Config(format!("{key} is not a valid channel id: `{raw}`")))
}

fn parse<T: std::str::FromStr>(raw: Option<String>, key: &str) -> Result<Option<T>> {
    raw.map(|s| {
        s.trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} is not a valid number: `{s}`")))
    })
    .transpose()
}

fn truthy(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
