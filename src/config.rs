use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub cache_dir: PathBuf,
    pub mail_relay_url: Option<String>,
    pub mail_sender: String,
    pub notifications_enabled: bool,
    pub drain_interval_secs: u64,
    pub admin_password: Option<String>,
    pub r2: Option<R2Config>,
}

#[derive(Clone, Debug)]
pub struct R2Config {
    pub bucket: String,
    pub account_id: String,
    pub access_key: String,
    pub secret_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenvy::dotenv().ok();

        let r2 = match (
            env::var("R2_BUCKET"),
            env::var("R2_ACCOUNT_ID"),
            env::var("R2_ACCESS_KEY"),
            env::var("R2_SECRET_KEY"),
        ) {
            (Ok(bucket), Ok(account_id), Ok(access_key), Ok(secret_key)) => Some(R2Config {
                bucket,
                account_id,
                access_key,
                secret_key,
            }),
            _ => None,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./.lost-found-cache")),
            mail_relay_url: env::var("MAIL_RELAY_URL").ok().filter(|s| !s.is_empty()),
            mail_sender: env::var("MAIL_SENDER").unwrap_or_else(|_| "me".to_string()),
            notifications_enabled: env::var("NOTIFICATIONS_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            drain_interval_secs: env::var("DRAIN_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
            r2,
        })
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs.max(1))
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(" OFF "));
    }

    #[test]
    fn test_drain_interval_never_zero() {
        let config = Config {
            database_url: None,
            cache_dir: PathBuf::from("/tmp"),
            mail_relay_url: None,
            mail_sender: "me".to_string(),
            notifications_enabled: true,
            drain_interval_secs: 0,
            admin_password: None,
            r2: None,
        };
        assert_eq!(config.drain_interval(), Duration::from_secs(1));
    }
}
