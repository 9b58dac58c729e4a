use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::{MailError, Result};

pub const POP3_HOST: &str = "pop3.hiworks.co.kr";
pub const POP3_PORT: u16 = 995;
pub const SMTP_HOST: &str = "smtp.hiworks.co.kr";
pub const SMTP_PORT: u16 = 465;
pub const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";

pub const USER_ENV: &str = "EMAIL_USER";
pub const PASSWORD_ENV: &str = "EMAIL_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn mailbox() -> Self {
        Self::new(POP3_HOST, POP3_PORT)
    }

    pub fn submission() -> Self {
        Self::new(SMTP_HOST, SMTP_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Account identifier plus shared secret, used for both POP3 and SMTP.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Optional on-disk settings. Every field may be overridden by the environment.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct FileConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub download_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub mailbox: Endpoint,
    pub submission: Endpoint,
    pub download_dir: PathBuf,
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("popmail"))
}

pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Reads the config file if there is one. A missing file is not an error.
pub fn load_file_config() -> Result<Option<FileConfig>> {
    let Some(path) = config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(&path).map_err(|e| MailError::io(&path, e))?;
    let cfg: FileConfig = toml::from_str(&s)
        .map_err(|e| MailError::Config(format!("{}: {e}", path.display())))?;
    Ok(Some(cfg))
}

pub fn load_config() -> Result<Config> {
    let file = load_file_config()?;
    Config::from_sources(
        std::env::var(USER_ENV).ok(),
        std::env::var(PASSWORD_ENV).ok(),
        file,
    )
}

impl Config {
    /// Merges environment values over file values. Blank strings count as unset.
    pub fn from_sources(
        env_user: Option<String>,
        env_password: Option<String>,
        file: Option<FileConfig>,
    ) -> Result<Self> {
        let file = file.unwrap_or_default();
        let pick = |env: Option<String>, file: Option<String>| {
            env.filter(|v| !v.trim().is_empty())
                .or(file.filter(|v| !v.trim().is_empty()))
        };

        let user = pick(env_user, file.user)
            .ok_or_else(|| MailError::Config(format!("{USER_ENV} must be set")))?;
        let password = pick(env_password, file.password)
            .ok_or_else(|| MailError::Config(format!("{PASSWORD_ENV} must be set")))?;

        let download_dir = file
            .download_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));

        Ok(Self {
            credentials: Credentials::new(user, password),
            mailbox: Endpoint::mailbox(),
            submission: Endpoint::submission(),
            download_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn env_values_win_over_file() {
        let file = FileConfig {
            user: Some("file@example.com".into()),
            password: Some("file-secret".into()),
            download_dir: Some("/tmp/mail".into()),
        };
        let cfg = Config::from_sources(Some("env@example.com".into()), None, Some(file)).unwrap();
        assert_eq!(cfg.credentials.user, "env@example.com");
        assert_eq!(cfg.credentials.password, "file-secret");
        assert_eq!(cfg.download_dir, PathBuf::from("/tmp/mail"));
        assert_eq!(cfg.mailbox, Endpoint::new("pop3.hiworks.co.kr", 995));
        assert_eq!(cfg.submission.to_string(), "smtp.hiworks.co.kr:465");
    }

    #[test]
    fn missing_secret_is_config_error() {
        let err = Config::from_sources(Some("me@example.com".into()), Some("  ".into()), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains(PASSWORD_ENV));
    }

    #[test]
    fn default_download_dir() {
        let cfg = Config::from_sources(Some("u".into()), Some("p".into()), None).unwrap();
        assert_eq!(cfg.download_dir, PathBuf::from(DEFAULT_DOWNLOAD_DIR));
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("me", "hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("me"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn parses_toml_file() {
        let cfg: FileConfig = toml::from_str("user = \"a@b.c\"\ndownload_dir = \"out\"\n").unwrap();
        assert_eq!(cfg.user.as_deref(), Some("a@b.c"));
        assert!(cfg.password.is_none());
        assert_eq!(cfg.download_dir.as_deref(), Some("out"));
    }
}
