use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use directories_next::ProjectDirs;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub bind_address: IpAddr,
    pub port: u16,
    pub credentials: Credentials,
    pub storage: Storage,
    pub assets: Assets,
    pub limits: Limits,
    #[serde(default)]
    pub highlight: Highlight,
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assets {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    pub max_upload_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Highlight {
    /// Syntax token used when a paste's language cannot be detected.
    pub default_syntax: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load the configuration from defaults, an optional TOML file and the environment.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config: Config = ::config::Config::builder()
            .set_default("base_url", "http://localhost:8080/")?
            .set_default("bind_address", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("storage.dir", default_storage_dir())?
            .set_default("assets.dir", "static")?
            .set_default("limits.max_upload_size", 10 * 1024 * 1024)?
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix("PASTEBINIT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option(
                "credentials.username",
                std::env::var("PASTEBINIT_USERNAME").ok(),
            )?
            .set_override_option(
                "credentials.password",
                std::env::var("PASTEBINIT_PASSWORD").ok(),
            )?
            .build()
            .context("failed to read config")?
            .try_deserialize()
            .context("failed to deserialize config")?;

        config.base_url = normalize_base_url(&config.base_url);
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.credentials.username.is_empty() {
            bail!("username cannot be empty");
        }
        if self.credentials.password.is_empty() {
            bail!("password cannot be empty");
        }
        Ok(())
    }
}

/// Make sure the base URL has a scheme and ends with a slash, so ids can be appended.
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_owned();
    if !url.starts_with("http") {
        url.insert_str(0, "http://");
    }
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn default_storage_dir() -> String {
    ProjectDirs::from("", "", "pasted")
        .map(|dirs| dirs.data_dir().join("files"))
        .unwrap_or_else(|| PathBuf::from("files"))
        .to_string_lossy()
        .into_owned()
}
