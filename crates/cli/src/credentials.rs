// Stored CLI session: `~/.config/folio/credentials.toml`.
//
// The token is an opaque relay session. The file is kept owner-only on unix.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_RELAY_URL: &str = "http://localhost:8080";
pub const RELAY_URL_ENV: &str = "FOLIO_RELAY_URL";

/// Path of the credentials file, honoring `FOLIO_CONFIG_DIR` when set.
pub fn default_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("FOLIO_CONFIG_DIR") {
        return Some(PathBuf::from(dir).join("credentials.toml"));
    }
    dirs::config_dir().map(|dir| dir.join("folio").join("credentials.toml"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    pub relay_url: Option<String>,
    pub token: Option<String>,
    pub user_id: Option<Uuid>,
    pub org_id: Option<Uuid>,
}

impl Credentials {
    /// Missing file means signed out.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse credentials at `{}`", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error)
                .with_context(|| format!("failed to read credentials at `{}`", path.display())),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
            restrict_permissions(parent, 0o700)?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize credentials")?;
        fs::write(path, contents)
            .with_context(|| format!("failed to write credentials to `{}`", path.display()))?;
        restrict_permissions(path, 0o600)
    }

    /// Relay URL precedence: explicit flag, then `FOLIO_RELAY_URL`, then the stored one.
    pub fn resolve_relay_url(&self, flag: Option<&str>) -> String {
        self.resolve_relay_url_with(flag, std::env::var(RELAY_URL_ENV).ok())
    }

    fn resolve_relay_url_with(&self, flag: Option<&str>, env_value: Option<String>) -> String {
        flag.map(ToOwned::to_owned)
            .or(env_value.filter(|value| !value.trim().is_empty()))
            .or_else(|| self.relay_url.clone())
            .unwrap_or_else(|| DEFAULT_RELAY_URL.to_owned())
    }

    pub fn signed_in(&mut self, relay_url: String, token: String, user_id: Uuid, org_id: Uuid) {
        self.relay_url = Some(relay_url);
        self.token = Some(token);
        self.user_id = Some(user_id);
        self.org_id = Some(org_id);
    }

    /// Forget the session but keep the relay URL.
    pub fn signed_out(&mut self) {
        self.token = None;
        self.user_id = None;
        self.org_id = None;
    }
}

fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("failed to set owner-only mode on `{}`", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }

    Ok(())
}
