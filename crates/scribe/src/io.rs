use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::Session;
use crate::config::APP_DIR_NAME;

const SESSION_FILE: &str = "session.json";

/// Which variant of a script is being written; decides the file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Generated,
    Edited,
}

impl ScriptKind {
    fn prefix(self) -> &'static str {
        match self {
            ScriptKind::Generated => "myanmar_news_script",
            ScriptKind::Edited => "edited_script",
        }
    }
}

/// Get the default directory for saved scripts and the stored session
pub fn get_default_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join(APP_DIR_NAME);

    fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    Ok(data_dir)
}

pub fn script_filename(kind: ScriptKind, date: NaiveDate) -> String {
    format!("{}_{}.txt", kind.prefix(), date.format("%Y-%m-%d"))
}

/// Write a script as UTF-8 text into `dir`, replacing a same-day file.
pub fn save_script(content: &str, kind: ScriptKind, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    if content.trim().is_empty() {
        anyhow::bail!("Refusing to save an empty script");
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let filepath = dir.join(script_filename(kind, date));
    fs::write(&filepath, content)
        .with_context(|| format!("Failed to write script file: {}", filepath.display()))?;

    Ok(filepath)
}

pub fn save_session(session: &Session, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let filepath = dir.join(SESSION_FILE);
    let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
    fs::write(&filepath, json).context("Failed to write session file")?;

    // Holds bearer tokens
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&filepath, fs::Permissions::from_mode(0o600))
            .context("Failed to restrict session file permissions")?;
    }

    Ok(filepath)
}

/// Load the stored session, if any. A missing file is `Ok(None)`.
pub fn load_session(dir: &Path) -> Result<Option<Session>> {
    let filepath = dir.join(SESSION_FILE);
    if !filepath.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&filepath)
        .with_context(|| format!("Failed to read session file: {}", filepath.display()))?;

    let session: Session = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse session JSON from {}. Sign in again to replace it.",
            filepath.display()
        )
    })?;

    Ok(Some(session))
}

pub fn clear_session(dir: &Path) -> Result<()> {
    let filepath = dir.join(SESSION_FILE);
    if filepath.exists() {
        fs::remove_file(&filepath)
            .with_context(|| format!("Failed to remove session file: {}", filepath.display()))?;
    }
    Ok(())
}
