use std::fs;
use std::path::{Path, PathBuf};

use dirs;

/// Base directory for tokens, cached API responses and saved logs,
/// `~/.github` by default. Created on first use.
pub fn base_dir() -> PathBuf {
    let mut home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.push(".github");
    if !home.exists() {
        let _ = fs::create_dir_all(&home);
    }
    home
}

/// Read the GitHub access token from `<base>/access_token.json` if present.
/// Requests work unauthenticated without it, just with tighter rate limits.
pub fn load_access_token(base_dir: &Path) -> Option<String> {
    let token_path = base_dir.join("access_token.json");
    if !token_path.exists() {
        return None;
    }
    let content = fs::read_to_string(&token_path).ok()?;
    let token_data: serde_json::Value = serde_json::from_str(&content).ok()?;
    token_data
        .get("access_token")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
