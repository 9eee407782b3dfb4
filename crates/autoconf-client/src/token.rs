//! Intro token resolution.

use autoconf_core::{AutoConfigError, AutoConfigSettings, Result};

/// Determine the intro token to present with the initial configuration request.
///
/// An inline `intro_token` wins. Otherwise `intro_token_file` is read and
/// trimmed, and must not be empty.
pub fn intro_token(settings: &AutoConfigSettings) -> Result<String> {
    if !settings.intro_token.is_empty() {
        return Ok(settings.intro_token.clone());
    }

    let Some(path) = settings.intro_token_file.as_deref() else {
        return Err(AutoConfigError::Config(
            "neither intro_token nor intro_token_file is configured".into(),
        ));
    };

    let content = std::fs::read_to_string(path).map_err(|e| {
        AutoConfigError::Config(format!(
            "failed to read intro token from {}: {e}",
            path.display()
        ))
    })?;

    let token = content.trim();
    if token.is_empty() {
        return Err(AutoConfigError::Config(format!(
            "intro_token_file {} did not contain any token",
            path.display()
        )));
    }

    Ok(token.to_string())
}
