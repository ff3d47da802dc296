//! Structural checks run once before a session may automate anything.

use crate::config::{Config, Preferences, TransportMode};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::wait::WaitOptions;

/// Validates a session's identity, configuration and preferences.
///
/// # Errors
///
/// [`Error::Config`] describing the first violated invariant.
pub fn validate(id: &SessionId, config: &Config, preferences: &Preferences) -> Result<()> {
    if id.is_blank() {
        return Err(Error::config("Session id is missing"));
    }

    if config.name.trim().is_empty() {
        return Err(Error::config("Config name is empty"));
    }
    if config.name.contains('/') {
        return Err(Error::config(format!(
            "Config name '{}' must not contain '/'",
            config.name
        )));
    }

    check_wait("find", config.find)?;
    check_wait("wait_for_element", config.wait_for_element)?;

    if let Some(out_file) = &preferences.out_file
        && out_file.trim().is_empty()
    {
        return Err(Error::config("Output file is empty"));
    }

    if let Some(url) = &config.remote
        && !matches!(url.scheme(), "ws" | "wss")
    {
        return Err(Error::config(format!(
            "Remote target '{url}' must be a ws:// or wss:// URL"
        )));
    }

    if config.capture_on_init()
        && config.transport_mode() == TransportMode::Remote
        && config.content_root.is_none()
    {
        return Err(Error::config(
            "A content root is required to save server-side test data",
        ));
    }

    Ok(())
}

fn check_wait(what: &str, options: WaitOptions) -> Result<()> {
    if options.timeout_ms == 0 || options.interval_ms == 0 {
        return Err(Error::config(format!(
            "{what} wait needs a positive timeout and interval, got {}ms/{}ms",
            options.timeout_ms, options.interval_ms
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> (SessionId, Config, Preferences) {
        let config = Config::default();
        let preferences = config.preferences.clone();
        (SessionId::new("s-1"), config, preferences)
    }

    #[test]
    fn test_default_config_is_valid() {
        let (id, config, preferences) = valid();
        assert!(validate(&id, &config, &preferences).is_ok());
    }

    #[test]
    fn test_blank_session_id() {
        let (_, config, preferences) = valid();
        let err = validate(&SessionId::new("  "), &config, &preferences).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_name_with_slash() {
        let (id, mut config, preferences) = valid();
        config.name = "a/b".into();
        assert!(validate(&id, &config, &preferences).is_err());
    }

    #[test]
    fn test_zero_interval() {
        let (id, mut config, preferences) = valid();
        config.find = WaitOptions::new(5000, 0);
        let err = validate(&id, &config, &preferences).unwrap_err();
        assert!(err.to_string().contains("find wait"));
    }

    #[test]
    fn test_blank_out_file() {
        let (id, config, mut preferences) = valid();
        preferences.out_file = Some(String::new());
        assert!(validate(&id, &config, &preferences).is_err());
    }

    #[test]
    fn test_remote_capture_needs_content_root() {
        let (id, _, preferences) = valid();
        let config = Config::builder()
            .remote("ws://127.0.0.1:9400")
            .enable_server(true)
            .can_save_test_data(true)
            .build()
            .expect("config");
        assert!(validate(&id, &config, &preferences).is_err());

        let config = Config::builder()
            .remote("ws://127.0.0.1:9400")
            .enable_server(true)
            .can_save_test_data(true)
            .content_root("/srv/app/wwwroot")
            .build()
            .expect("config");
        assert!(validate(&id, &config, &preferences).is_ok());
    }
}
