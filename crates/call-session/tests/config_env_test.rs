//! Environment-driven configuration

use serial_test::serial;
use talkline_call_session::config::{
    API_KEY_VAR, ASSISTANT_ID_VAR, PLACEHOLDER_API_KEY, SYSTEM_PROMPT_VAR, TRANSCRIPTION_LANGUAGE_VAR,
};
use talkline_call_session::SessionConfig;

fn clear_env() {
    for key in [API_KEY_VAR, ASSISTANT_ID_VAR, TRANSCRIPTION_LANGUAGE_VAR, SYSTEM_PROMPT_VAR] {
        // SAFETY: tests touching the environment run serially
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
#[serial]
fn test_from_env_reads_credentials() {
    clear_env();
    unsafe {
        std::env::set_var(API_KEY_VAR, "live-key");
        std::env::set_var(ASSISTANT_ID_VAR, "assistant-7");
        std::env::set_var(TRANSCRIPTION_LANGUAGE_VAR, "fr-FR");
    }

    let config = SessionConfig::from_env();

    assert_eq!(config.api_key, "live-key");
    assert_eq!(config.assistant_id, "assistant-7");
    assert_eq!(config.transcription_language.as_deref(), Some("fr-FR"));
    assert!(config.system_prompt.is_none());
    assert!(!config.needs_configuration());
    clear_env();
}

#[test]
#[serial]
fn test_from_env_without_variables_uses_placeholders() {
    clear_env();

    let config = SessionConfig::from_env();

    assert_eq!(config.api_key, PLACEHOLDER_API_KEY);
    assert!(config.needs_configuration());
    assert!(config.validate().is_ok());
}
