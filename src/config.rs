use std::time::Duration;
use tracing::warn;

use crate::error::PipelineError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Process-wide settings, built once at startup and handed to the gateway and router.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub text_model: String,
    pub image_model: String,
    pub analysis_timeout: Duration,
    pub synthesis_timeout: Duration,
    pub max_upload_bytes: usize,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Credentials and model identifiers must be
    /// present and non-blank; numeric settings fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PipelineError::Configuration("GEMINI_API_KEY is not set".into()))?;

        let api_base = lookup("GEMINI_API_BASE")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let text_model = required_model(&lookup, "GEMINI_TEXT_MODEL", DEFAULT_TEXT_MODEL)?;
        let image_model = required_model(&lookup, "GEMINI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL)?;

        Ok(Self {
            api_key,
            api_base,
            text_model,
            image_model,
            analysis_timeout: Duration::from_secs(nonzero_or(&lookup, "ANALYSIS_TIMEOUT_SECS", 30)),
            synthesis_timeout: Duration::from_secs(nonzero_or(&lookup, "SYNTHESIS_TIMEOUT_SECS", 120)),
            max_upload_bytes: nonzero_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            port: parse_or(&lookup, "PORT", 8080),
        })
    }
}

// A model id variable that is set but blank is a misconfiguration, not a request for the default.
fn required_model<F>(lookup: &F, key: &str, default: &str) -> Result<String, PipelineError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default.to_string()),
        Some(v) if v.trim().is_empty() => Err(PipelineError::Configuration(format!("{key} is blank"))),
        Some(v) => Ok(v.trim().to_string()),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value '{}' for {}, using default {}", raw, key, default);
            default
        }),
    }
}

// Zero deadlines or upload limits would fail every request.
fn nonzero_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display + PartialEq + Default,
{
    let value = parse_or(lookup, key, default);
    if value == T::default() {
        warn!("{} must be greater than zero, using default {}", key, default);
        return default;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err.kind(), "configuration");

        let err = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "   ")])).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert!(config.synthesis_timeout > config.analysis_timeout);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn blank_model_id_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "k"), ("GEMINI_IMAGE_MODEL", "")]))
            .unwrap_err();
        assert!(err.to_string().contains("GEMINI_IMAGE_MODEL"));
    }

    #[test]
    fn bad_numbers_fall_back_and_base_is_trimmed() {
        let config = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_API_BASE", "http://localhost:9000/v1beta/"),
            ("ANALYSIS_TIMEOUT_SECS", "soon"),
            ("PORT", "3000"),
        ]))
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:9000/v1beta");
        assert_eq!(config.analysis_timeout, Duration::from_secs(30));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn zero_limits_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("ANALYSIS_TIMEOUT_SECS", "0"),
            ("SYNTHESIS_TIMEOUT_SECS", "0"),
            ("MAX_UPLOAD_BYTES", "0"),
        ]))
        .unwrap();
        assert_eq!(config.analysis_timeout, Duration::from_secs(30));
        assert_eq!(config.synthesis_timeout, Duration::from_secs(120));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }
}
