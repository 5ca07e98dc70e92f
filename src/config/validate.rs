// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, RexError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RexError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_scheduler(cfg)?;
    validate_admission(cfg)?;
    validate_retry(cfg)?;
    Ok(())
}

fn validate_scheduler(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.name.trim().is_empty() {
        return Err(RexError::Config(
            "[scheduler].name must not be empty".to_string(),
        ));
    }

    let url = cfg.scheduler.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(RexError::Config(format!(
            "[scheduler].base_url must be an http(s) URL (got {url:?})"
        )));
    }
    Ok(())
}

fn validate_admission(cfg: &RawConfigFile) -> Result<()> {
    if cfg.admission.queue_page_size == 0 {
        return Err(RexError::Config(
            "[admission].queue_page_size must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_retry(cfg: &RawConfigFile) -> Result<()> {
    if cfg.retry.concurrent_update_attempts == 0 {
        return Err(RexError::Config(
            "[retry].concurrent_update_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.retry.internal_attempts == 0 {
        return Err(RexError::Config(
            "[retry].internal_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.retry.remote_attempts == 0 {
        return Err(RexError::Config(
            "[retry].remote_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.scheduler.name, "rex");
        assert!(cfg.scheduler.clean);
        assert_eq!(cfg.admission.max_concurrent, 10);
        assert_eq!(cfg.retry.concurrent_update_attempts, 15);
        assert_eq!(cfg.retry.remote_attempts, 5);
        assert_eq!(cfg.retry.internal_attempts, 5);
    }

    #[test]
    fn zero_ceiling_is_allowed() {
        let cfg = parse("[admission]\nmax_concurrent = 0\n").unwrap();
        assert_eq!(cfg.admission.max_concurrent, 0);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = parse("[scheduler]\nbase_url = \"ftp://host\"\n").unwrap_err();
        assert!(matches!(err, RexError::Config(msg) if msg.contains("base_url")));
    }

    #[test]
    fn rejects_zero_page_size_and_attempts() {
        assert!(parse("[admission]\nqueue_page_size = 0\n").is_err());
        assert!(parse("[retry]\nremote_attempts = 0\n").is_err());
        assert!(parse("[retry]\nconcurrent_update_attempts = 0\n").is_err());
        assert!(parse("[retry]\ninternal_attempts = 0\n").is_err());
    }

    #[test]
    fn unknown_types_fail_to_parse() {
        let err = parse("[admission]\nmax_concurrent = \"many\"\n").unwrap_err();
        assert!(matches!(err, RexError::Toml(_)));
    }
}
