// src/config/model.rs

use serde::Deserialize;

/// Configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// name = "rex"
/// base_url = "http://localhost:8080"
/// clean = true
///
/// [admission]
/// max_concurrent = 10
/// queue_page_size = 100
///
/// [retry]
/// concurrent_update_attempts = 15
/// internal_attempts = 5
/// remote_attempts = 5
/// remote_backoff_ms = 100
///
/// [http]
/// timeout_secs = 30
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub admission: AdmissionSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub http: HttpSection,
}

/// A configuration that passed validation. Build it with
/// `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub admission: AdmissionSection,
    pub retry: RetrySection,
    pub http: HttpSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            scheduler: raw.scheduler,
            admission: raw.admission,
            retry: raw.retry,
            http: raw.http,
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Deployment identity sent along with caller notifications.
    #[serde(default = "default_name")]
    pub name: String,

    /// Base URL workers use to report back.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Delete finished tasks once nothing depends on them.
    #[serde(default = "default_true")]
    pub clean: bool,
}

fn default_name() -> String {
    "rex".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            base_url: default_base_url(),
            clean: default_true(),
        }
    }
}

/// `[admission]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionSection {
    /// Initial ceiling on tasks in STARTING/UP/STOPPING. Adjustable at runtime.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u64,

    /// ENQUEUED tasks fetched per queue poke.
    #[serde(default = "default_queue_page_size")]
    pub queue_page_size: usize,
}

fn default_max_concurrent() -> u64 {
    10
}

fn default_queue_page_size() -> usize {
    100
}

impl Default for AdmissionSection {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            queue_page_size: default_queue_page_size(),
        }
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Replays of a client call that lost an optimistic race.
    #[serde(default = "default_concurrent_update_attempts")]
    pub concurrent_update_attempts: u32,

    /// Replays of an internal transaction (queue poke, remote outcome
    /// report) that lost an optimistic race.
    #[serde(default = "default_internal_attempts")]
    pub internal_attempts: u32,

    /// Attempts per remote HTTP call.
    #[serde(default = "default_remote_attempts")]
    pub remote_attempts: u32,

    /// First backoff delay between remote attempts; doubles each time.
    #[serde(default = "default_remote_backoff_ms")]
    pub remote_backoff_ms: u64,
}

fn default_concurrent_update_attempts() -> u32 {
    15
}

fn default_internal_attempts() -> u32 {
    5
}

fn default_remote_attempts() -> u32 {
    5
}

fn default_remote_backoff_ms() -> u64 {
    100
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            concurrent_update_attempts: default_concurrent_update_attempts(),
            internal_attempts: default_internal_attempts(),
            remote_attempts: default_remote_attempts(),
            remote_backoff_ms: default_remote_backoff_ms(),
        }
    }
}

/// `[http]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}
