//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Every tunable of the publish workflow lives here as a named numeric
//! parameter with a documented default: WebDriver endpoint, bounded-wait
//! ceilings, typing pacing ranges, credential storage, and the promo
//! generator. A configuration file is optional; the defaults are enough to
//! run against a local chromedriver.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Top-level configuration for the Scribe workspace.
#[derive(Debug, Clone, Deserialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub webdriver: WebDriverSection,
    #[serde(default)]
    pub workflow: WorkflowSection,
    #[serde(default)]
    pub pacing: PacingSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub secrets: SecretsSection,
    #[serde(default)]
    pub promo: Option<PromoSection>,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            webdriver: WebDriverSection::default(),
            workflow: WorkflowSection::default(),
            pacing: PacingSection::default(),
            storage: StorageSection::default(),
            secrets: SecretsSection::default(),
            promo: None,
        }
    }
}

/// Where and how the automated browser session is created.
#[derive(Debug, Clone, Deserialize)]
pub struct WebDriverSection {
    /// WebDriver service endpoint (chromedriver).
    #[serde(default = "default_webdriver_endpoint")]
    pub endpoint: String,
    /// Run the browser without a visible window.
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Browser window size as `[width, height]`.
    #[serde(default = "default_window_size")]
    pub window_size: [u32; 2],
    /// Accept-language handed to the browser. The target UI is Korean.
    #[serde(default = "default_lang")]
    pub lang: String,
}

impl Default for WebDriverSection {
    fn default() -> Self {
        Self {
            endpoint: default_webdriver_endpoint(),
            headless: true,
            window_size: default_window_size(),
            lang: default_lang(),
        }
    }
}

/// Bounded-wait ceilings for the publish state machine, in seconds.
///
/// Every blocking step in a run is capped by one of these; exceeding a cap
/// fails the run instead of hanging it.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    /// Ceiling on waiting for the URL to leave the login page.
    #[serde(default = "default_twenty")]
    pub login_wait_secs: u64,
    /// Ceiling on waiting for the editor container frame to appear.
    #[serde(default = "default_twenty")]
    pub editor_frame_wait_secs: u64,
    /// Ceiling on the best-effort checks for optional dialogs.
    #[serde(default = "default_five")]
    pub popup_wait_secs: u64,
    /// Budget for locating and clicking the final publish control.
    #[serde(default = "default_twenty")]
    pub publish_deadline_secs: u64,
    /// Ceiling on waiting for the page URL to change after publishing.
    #[serde(default = "default_twenty")]
    pub verify_wait_secs: u64,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            login_wait_secs: 20,
            editor_frame_wait_secs: 20,
            popup_wait_secs: 5,
            publish_deadline_secs: 20,
            verify_wait_secs: 20,
        }
    }
}

impl WorkflowSection {
    pub fn login_wait(&self) -> Duration {
        Duration::from_secs(self.login_wait_secs)
    }

    pub fn editor_frame_wait(&self) -> Duration {
        Duration::from_secs(self.editor_frame_wait_secs)
    }

    pub fn popup_wait(&self) -> Duration {
        Duration::from_secs(self.popup_wait_secs)
    }

    pub fn publish_deadline(&self) -> Duration {
        Duration::from_secs(self.publish_deadline_secs)
    }

    pub fn verify_wait(&self) -> Duration {
        Duration::from_secs(self.verify_wait_secs)
    }
}

/// Randomised pause ranges applied while typing, in milliseconds.
///
/// Only latency is randomised; the emitted character sequence is always
/// exactly the input.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingSection {
    /// Per-character pause range while typing the title.
    #[serde(default = "default_title_char_pause")]
    pub title_char_pause_ms: [u64; 2],
    /// Per-character pause range while typing body text.
    #[serde(default = "default_body_char_pause")]
    pub body_char_pause_ms: [u64; 2],
    /// Pause range after an end-of-line keypress, mimicking a writing pause.
    #[serde(default = "default_line_pause")]
    pub line_pause_ms: [u64; 2],
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            title_char_pause_ms: default_title_char_pause(),
            body_char_pause_ms: default_body_char_pause(),
            line_pause_ms: default_line_pause(),
        }
    }
}

/// Credential store location.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// SQLite database URL for linked credentials.
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

/// Key material for the at-rest credential cipher.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretsSection {
    /// 32-byte AES key, hex or base64 encoded. Usually supplied through
    /// `${SCRIBE_MASTER_KEY}` so the key never lands in a file.
    #[serde(default = "default_master_key")]
    pub master_key: String,
}

impl Default for SecretsSection {
    fn default() -> Self {
        Self {
            master_key: default_master_key(),
        }
    }
}

/// Promo copy generation (optional).
#[derive(Debug, Clone, Deserialize)]
pub struct PromoSection {
    pub api_key: String,
    #[serde(default = "default_promo_model")]
    pub model: String,
}

fn default_webdriver_endpoint() -> String {
    "http://localhost:9515".into()
}
fn default_true() -> bool {
    true
}
fn default_window_size() -> [u32; 2] {
    [1440, 900]
}
fn default_lang() -> String {
    "ko-KR".into()
}
fn default_twenty() -> u64 {
    20
}
fn default_five() -> u64 {
    5
}
fn default_title_char_pause() -> [u64; 2] {
    [30, 100]
}
fn default_body_char_pause() -> [u64; 2] {
    [20, 80]
}
fn default_line_pause() -> [u64; 2] {
    [150, 350]
}
fn default_database_url() -> String {
    "sqlite://scribe.db".into()
}
fn default_master_key() -> String {
    "${SCRIBE_MASTER_KEY}".into()
}
fn default_promo_model() -> String {
    "gemini-1.5-flash".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML file + env overrides).
pub struct ScribeConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ScribeConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScribeConfigLoader {
    /// Start with sensible defaults: `SCRIBE__`-prefixed env overrides on
    /// top of whatever files or snippets are attached afterwards.
    ///
    /// ```
    /// use scribe_config::ScribeConfigLoader;
    ///
    /// let config = ScribeConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.workflow.publish_deadline_secs, 20);
    /// assert_eq!(config.pacing.title_char_pause_ms, [30, 100]);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("SCRIBE").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers the format
    /// from the suffix. The file may be absent.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests and CLI overrides).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `${VAR}` placeholders are expanded recursively (with a depth cap so
    /// cyclic definitions terminate) before the typed structs materialise.
    pub fn load(self) -> Result<ScribeConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: ScribeConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
