//! Loader for webinfo configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, YAML files and snippets in the
//! order they were added, then `WEBINFO__`-prefixed environment variables
//! (`WEBINFO__OPENAI__MODEL=gpt-4o` sets `openai.model`). String values may
//! reference the environment as `${VAR}`; references are expanded after the
//! sources are merged. The API key defaults to `${OPENAI_API_KEY}`.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Names the YAML file read by [`WebinfoConfigLoader::from_env`].
pub const CONFIG_PATH_ENV: &str = "WEBINFO_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "webinfo.yaml";

const ENV_PREFIX: &str = "WEBINFO";
const ENV_SEPARATOR: &str = "__";
const LIST_KEYS: &[&str] = &["extract.noise_tags", "extract.ad_classes"];

const DEFAULTS_YAML: &str = r#"
openai:
  api_key: "${OPENAI_API_KEY}"
  model: "gpt-4o-mini"
  base_url: "https://api.openai.com/v1"
  max_tokens: 800
  temperature: 0.5
extract:
  noise_tags: ["aside", "footer", "nav", "script"]
  ad_classes: ["ad", "advertisement", "banner"]
  heading_style: "atx"
http:
  timeout_secs: 60
  retries: 0
log:
  format: "text"
  stderr: false
  filter: "info"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct WebinfoConfig {
    pub openai: OpenAiSettings,
    pub extract: ExtractSettings,
    pub http: HttpSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractSettings {
    pub noise_tags: Vec<String>,
    pub ad_classes: Vec<String>,
    /// `atx` or `setext`.
    pub heading_style: String,
}

/// Applies to both the page fetch and the completion call.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub retries: usize,
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// `text` or `json`.
    pub format: String,
    pub stderr: bool,
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
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

/// Runs before any fetch. The key is required even for pages that end up
/// needing no completion, so a bad setup fails at startup.
fn validate(cfg: &WebinfoConfig) -> Result<(), ConfigError> {
    let key = cfg.openai.api_key.trim();
    if key.is_empty() || key.contains("${") {
        return Err(ConfigError::Message(
            "openai.api_key is not set: export OPENAI_API_KEY (a .env file works) \
             or set WEBINFO__OPENAI__API_KEY"
                .into(),
        ));
    }
    if cfg.openai.model.trim().is_empty() {
        return Err(ConfigError::Message("openai.model must not be empty".into()));
    }
    Ok(())
}

/// Builder hides the `config` crate wiring (defaults + YAML + env overrides).
pub struct WebinfoConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for WebinfoConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl WebinfoConfigLoader {
    /// Start from the built-in defaults.
    ///
    /// ```
    /// use webinfo_config::WebinfoConfigLoader;
    ///
    /// let config = WebinfoConfigLoader::new()
    ///     .with_yaml_str("openai:\n  api_key: sk-test")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.openai.model, "gpt-4o-mini");
    /// assert_eq!(config.openai.max_tokens, 800);
    /// assert_eq!(config.http.retries, 0);
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULTS_YAML, FileFormat::Yaml));
        Self { builder }
    }

    /// Defaults plus the optional file named by `WEBINFO_CONFIG`, falling back
    /// to `webinfo.yaml` in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::new().with_optional_file(path)
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use webinfo_config::WebinfoConfigLoader;
    ///
    /// let cfg = WebinfoConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// openai:
    ///   api_key: "sk-inline"
    /// extract:
    ///   ad_classes: ["promo"]
    ///   heading_style: "setext"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.extract.ad_classes, vec!["promo".to_string()]);
    /// assert_eq!(cfg.extract.noise_tags.len(), 4);
    /// assert_eq!(cfg.extract.heading_style, "setext");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// Environment overrides are applied last, then `${VAR}` placeholders are
    /// expanded and the result is checked for a usable API key.
    ///
    /// ```
    /// use webinfo_config::WebinfoConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_OPENAI_KEY", "injected-from-env"); }
    ///
    /// let config = WebinfoConfigLoader::new()
    ///     .with_yaml_str("openai:\n  api_key: \"${DOCTEST_OPENAI_KEY}\"")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.openai.api_key, "injected-from-env");
    /// assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    ///
    /// unsafe { std::env::remove_var("DOCTEST_OPENAI_KEY"); }
    /// ```
    pub fn load(self) -> Result<WebinfoConfig, ConfigError> {
        let mut env = Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }

        let cfg = self.builder.add_source(env).build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: WebinfoConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        validate(&typed)?;

        Ok(typed)
    }
}
