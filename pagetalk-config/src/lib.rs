//! Loader for workspace configuration with YAML + environment overlays.
//!
//! `pagetalk.yaml` is optional: every field has a default, so a deployment
//! can run purely on `PAGETALK__`-prefixed environment variables (e.g.
//! `PAGETALK__LLM__API_KEY`). `${VAR}` placeholders inside string values are
//! expanded after merging, so secrets can be referenced instead of inlined.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Top-level settings for the Pagetalk server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagetalkSettings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub scrape: ScrapeSettings,
    pub cache: CacheSettings,
    pub chat: ChatSettings,
}

impl Default for PagetalkSettings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            llm: LlmSettings::default(),
            scrape: ScrapeSettings::default(),
            cache: CacheSettings::default(),
            chat: ChatSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address the HTTP listener binds to.
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible chat-completions endpoint.
    pub endpoint: String,
    pub model: String,
    /// API key; typically `${GROQ_API_KEY}` in the YAML file.
    pub api_key: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/".into(),
            model: "llama3-8b-8192".into(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    /// Upper bound on concurrently scraped URLs per request.
    pub concurrency: usize,
    /// Deadline for the lightweight HTTP fetch tier, in seconds.
    pub fetch_timeout_secs: u64,
    /// Total navigation deadline for the rendered tier, in seconds.
    pub render_timeout_secs: u64,
    /// How long the rendered tier waits for a `body` element, in seconds.
    pub body_wait_secs: u64,
    /// WebDriver endpoint (chromedriver) for the rendered tier.
    pub webdriver_url: String,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            fetch_timeout_secs: 10,
            render_timeout_secs: 10,
            body_wait_secs: 5,
            webdriver_url: "http://localhost:9515".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Time-to-live for cached scrape results, in seconds.
    pub ttl_secs: u64,
    /// Serialized entries larger than this are computed but never stored.
    pub max_entry_bytes: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            // 7 days
            ttl_secs: 7 * 24 * 60 * 60,
            max_entry_bytes: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Prior turns retained when assembling the model context; oldest
    /// turns beyond this are dropped.
    pub max_context_turns: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_context_turns: 10,
        }
    }
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

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct SettingsLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Start with the defaults: `PAGETALK__` env overrides only.
    ///
    /// ```
    /// use pagetalk_config::SettingsLoader;
    ///
    /// let settings = SettingsLoader::new().load().expect("defaults load");
    /// assert_eq!(settings.scrape.concurrency, 4);
    /// assert_eq!(settings.cache.max_entry_bytes, 1_000_000);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("PAGETALK")
                .separator("__")
                .try_parsing(true));
        Self { builder }
    }

    /// Attach an optional settings file; missing files are skipped so
    /// headless deployments can rely purely on environment variables.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests and CLI overrides).
    ///
    /// ```
    /// use pagetalk_config::SettingsLoader;
    ///
    /// let settings = SettingsLoader::new()
    ///     .with_yaml_str("scrape:\n  concurrency: 8")
    ///     .load()
    ///     .expect("valid settings");
    /// assert_eq!(settings.scrape.concurrency, 8);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `${VAR}` placeholders are expanded after merging, recursively up to a
    /// fixed depth so cyclic definitions terminate.
    pub fn load(self) -> Result<PagetalkSettings, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: PagetalkSettings =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_nested_objects() {
        temp_env::with_var("SECRET", Some("k-123"), || {
            let mut v = json!({ "llm": { "api_key": "${SECRET}" }, "n": 4 });
            expand_env_in_value(&mut v);
            assert_eq!(v, json!({ "llm": { "api_key": "k-123" }, "n": 4 }));
        });
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST}"));
    }
}
