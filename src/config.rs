//! Interpreter construction knobs (SPEC_FULL.md §5.3).
//!
//! Grounded on the teacher's optional `serde`/`toml` plugin-manifest
//! dependencies (`src/plugin/manifest.rs` in the teacher), repurposed
//! here for interpreter configuration instead of plugin manifests.

#[cfg_attr(feature = "config-file", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum procedure call-frame nesting depth (spec.md §5:
    /// "host-language recursion depth is bounded by proc-call nesting
    /// only"). Exceeding this is a Tcl-level error, not a Rust panic.
    pub max_proc_depth: usize,
    /// Maximum depth of the explicit evaluation-frame stack within a
    /// single `eval` call, guarding against runaway AST recursion in
    /// malformed or adversarial scripts.
    pub max_eval_stack: usize,
    /// Whether newly created interpreters start in "safe" mode
    /// (spec.md §3 Interpreter: `safe` flag).
    pub safe_by_default: bool,
    /// Default `errorCode` value before any error has been thrown.
    pub default_error_code: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_proc_depth: 1000,
            max_eval_stack: 100_000,
            safe_by_default: false,
            default_error_code: "NONE".to_string(),
        }
    }
}

#[cfg(feature = "config-file")]
impl Config {
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&text)?;
        Ok(cfg)
    }
}

#[cfg(feature = "config-file")]
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let cfg = Config::default();
        assert!(cfg.max_proc_depth > 0);
        assert!(cfg.max_eval_stack > 0);
        assert!(!cfg.safe_by_default);
        assert_eq!(cfg.default_error_code, "NONE");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn round_trips_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }
}
