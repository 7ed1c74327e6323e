#![forbid(unsafe_code)]

//! Manager configuration.

use crate::key::DEFAULT_KEY_PREFIX;

/// Environment variable read by [`ModalManagerConfig::from_env`].
pub const DEBUG_ENV_VAR: &str = "MODALKIT_DEBUG";

/// Configuration for a [`ModalManager`](crate::ModalManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalManagerConfig {
    /// Log registry transitions at debug level.
    pub debug: bool,
    /// Prefix used by [`ModalManager::generate_key`](crate::ModalManager::generate_key).
    pub key_prefix: String,
    /// Skip (and log) focus moves onto elements no longer in the document.
    pub guard_detached: bool,
}

impl Default for ModalManagerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            guard_detached: true,
        }
    }
}

impl ModalManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with `debug` taken from `MODALKIT_DEBUG` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup(DEBUG_ENV_VAR).is_some_and(|v| parse_flag(&v));
        Self::default().debug(debug)
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn guard_detached(mut self, guard: bool) -> Self {
        self.guard_detached = guard;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ModalManagerConfig::default();
        assert!(!config.debug);
        assert_eq!(config.key_prefix, "modal");
        assert!(config.guard_detached);
    }

    #[test]
    fn builder_chain() {
        let config = ModalManagerConfig::new()
            .debug(true)
            .key_prefix("popup")
            .guard_detached(false);
        assert!(config.debug);
        assert_eq!(config.key_prefix, "popup");
        assert!(!config.guard_detached);
    }

    #[test]
    fn lookup_reads_debug_variable() {
        let on = ModalManagerConfig::from_lookup(|name| {
            (name == DEBUG_ENV_VAR).then(|| "1".to_owned())
        });
        assert!(on.debug);
        assert_eq!(on.key_prefix, "modal");
        assert!(on.guard_detached);

        let off = ModalManagerConfig::from_lookup(|_| Some("0".to_owned()));
        assert!(!off.debug);

        let unset = ModalManagerConfig::from_lookup(|_| None);
        assert_eq!(unset, ModalManagerConfig::default());
    }

    #[test]
    fn lookup_ignores_other_variables() {
        let config = ModalManagerConfig::from_lookup(|name| {
            (name == "RUST_LOG").then(|| "debug".to_owned())
        });
        assert!(!config.debug);
    }

    #[test]
    fn flag_parsing() {
        for on in ["1", "true", "TRUE", " on ", "yes"] {
            assert!(parse_flag(on), "{on:?} should enable");
        }
        for off in ["0", "false", "", "nope"] {
            assert!(!parse_flag(off), "{off:?} should not enable");
        }
    }
}
