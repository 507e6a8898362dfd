//! # Runtime Configuration
//!
//! Environment-driven settings for the coroutine runtime and the dispatcher.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `WAYPOINT_STACK_SIZE` | coroutine stack size, decimal or `0x` hex | `0x4000` |
//! | `WAYPOINT_WORKERS` | `may` worker threads | number of CPUs |
//! | `WAYPOINT_ERROR_POLICY` | `render` or `close` for unhandled handler errors | `render` |
//! | `WAYPOINT_STATIC_DIR` | static-file fallback directory | none |
//! | `WAYPOINT_TEMPLATE_DIR` | HTML template directory | none |
//! | `WAYPOINT_SESSION_TTL_SECS` | idle session expiry | `1800` |
//!
//! Unparseable values fall back to the default with a warning.
//!
//! ## Stack size
//!
//! Total coroutine memory is roughly `stack_size × concurrent connections`.
//! Handlers run on the connection's coroutine, so deep handler call chains
//! need a larger stack:
//! - simple handlers: `0x4000` (16 KB)
//! - template rendering or large bodies: `0x8000` (32 KB)
//! - deep recursion: `0x10000` (64 KB)
//!
//! ```rust,ignore
//! use waypoint::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! config.apply();
//! ```

use crate::dispatcher::UnhandledErrorPolicy;
use crate::session::DEFAULT_SESSION_TTL;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_STACK_SIZE: usize = 0x4000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Coroutine stack size in bytes.
    pub stack_size: usize,
    pub workers: usize,
    pub error_policy: UnhandledErrorPolicy,
    pub static_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
    pub session_ttl: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: default_workers(),
            error_policy: UnhandledErrorPolicy::default(),
            static_dir: None,
            template_dir: None,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, usize::from)
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

impl RuntimeConfig {
    /// Load from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("WAYPOINT_STACK_SIZE") {
            match parse_size(&raw) {
                Some(size) if size > 0 => config.stack_size = size,
                _ => warn!(value = %raw, "Invalid WAYPOINT_STACK_SIZE, using default"),
            }
        }
        if let Some(raw) = lookup("WAYPOINT_WORKERS") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.workers = n,
                _ => warn!(value = %raw, "Invalid WAYPOINT_WORKERS, using default"),
            }
        }
        if let Some(raw) = lookup("WAYPOINT_ERROR_POLICY") {
            match raw.parse() {
                Ok(policy) => config.error_policy = policy,
                Err(err) => warn!(error = %err, "Invalid WAYPOINT_ERROR_POLICY, using default"),
            }
        }
        config.static_dir = lookup("WAYPOINT_STATIC_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        config.template_dir = lookup("WAYPOINT_TEMPLATE_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        if let Some(raw) = lookup("WAYPOINT_SESSION_TTL_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.session_ttl = Duration::from_secs(secs),
                _ => warn!(value = %raw, "Invalid WAYPOINT_SESSION_TTL_SECS, using default"),
            }
        }
        config
    }

    /// Push the stack size and worker count into `may`'s global config.
    /// Must run before the first coroutine is spawned.
    pub fn apply(&self) {
        may::config()
            .set_stack_size(self.stack_size)
            .set_workers(self.workers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
        assert!(config.workers >= 1);
        assert_eq!(config.error_policy, UnhandledErrorPolicy::Render);
        assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn test_stack_size_hex_and_decimal() {
        assert_eq!(load(&[("WAYPOINT_STACK_SIZE", "0x8000")]).stack_size, 0x8000);
        assert_eq!(load(&[("WAYPOINT_STACK_SIZE", "32768")]).stack_size, 32768);
        assert_eq!(
            load(&[("WAYPOINT_STACK_SIZE", "lots")]).stack_size,
            DEFAULT_STACK_SIZE
        );
    }

    #[test]
    fn test_full_environment() {
        let config = load(&[
            ("WAYPOINT_WORKERS", "3"),
            ("WAYPOINT_ERROR_POLICY", "close"),
            ("WAYPOINT_STATIC_DIR", "./public"),
            ("WAYPOINT_TEMPLATE_DIR", "./templates"),
            ("WAYPOINT_SESSION_TTL_SECS", "60"),
        ]);
        assert_eq!(config.workers, 3);
        assert_eq!(config.error_policy, UnhandledErrorPolicy::Close);
        assert_eq!(config.static_dir, Some(PathBuf::from("./public")));
        assert_eq!(config.template_dir, Some(PathBuf::from("./templates")));
        assert_eq!(config.session_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = load(&[
            ("WAYPOINT_WORKERS", "0"),
            ("WAYPOINT_ERROR_POLICY", "explode"),
            ("WAYPOINT_SESSION_TTL_SECS", "-5"),
        ]);
        assert!(config.workers >= 1);
        assert_eq!(config.error_policy, UnhandledErrorPolicy::Render);
        assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
    }
}
