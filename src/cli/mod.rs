//! # CLI Module
//!
//! Command-line entry points for the `waypoint` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the demo server:
//!
//! ```bash
//! waypoint serve --addr 127.0.0.1:8080 --static-dir ./public --error-policy close
//! ```
//!
//! Flags override the `WAYPOINT_*` environment variables read by
//! [`RuntimeConfig`](crate::runtime_config::RuntimeConfig).
//!
//! ### `routes`
//!
//! Print every registered route and its handler:
//!
//! ```bash
//! waypoint routes
//! ```

mod commands;
#[cfg(test)]
mod tests;

pub use commands::{apply_overrides, build_dispatcher, demo_registrar, run_cli, Cli, Commands};
