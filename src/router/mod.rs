//! # Router Module
//!
//! Path matching and route resolution.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Parsing URL templates (`/users/{id}`) into literal and variable segments
//! - Rejecting duplicate (method, template) registrations
//! - Matching incoming request paths to registered routes
//! - Extracting path variables from matched routes
//!
//! ## Architecture
//!
//! Two tiers per HTTP method:
//!
//! 1. **Exact index**: templates without variables live in a hash map keyed by
//!    the normalized path. A hit returns immediately.
//!
//! 2. **Templated scan**: the remaining routes are tried in registration order.
//!    A pattern is skipped early when the path does not start with its literal
//!    prefix or has a different segment count. The first match wins; there is no
//!    specificity ranking, so register the more specific template first.
//!
//! ## Example
//!
//! ```rust,ignore
//! use http::Method;
//!
//! if let Some(m) = registry.lookup(&Method::GET, "/users/123?verbose=1") {
//!     println!("Handler: {}", m.route.handler_name);
//!     println!("User ID: {:?}", m.get_path_param("id"));
//! }
//! ```

mod core;
mod pattern;
#[cfg(test)]
mod tests;

pub use core::{RouteMatch, RouteRegistry, RouteTable};
pub use pattern::{normalize_path, ParamVec, PathPattern, PatternError, MAX_INLINE_PARAMS};
