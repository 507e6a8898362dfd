//! # Dispatcher Module
//!
//! Registration surface ([`Registrar`]) and the per-request dispatch stage
//! machine ([`Dispatcher`]).
//!
//! ## Overview
//!
//! The dispatcher owns everything needed to answer a request once startup is
//! over:
//! - the route registry (lock-free lookups through an `ArcSwap` snapshot)
//! - the parameter pipeline (one extractor per source kind)
//! - the advice map (error handlers keyed by exact error type)
//! - the response renderer and its templates
//! - the optional static-file fallback and session store
//!
//! ## Request Flow
//!
//! 1. **Lookup**: match method and path; on a miss try the static fallback
//!    (GET and HEAD only), then answer 404
//! 2. **Bind**: resolve every parameter descriptor into a positional argument
//! 3. **Invoke**: call the handler; an `Err` or a panic is captured
//! 4. **Handle failure**: advice for the exact error type replaces the result;
//!    without advice the [`UnhandledErrorPolicy`] decides
//! 5. **Render**: JSON, HTML, text or redirect
//!
//! Handlers run synchronously on the coroutine that owns the connection. A
//! slow handler delays only that connection.
//!
//! ## Registration
//!
//! ```rust,ignore
//! use waypoint::dispatcher::{AdviceDefinition, Registrar};
//! use waypoint::params::{DeclaredType, ParamSpec};
//! use waypoint::{Reply, RouteDefinition, ViewKind};
//!
//! let mut registrar = Registrar::new();
//! registrar.register_route(
//!     RouteDefinition::get("/controller/requestParam", |args| {
//!         let name: String = args.get(0)?;
//!         Ok(Reply::text(format!("requestParam:{name}")))
//!     })
//!     .param(ParamSpec::query("name", DeclaredType::Str))
//!     .view(ViewKind::Text),
//! )?;
//! registrar.register_advice::<MyError>(
//!     AdviceDefinition::new(|args| Ok(Reply::text("handled")))
//!         .param(ParamSpec::failure("error")),
//! )?;
//! let dispatcher = registrar.freeze();
//! ```
//!
//! ## Error Handling
//!
//! - Route miss: 404 problem document
//! - Binding failures: 400
//! - Render failures: 500
//! - Unclaimed handler failures: 500, or [`DispatchOutcome::Close`] under
//!   [`UnhandledErrorPolicy::Close`]

mod advice;
mod core;
mod registrar;

pub use advice::{AdviceDefinition, AdviceEntry, AdviceRegistry};
pub use core::{DispatchOutcome, Dispatcher, InvocationFrame, UnhandledErrorPolicy};
pub use registrar::Registrar;
