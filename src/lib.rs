//! # waypoint
//!
//! **waypoint** is an embedded HTTP request router and dispatcher running on the
//! `may` coroutine runtime and `may_minihttp`.
//!
//! ## Overview
//!
//! For each request waypoint finds the handler registered for the method and
//! path (literal or `{variable}` templates), binds the handler's declared
//! parameters from the request (query string, path variables, headers,
//! cookies, body, uploaded files, session, the request context itself),
//! invokes it, and renders the result as JSON, an HTML template, plain text or
//! a redirect. Handler failures are routed to advice registered for the exact
//! error type.
//!
//! ## Architecture
//!
//! - **[`router`]** - URL templates and the two-tier route registry
//! - **[`params`]** - parameter resolvers (registration) and extractors (request)
//! - **[`dispatcher`]** - registration surface and the per-request stage machine
//! - **[`render`]** - response render selection and templates
//! - **[`server`]** - `may_minihttp` adapter and server handle
//! - **[`context`]** - per-request context and the inbound/outbound facades
//! - **[`multipart`]**, **[`session`]**, **[`static_files`]** - collaborators
//! - **[`runtime_config`]**, **[`logging`]**, **[`cli`]** - ambient stack
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as AppService<br/>(may_minihttp)
//!     participant Dispatcher
//!     participant Registry as RouteRegistry
//!     participant Pipeline as ParameterPipeline
//!     participant Handler
//!     participant Advice
//!     participant Renderer as ResponseRenderer
//!
//!     Client->>Server: GET /controller/pathVariable/Yi/42
//!     Server->>Dispatcher: dispatch(InboundRequest)
//!     Dispatcher->>Registry: lookup(GET, path)
//!     alt No route
//!         Dispatcher->>Dispatcher: static fallback
//!         Dispatcher-->>Client: 404 problem document
//!     end
//!     Registry-->>Dispatcher: RouteMatch {route, path_params}
//!     Dispatcher->>Pipeline: resolve(descriptors, ctx)
//!     alt Binding failed
//!         Dispatcher-->>Client: 400 problem document
//!     end
//!     Dispatcher->>Handler: call(&mut Args)
//!     alt Err or panic
//!         Dispatcher->>Advice: find(exact error type)
//!         Advice-->>Dispatcher: Reply, or 500 / close
//!     end
//!     Dispatcher->>Renderer: render(route, reply, response parts)
//!     Renderer-->>Server: OutboundResponse
//!     Server-->>Client: HTTP response + x-request-id
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use waypoint::params::{DeclaredType, ParamSpec};
//! use waypoint::server::{AppService, HttpServer};
//! use waypoint::{Registrar, Reply, RouteDefinition, ViewKind};
//!
//! let mut registrar = Registrar::new();
//! registrar.register_route(
//!     RouteDefinition::get("/hello/{name}", |args| {
//!         let name: String = args.get(0)?;
//!         Ok(Reply::text(format!("hello {name}")))
//!     })
//!     .param(ParamSpec::path("name", DeclaredType::Str))
//!     .view(ViewKind::Text),
//! )?;
//! let handle = HttpServer(AppService::from(registrar.freeze())).start("0.0.0.0:8080")?;
//! handle.join().ok();
//! ```
//!
//! ## Runtime Considerations
//!
//! Handlers run synchronously on the coroutine that owns the connection. A slow
//! handler delays its own connection only; use `may`'s blocking facilities for
//! blocking I/O. Stack size and worker count come from
//! [`RuntimeConfig`](runtime_config::RuntimeConfig).

pub mod cli;
pub mod context;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod multipart;
pub mod params;
pub mod render;
pub mod route;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod session;
pub mod static_files;

pub use context::{InboundRequest, OutboundResponse, RequestContext, ResponseParts};
pub use dispatcher::{
    AdviceDefinition, DispatchOutcome, Dispatcher, Registrar, UnhandledErrorPolicy,
};
pub use error::{
    BindingError, DispatchError, HandlerError, HandlerMessage, HandlerPanic, RegistrationError,
    RenderError,
};
pub use handler::{HandlerFn, HandlerResult, ModelAndView, Reply};
pub use route::{Route, RouteDefinition, ViewKind};
