//! Dispatcher core: the per-request stage machine.
//!
//! Every request walks `Lookup -> Bind -> Invoke -> (HandleFailure) -> Render`
//! on the coroutine that owns its connection. A failing stage jumps to `Fail`,
//! which renders a problem document. Stages never move backwards.

// Allocations on this path are limited to error handling and logging.
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use super::advice::{AdviceEntry, AdviceRegistry};
use crate::context::{InboundRequest, OutboundResponse, RequestContext};
use crate::error::{DispatchError, HandlerError, HandlerPanic};
use crate::handler::{HandlerFn, Reply};
use crate::ids::REQUEST_ID_HEADER;
use crate::multipart::MultipartConfig;
use crate::params::{Arg, Args, ParameterPipeline};
use crate::render::ResponseRenderer;
use crate::route::Route;
use crate::router::RouteRegistry;
use crate::session::SessionStore;
use crate::static_files::StaticFallback;
use http::{Method, StatusCode};
use serde_json::json;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// What to do with a handler failure no advice claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnhandledErrorPolicy {
    /// Answer with a 500 problem document.
    #[default]
    Render,
    /// Produce no response; the transport turns this into an I/O error.
    Close,
}

impl fmt::Display for UnhandledErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnhandledErrorPolicy::Render => "render",
            UnhandledErrorPolicy::Close => "close",
        })
    }
}

impl FromStr for UnhandledErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "render" | "500" => Ok(UnhandledErrorPolicy::Render),
            "close" => Ok(UnhandledErrorPolicy::Close),
            other => Err(format!(
                "unknown error policy '{other}' (expected 'render' or 'close')"
            )),
        }
    }
}

/// Result of dispatching one request.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Respond(OutboundResponse),
    /// No response is rendered; [`AppService`](crate::server::AppService)
    /// reports an I/O error to the transport instead.
    Close,
}

impl DispatchOutcome {
    #[must_use]
    pub fn response(&self) -> Option<&OutboundResponse> {
        match self {
            DispatchOutcome::Respond(resp) => Some(resp),
            DispatchOutcome::Close => None,
        }
    }

    #[must_use]
    pub fn into_response(self) -> Option<OutboundResponse> {
        match self {
            DispatchOutcome::Respond(resp) => Some(resp),
            DispatchOutcome::Close => None,
        }
    }

    #[must_use]
    pub fn is_close(&self) -> bool {
        matches!(self, DispatchOutcome::Close)
    }
}

/// Per-request invocation state. The route itself stays immutable.
#[derive(Debug)]
pub struct InvocationFrame {
    pub route: Arc<Route>,
    pub args: Vec<Arg>,
    pub outcome: Option<Result<Reply, Arc<HandlerError>>>,
}

impl InvocationFrame {
    fn new(route: Arc<Route>) -> Self {
        Self {
            route,
            args: Vec::new(),
            outcome: None,
        }
    }
}

enum Stage {
    Lookup,
    Bind(InvocationFrame),
    Invoke(InvocationFrame),
    HandleFailure(InvocationFrame, Arc<HandlerError>),
    Render(Arc<Route>, Reply),
    Fail(DispatchError),
    Done(OutboundResponse),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Lookup => "lookup",
            Stage::Bind(_) => "bind",
            Stage::Invoke(_) => "invoke",
            Stage::HandleFailure(..) => "handle_failure",
            Stage::Render(..) => "render",
            Stage::Fail(_) => "fail",
            Stage::Done(_) => "done",
        }
    }
}

/// Routes requests to handlers. Built by
/// [`Registrar::freeze`](super::Registrar::freeze); read-only afterwards and
/// shared by every worker.
pub struct Dispatcher {
    pub(super) registry: RouteRegistry,
    pub(super) pipeline: ParameterPipeline,
    pub(super) advice: AdviceRegistry,
    pub(super) renderer: ResponseRenderer,
    pub(super) static_fallback: Option<Arc<dyn StaticFallback>>,
    pub(super) sessions: Option<Arc<dyn SessionStore>>,
    pub(super) error_policy: UnhandledErrorPolicy,
    pub(super) multipart: MultipartConfig,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.registry.len())
            .field("advice", &self.advice.len())
            .field("static_fallback", &self.static_fallback.is_some())
            .field("sessions", &self.sessions.is_some())
            .field("error_policy", &self.error_policy)
            .finish_non_exhaustive()
    }
}

/// Call a handler with its bound values, capturing errors and panics.
///
/// Returns the values so the frame keeps them after the call.
fn invoke(
    handler: &HandlerFn,
    handler_name: &str,
    values: Vec<Arg>,
    ctx: &mut RequestContext,
) -> (Vec<Arg>, Result<Reply, Arc<HandlerError>>) {
    let request_id = ctx.request_id();
    let start = Instant::now();
    debug!(
        request_id = %request_id,
        handler_name = %handler_name,
        args = values.len(),
        "Handler execution start"
    );

    let mut args = Args::new(values, ctx);
    let result = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut args)));
    let values = args.into_values();
    let execution_time_ms = start.elapsed().as_millis();

    let outcome = match result {
        Ok(Ok(reply)) => {
            debug!(
                request_id = %request_id,
                handler_name = %handler_name,
                execution_time_ms = execution_time_ms,
                "Handler execution complete"
            );
            Ok(reply)
        }
        Ok(Err(err)) => {
            warn!(
                request_id = %request_id,
                handler_name = %handler_name,
                error_type = err.type_name(),
                error = %err,
                execution_time_ms = execution_time_ms,
                "Handler returned error"
            );
            Err(Arc::new(err))
        }
        Err(payload) => {
            let panic = HandlerPanic::from_payload(payload);
            error!(
                request_id = %request_id,
                handler_name = %handler_name,
                panic_message = %panic.message,
                backtrace = %std::backtrace::Backtrace::capture(),
                "Handler panicked - CRITICAL"
            );
            Err(Arc::new(HandlerError::new(panic)))
        }
    };
    (values, outcome)
}

/// The failed route rendered with the advice's view settings.
fn advice_route(route: &Arc<Route>, entry: &AdviceEntry) -> Arc<Route> {
    if entry.view.is_none() && entry.template.is_none() {
        return Arc::clone(route);
    }
    let mut effective = Route::clone(route);
    effective.handler_name = Arc::clone(&entry.handler_name);
    effective.handler = Arc::clone(&entry.handler);
    effective.descriptors = Arc::clone(&entry.descriptors);
    if let Some(view) = entry.view {
        effective.view = view;
    }
    if let Some(template) = &entry.template {
        effective.template = Some(Arc::clone(template));
    }
    Arc::new(effective)
}

impl Dispatcher {
    #[must_use]
    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.registry.routes()
    }

    #[must_use]
    pub fn error_policy(&self) -> UnhandledErrorPolicy {
        self.error_policy
    }

    /// Run one request through the stage machine.
    pub fn dispatch(&self, req: InboundRequest) -> DispatchOutcome {
        let start = Instant::now();
        let mut ctx = RequestContext::from_inbound(req, self.sessions.clone(), &self.multipart);
        debug!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            "Request received"
        );

        let mut stage = Stage::Lookup;
        let resp = loop {
            debug!(request_id = %ctx.request_id(), stage = stage.name(), "Dispatch stage");
            stage = match stage {
                Stage::Lookup => self.lookup(&mut ctx),
                Stage::Bind(mut frame) => {
                    match self.pipeline.resolve(&frame.route.descriptors, &mut ctx) {
                        Ok(args) => {
                            frame.args = args;
                            Stage::Invoke(frame)
                        }
                        Err(err) => Stage::Fail(err),
                    }
                }
                Stage::Invoke(mut frame) => {
                    let route = Arc::clone(&frame.route);
                    let values = std::mem::take(&mut frame.args);
                    let (values, outcome) =
                        invoke(&route.handler, &route.handler_name, values, &mut ctx);
                    frame.args = values;
                    match outcome {
                        Ok(reply) => Stage::Render(route, reply),
                        Err(err) => {
                            frame.outcome = Some(Err(Arc::clone(&err)));
                            Stage::HandleFailure(frame, err)
                        }
                    }
                }
                Stage::HandleFailure(frame, err) => self.handle_failure(frame, err, &mut ctx),
                Stage::Render(route, reply) => {
                    match self.renderer.render(&route, reply, ctx.response()) {
                        Ok(resp) => Stage::Done(resp),
                        Err(err) => {
                            error!(
                                request_id = %ctx.request_id(),
                                handler_name = %route.handler_name,
                                error = %err,
                                "Response render failed"
                            );
                            Stage::Fail(DispatchError::Render(err))
                        }
                    }
                }
                Stage::Fail(err) => {
                    ctx.discard_new_session();
                    if matches!(err, DispatchError::HandlerInvocation { .. })
                        && self.error_policy == UnhandledErrorPolicy::Close
                    {
                        warn!(
                            request_id = %ctx.request_id(),
                            error = %err,
                            "Unhandled handler error, closing connection"
                        );
                        return DispatchOutcome::Close;
                    }
                    Stage::Done(Self::error_response(&err, &ctx))
                }
                Stage::Done(resp) => break resp,
            };
        };

        let resp = Self::finalize(resp, &ctx);
        info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            status = resp.status,
            handler_name = ctx.route().map(|r| r.handler_name.as_ref()).unwrap_or("-"),
            latency_ms = start.elapsed().as_millis(),
            "Request completed"
        );
        DispatchOutcome::Respond(resp)
    }

    fn lookup(&self, ctx: &mut RequestContext) -> Stage {
        if let Some(m) = self.registry.lookup(ctx.method(), ctx.uri()) {
            debug!(
                request_id = %ctx.request_id(),
                handler_name = %m.route.handler_name,
                "Request dispatched to handler"
            );
            let route = Arc::clone(&m.route);
            ctx.set_route(m.route, Some(m.path_params));
            return Stage::Bind(InvocationFrame::new(route));
        }

        if matches!(*ctx.method(), Method::GET | Method::HEAD) {
            if let Some(resp) = self
                .static_fallback
                .as_ref()
                .and_then(|fallback| fallback.try_serve(ctx.path()))
            {
                return Stage::Done(resp);
            }
        }

        Stage::Fail(DispatchError::RouteNotFound {
            method: ctx.method().clone(),
            path: ctx.path().to_string(),
        })
    }

    fn handle_failure(
        &self,
        frame: InvocationFrame,
        err: Arc<HandlerError>,
        ctx: &mut RequestContext,
    ) -> Stage {
        ctx.set_failure(Arc::clone(&err));

        let Some(entry) = self.advice.find(&err) else {
            return Stage::Fail(DispatchError::HandlerInvocation {
                handler: frame.route.handler_name.to_string(),
                error: err,
            });
        };
        debug!(
            request_id = %ctx.request_id(),
            error_type = err.type_name(),
            advice = %entry.handler_name,
            "Advice selected"
        );

        let values = match self.pipeline.resolve(&entry.descriptors, ctx) {
            Ok(values) => values,
            Err(bind_err) => return Stage::Fail(bind_err),
        };
        match invoke(&entry.handler, &entry.handler_name, values, ctx).1 {
            Ok(reply) => {
                if let Some(status) = entry.status {
                    ctx.response_mut().set_status(status);
                }
                Stage::Render(advice_route(&frame.route, entry), reply)
            }
            Err(advice_err) => Stage::Fail(DispatchError::HandlerInvocation {
                handler: entry.handler_name.to_string(),
                error: advice_err,
            }),
        }
    }

    /// JSON problem document for a failed request.
    fn error_response(err: &DispatchError, ctx: &RequestContext) -> OutboundResponse {
        let status = err.status();
        if status >= 500 {
            error!(request_id = %ctx.request_id(), status = status, error = %err, "Request failed");
        } else {
            debug!(request_id = %ctx.request_id(), status = status, error = %err, "Request rejected");
        }
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Error");
        let body = json!({
            "error": reason,
            "message": err.to_string(),
            "status": status,
            "method": ctx.method().as_str(),
            "path": ctx.path(),
            "request_id": ctx.request_id().to_string(),
        });
        OutboundResponse::json(status, &body)
    }

    /// Request id echo, keep-alive decision and HEAD body stripping.
    fn finalize(mut resp: OutboundResponse, ctx: &RequestContext) -> OutboundResponse {
        resp.set_header(REQUEST_ID_HEADER, ctx.request_id().to_string());
        if !ctx.keep_alive() {
            resp.set_header("connection", "close");
        }
        if *ctx.method() == Method::HEAD {
            resp.body.clear();
        }
        resp
    }
}
