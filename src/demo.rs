//! Demo application served by `waypoint serve`.
//!
//! One route per binding source and render path, plus an error type with
//! advice and a wrapper type without.

use crate::dispatcher::{AdviceDefinition, Registrar};
use crate::error::{HandlerError, RegistrationError};
use crate::handler::{ModelAndView, Reply};
use crate::params::{DeclaredType, ParamSpec};
use crate::route::{RouteDefinition, ViewKind};
use serde_json::{json, Value};
use thiserror::Error;

/// Raised by `/controller/fail`; claimed by advice.
#[derive(Debug, Error)]
#[error("demo failure: {0}")]
pub struct DemoError(pub String);

/// Wraps a [`DemoError`]. No advice is registered for it.
#[derive(Debug, Error)]
#[error("wrapped: {0}")]
pub struct WrappedDemoError(#[source] pub DemoError);

pub const GREETING_TEMPLATE: &str = "<!doctype html>\n<h1>Hello {{ name }}!</h1>\n";

fn routes() -> Vec<RouteDefinition> {
    vec![
        RouteDefinition::get("/controller/requestParam", |args| {
            let name: String = args.get(0)?;
            Ok(Reply::text(format!("requestParam:{name}")))
        })
        .named("request_param")
        .param(ParamSpec::query("name", DeclaredType::Str))
        .view(ViewKind::Text),
        RouteDefinition::get("/controller/pathVariable/fixed", |_| {
            Ok(Reply::text("pathVariable:fixed"))
        })
        .named("path_variable_fixed")
        .view(ViewKind::Text),
        RouteDefinition::get("/controller/pathVariable/{name}/{code}", |args| {
            let name: String = args.get(0)?;
            let code: i64 = args.get(1)?;
            Ok(Reply::text(format!("pathVariable:{name}:{code}")))
        })
        .named("path_variable")
        .params([
            ParamSpec::path("name", DeclaredType::Str),
            ParamSpec::path("code", DeclaredType::Int),
        ])
        .view(ViewKind::Text),
        RouteDefinition::get("/controller/header", |args| {
            let client: String = args.get(0)?;
            Ok(Reply::text(format!("header:{client}")))
        })
        .named("request_header")
        .param(ParamSpec::header("X-Client", DeclaredType::Str).default_value("anonymous"))
        .view(ViewKind::Text),
        RouteDefinition::get("/controller/cookie", |args| {
            let theme: String = args.get(0)?;
            Ok(Reply::text(format!("cookie:{theme}")))
        })
        .named("cookie_value")
        .param(ParamSpec::cookie("theme", DeclaredType::Str).default_value("light"))
        .view(ViewKind::Text),
        RouteDefinition::get("/controller/list", |args| {
            let ids: Vec<i64> = args.get::<Option<Vec<i64>>>(0)?.unwrap_or_default();
            Ok(Reply::Value(json!({ "ids": ids, "count": ids.len() })))
        })
        .named("request_param_list")
        .param(ParamSpec::query("id", DeclaredType::list(DeclaredType::Int)).optional()),
        RouteDefinition::post("/controller/body", |args| {
            let body: Value = args.get(0)?;
            Ok(Reply::Value(json!({ "received": body })))
        })
        .named("request_body")
        .param(ParamSpec::body("payload", DeclaredType::Json)),
        RouteDefinition::post("/controller/upload", |args| {
            let Some(file) = args.file(0) else {
                return Ok(Reply::Value(json!({ "uploaded": false })));
            };
            Ok(Reply::Value(json!({
                "uploaded": true,
                "field": file.field_name(),
                "filename": file.filename(),
                "content_type": file.content_type(),
                "size": file.size(),
            })))
        })
        .named("upload")
        .param(ParamSpec::file("file")),
        RouteDefinition::get("/controller/session", |args| {
            let session = args
                .session(0)
                .ok_or_else(|| HandlerError::msg("sessions are disabled"))?;
            let visits = session.get::<u64>("visits").unwrap_or(0) + 1;
            session.set("visits", visits)?;
            Ok(Reply::Value(json!({ "session": session.id(), "visits": visits })))
        })
        .named("session_counter")
        .param(ParamSpec::session("session")),
        RouteDefinition::get("/controller/context", |args| {
            let ctx = args.context();
            ctx.response_mut().set_header("x-handled-by", "context");
            ctx.response_mut().add_cookie("last_path", "context");
            Ok(Reply::Value(json!({
                "method": ctx.method().as_str(),
                "path": ctx.path(),
                "request_id": ctx.request_id().to_string(),
            })))
        })
        .named("request_context")
        .param(ParamSpec::context("ctx")),
        RouteDefinition::get("/controller/redirect", |_| {
            Ok(Reply::redirect("/controller/requestParam?name=redirected"))
        })
        .named("redirect"),
        RouteDefinition::get("/controller/forward", |args| {
            let to: String = args.get(0)?;
            Ok(Reply::redirect(to))
        })
        .named("forward")
        .param(ParamSpec::query("to", DeclaredType::Str).default_value("/")),
        RouteDefinition::get("/controller/page", |args| {
            let name: String = args.get(0)?;
            Ok(ModelAndView::new("greeting").with("name", name).into())
        })
        .named("page")
        .param(ParamSpec::query("name", DeclaredType::Str).default_value("world"))
        .view(ViewKind::Html),
        RouteDefinition::get("/controller/fail", |args| {
            let wrapped: bool = args.get(0)?;
            let err = DemoError("requested".to_string());
            if wrapped {
                Err(WrappedDemoError(err).into())
            } else {
                Err(err.into())
            }
        })
        .named("fail")
        .param(ParamSpec::query("wrapped", DeclaredType::Bool).default_value("false")),
    ]
}

/// Register the demo routes, template and advice.
///
/// # Errors
///
/// Any registration failure, e.g. when the registrar already holds one of
/// these routes.
pub fn register_demo(registrar: &mut Registrar) -> Result<(), RegistrationError> {
    registrar.template("greeting.html", GREETING_TEMPLATE);
    registrar.register_routes(routes())?;
    registrar.register_advice::<DemoError>(
        AdviceDefinition::new(|args| {
            let message = args
                .failure(0)
                .map(ToString::to_string)
                .unwrap_or_default();
            Ok(Reply::Value(json!({ "error": "demo", "message": message })))
        })
        .named("demo_advice")
        .param(ParamSpec::failure("error"))
        .view(ViewKind::Json)
        .status(409),
    )
}
