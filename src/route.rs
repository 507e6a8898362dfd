//! Registered routes and the builder used to declare them.

use crate::handler::{handler_fn, HandlerFn, HandlerResult};
use crate::params::{Args, ParamSpec, ParameterDescriptor};
use crate::router::PathPattern;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// How a route's result is rendered when the reply itself does not decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    Json,
    Html,
    Text,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewKind::Json => "json",
            ViewKind::Html => "html",
            ViewKind::Text => "text",
        })
    }
}

/// A route as stored in the registry. Immutable once registered; per-request
/// state lives in the dispatcher's invocation frame.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler_name: Arc<str>,
    /// One descriptor per handler parameter, in declaration order.
    pub descriptors: Arc<[ParameterDescriptor]>,
    pub view: ViewKind,
    /// Template used by HTML rendering when the reply does not name one.
    pub template: Option<Arc<str>>,
    pub handler: HandlerFn,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.template())
            .field("handler_name", &self.handler_name)
            .field("descriptors", &self.descriptors)
            .field("view", &self.view)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Registration input for one route: method, template, handler and its
/// declared parameters.
///
/// ```rust,ignore
/// let def = RouteDefinition::get("/controller/pathVariable/{name}/{code}", |args| {
///     let name: String = args.get(0)?;
///     let code: i64 = args.get(1)?;
///     Ok(Reply::text(format!("{name}:{code}")))
/// })
/// .named("path_variable")
/// .params([ParamSpec::path("name", DeclaredType::Str), ParamSpec::path("code", DeclaredType::Int)])
/// .view(ViewKind::Text);
/// ```
#[derive(Clone)]
pub struct RouteDefinition {
    pub(crate) method: Method,
    pub(crate) template: String,
    pub(crate) handler_name: Option<String>,
    pub(crate) handler: HandlerFn,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) view: ViewKind,
    pub(crate) view_template: Option<String>,
}

impl RouteDefinition {
    pub fn new<F>(method: Method, template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Args<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::from_handler(method, template, handler_fn(handler))
    }

    pub fn from_handler(method: Method, template: impl Into<String>, handler: HandlerFn) -> Self {
        Self {
            method,
            template: template.into(),
            handler_name: None,
            handler,
            params: Vec::new(),
            view: ViewKind::default(),
            view_template: None,
        }
    }

    pub fn get<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Args<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Method::GET, template, handler)
    }

    pub fn post<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Args<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Method::POST, template, handler)
    }

    pub fn put<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Args<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Method::PUT, template, handler)
    }

    pub fn delete<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Args<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Method::DELETE, template, handler)
    }

    pub fn patch<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Args<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Method::PATCH, template, handler)
    }

    /// Name used in logs. Defaults to `"{METHOD} {template}"`.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.handler_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    #[must_use]
    pub fn params(mut self, specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.params.extend(specs);
        self
    }

    #[must_use]
    pub fn view(mut self, view: ViewKind) -> Self {
        self.view = view;
        self
    }

    /// Configure the template for HTML rendering. Also sets the view kind to HTML.
    #[must_use]
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.view_template = Some(name.into());
        self.view = ViewKind::Html;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.template
    }

    pub(crate) fn resolved_name(&self) -> String {
        self.handler_name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method, self.template))
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("handler_name", &self.handler_name)
            .field("params", &self.params)
            .field("view", &self.view)
            .field("view_template", &self.view_template)
            .finish_non_exhaustive()
    }
}
