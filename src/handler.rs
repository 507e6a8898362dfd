//! Handler callables and their return values.

use crate::context::OutboundResponse;
use crate::error::HandlerError;
use crate::params::Args;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// What a handler returns.
pub type HandlerResult = Result<Reply, HandlerError>;

/// A registered handler body. Arguments arrive positionally, in the order the
/// parameters were declared at registration.
pub type HandlerFn = Arc<dyn Fn(&mut Args<'_>) -> HandlerResult + Send + Sync>;

/// Box a closure as a [`HandlerFn`].
pub fn handler_fn<F>(f: F) -> HandlerFn
where
    F: Fn(&mut Args<'_>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Result of a handler invocation, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// No value. Renders as an empty body (`null` for JSON routes).
    Empty,
    /// A string. Inspected at render time for `redirect:` and template suffixes.
    Text(String),
    /// A structured value.
    Value(Value),
    /// A template name plus its model.
    View(ModelAndView),
    /// A complete response passed through untouched.
    Response(OutboundResponse),
}

impl Reply {
    /// Serialize any value into a [`Reply::Value`].
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        Ok(Reply::Value(serde_json::to_value(value)?))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }

    /// A `redirect:` string reply.
    pub fn redirect(location: impl AsRef<str>) -> Self {
        Reply::Text(format!(
            "{}{}",
            crate::render::REDIRECT_PREFIX,
            location.as_ref()
        ))
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Text(s)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Reply::Value(v)
    }
}

impl From<ModelAndView> for Reply {
    fn from(mv: ModelAndView) -> Self {
        Reply::View(mv)
    }
}

impl From<OutboundResponse> for Reply {
    fn from(r: OutboundResponse) -> Self {
        Reply::Response(r)
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Reply::Empty
    }
}

/// Template name plus the values exposed to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelAndView {
    /// Template name. `None` falls back to the route's configured template.
    pub view: Option<String>,
    pub model: Map<String, Value>,
}

impl ModelAndView {
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: Some(view.into()),
            model: Map::new(),
        }
    }

    /// A model rendered with the route's own template.
    #[must_use]
    pub fn model_only() -> Self {
        Self::default()
    }

    /// Add a model entry. Values that fail to serialize are stored as `null`.
    #[must_use]
    pub fn with<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.model.insert(key.into(), value);
    }
}
