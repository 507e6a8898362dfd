//! Error taxonomy for registration, dispatch and rendering.
//!
//! Startup failures ([`RegistrationError`]) abort boot. Per-request failures
//! ([`DispatchError`]) are contained in the pipeline of the request that raised
//! them and are turned into an error response, unless the unhandled-error
//! policy abandons the response.
//!
//! Handler failures travel as [`HandlerError`], a type-erased error that keeps the
//! concrete error's [`TypeId`]. Advice lookup is keyed on that exact type.

use crate::params::SourceKind;
use crate::router::PatternError;
use http::Method;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while routes, advice and resolvers are being registered.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Two routes share the same method and URL template.
    #[error("duplicate route: {method} {template} is already registered")]
    DuplicateRoute { method: Method, template: String },

    /// The URL template could not be parsed.
    #[error("invalid url template '{template}': {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: PatternError,
    },

    /// A handler parameter matched no parameter resolver.
    #[error(
        "handler '{handler}' parameter #{index} ('{name}': {declared}) is not supported by any parameter resolver"
    )]
    UnsupportedParameter {
        handler: String,
        index: usize,
        name: String,
        declared: String,
    },

    /// A parameter default does not convert to the parameter's declared type.
    #[error("handler '{handler}' parameter '{name}': default {source}")]
    InvalidDefault {
        handler: String,
        name: String,
        #[source]
        source: BindingError,
    },

    /// Advice for this exact error type was already registered.
    #[error("advice for error type {type_name} is already registered")]
    DuplicateAdvice { type_name: &'static str },
}

/// A request value could not be bound to a handler parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("parameter '{name}' ({kind}): cannot convert '{value}' to {expected}")]
    Coercion {
        name: String,
        kind: SourceKind,
        value: String,
        expected: String,
    },

    #[error("request body for parameter '{name}' is not valid: {detail}")]
    Body { name: String, detail: String },

    #[error("multipart body could not be decoded: {0}")]
    Multipart(String),
}

/// Errors produced while turning a handler result into a response.
#[derive(Debug, Error)]
pub enum RenderError {
    /// HTML view with no template from the result or the route.
    #[error("route {route} renders HTML but no template could be resolved")]
    MissingTemplate { route: String },

    #[error("template '{name}' could not be loaded: {source}")]
    TemplateLoad {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template '{name}' failed to render: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("response body could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A header name or value containing CR, LF or another control byte.
    #[error("response header '{name}' has an invalid name or value")]
    InvalidHeader { name: String },
}

/// Per-request failures of the dispatch pipeline.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Neither a route nor the static fallback matched.
    #[error("no route for {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error(transparent)]
    ParameterBinding(#[from] BindingError),

    #[error("required parameter '{name}' ({kind}) is missing")]
    MissingRequiredParameter { name: String, kind: SourceKind },

    /// The handler failed and no advice claimed the error type.
    #[error("handler '{handler}' failed: {error}")]
    HandlerInvocation {
        handler: String,
        error: Arc<HandlerError>,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl DispatchError {
    /// HTTP status used when this error is rendered.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::RouteNotFound { .. } => 404,
            DispatchError::ParameterBinding(_) | DispatchError::MissingRequiredParameter { .. } => {
                400
            }
            DispatchError::HandlerInvocation { .. } | DispatchError::Render(_) => 500,
        }
    }
}

/// A failure raised by a handler body.
///
/// Any `std::error::Error + Send + Sync + 'static` converts into a `HandlerError`
/// with `?`. The concrete type is remembered so advice can match it exactly;
/// wrapping an error in another type produces a different exact type.
pub struct HandlerError {
    type_id: TypeId,
    type_name: &'static str,
    inner: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl HandlerError {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            inner: Box::new(error),
        }
    }

    /// Build an error from a plain message. Its exact type is [`HandlerMessage`].
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(HandlerMessage(message.into()))
    }

    /// `TypeId` of the concrete error this value was built from.
    #[must_use]
    pub fn error_type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True if the concrete error type is exactly `E`.
    #[must_use]
    pub fn is<E: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<E>()
    }

    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    #[must_use]
    pub fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        HandlerError::new(error)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("type", &self.type_name)
            .field("error", &self.inner)
            .finish()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

/// Exact type of errors built with [`HandlerError::msg`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerMessage(pub String);

/// Exact type of errors captured from a panicking handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("handler panicked: {message}")]
pub struct HandlerPanic {
    pub message: String,
}

impl HandlerPanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}
