//! Bound argument values and the positional view handlers receive.

use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::multipart::UploadedFile;
use crate::session::SessionHandle;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// One bound argument.
#[derive(Debug, Clone)]
pub enum Arg {
    /// No value in the request and no default.
    Absent,
    /// A coerced scalar, list or JSON body.
    Value(Value),
    File(UploadedFile),
    Files(Vec<UploadedFile>),
    Session(SessionHandle),
    /// Placeholder for the request context, reached through [`Args::context`].
    Context,
    Failure(Arc<HandlerError>),
}

impl Arg {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Arg::Absent)
    }

    fn kind(&self) -> &'static str {
        match self {
            Arg::Absent => "absent",
            Arg::Value(_) => "value",
            Arg::File(_) => "file",
            Arg::Files(_) => "file list",
            Arg::Session(_) => "session",
            Arg::Context => "request context",
            Arg::Failure(_) => "failure",
        }
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::Absent, Arg::Absent) | (Arg::Context, Arg::Context) => true,
            (Arg::Value(a), Arg::Value(b)) => a == b,
            (Arg::File(a), Arg::File(b)) => a == b,
            (Arg::Files(a), Arg::Files(b)) => a == b,
            (Arg::Session(a), Arg::Session(b)) => Arc::ptr_eq(a, b),
            (Arg::Failure(a), Arg::Failure(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Errors reading an argument inside a handler. Converts into
/// [`HandlerError`] with `?`.
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("argument #{index} does not exist ({len} bound)")]
    OutOfRange { index: usize, len: usize },
    #[error("argument #{index} is a {actual}, not a {expected}")]
    WrongKind {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("argument #{index} cannot be converted: {source}")]
    Convert {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Positional arguments of one invocation, plus mutable access to the
/// request context.
pub struct Args<'a> {
    values: Vec<Arg>,
    ctx: &'a mut RequestContext,
}

impl<'a> Args<'a> {
    pub fn new(values: Vec<Arg>, ctx: &'a mut RequestContext) -> Self {
        Self { values, ctx }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn raw(&self, index: usize) -> Result<&Arg, ArgError> {
        self.values.get(index).ok_or(ArgError::OutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Deserialize a value argument. An absent argument deserializes from
    /// `null`, so `Option<T>` yields `None`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgError> {
        let value = match self.raw(index)? {
            Arg::Value(v) => v.clone(),
            Arg::Absent => Value::Null,
            other => {
                return Err(ArgError::WrongKind {
                    index,
                    expected: "value",
                    actual: other.kind(),
                })
            }
        };
        serde_json::from_value(value).map_err(|source| ArgError::Convert { index, source })
    }

    /// Borrow a string argument without converting.
    #[must_use]
    pub fn str(&self, index: usize) -> Option<&str> {
        match self.values.get(index)? {
            Arg::Value(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The raw JSON value of an argument, if it has one.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.values.get(index)? {
            Arg::Value(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn file(&self, index: usize) -> Option<&UploadedFile> {
        match self.values.get(index)? {
            Arg::File(f) => Some(f),
            _ => None,
        }
    }

    /// Files of a file-list argument; empty when none were uploaded.
    #[must_use]
    pub fn files(&self, index: usize) -> &[UploadedFile] {
        match self.values.get(index) {
            Some(Arg::Files(files)) => files,
            _ => &[],
        }
    }

    #[must_use]
    pub fn session(&self, index: usize) -> Option<&SessionHandle> {
        match self.values.get(index)? {
            Arg::Session(s) => Some(s),
            _ => None,
        }
    }

    /// The captured handler failure (advice handlers only).
    #[must_use]
    pub fn failure(&self, index: usize) -> Option<&Arc<HandlerError>> {
        match self.values.get(index)? {
            Arg::Failure(f) => Some(f),
            _ => None,
        }
    }

    /// The request context, for anything the declared parameters do not
    /// cover: setting status, headers or cookies, reading raw request data.
    pub fn context(&mut self) -> &mut RequestContext {
        &mut *self.ctx
    }

    #[must_use]
    pub fn values(&self) -> &[Arg] {
        &self.values
    }

    /// Give the bound values back, releasing the context borrow.
    #[must_use]
    pub fn into_values(self) -> Vec<Arg> {
        self.values
    }
}

impl std::fmt::Debug for Args<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("values", &self.values)
            .field("request_id", &self.ctx.request_id())
            .finish()
    }
}
