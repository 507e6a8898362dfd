//! Request-time extractors, one per source kind.
//!
//! The table is indexed directly by [`SourceKind`]; no resolver predicate is
//! evaluated per request. Text sources (query, path, header, cookie) share
//! one coercion routine driven by the declared type.

use super::args::Arg;
use super::descriptor::{DeclaredType, ParameterDescriptor, SourceKind};
use crate::context::RequestContext;
use crate::error::BindingError;
use serde_json::{Number, Value};
use std::sync::Arc;

/// Binds one descriptor against a request.
pub type Extractor =
    Arc<dyn Fn(&ParameterDescriptor, &mut RequestContext) -> Result<Arg, BindingError> + Send + Sync>;

/// Per-kind extractor table.
#[derive(Clone)]
pub struct ExtractorTable {
    entries: [Extractor; SourceKind::COUNT],
}

impl Default for ExtractorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: SourceKind::ALL.map(default_extractor),
        }
    }

    /// Replace the extractor for one source kind.
    pub fn set(&mut self, kind: SourceKind, extractor: Extractor) {
        self.entries[kind.index()] = extractor;
    }

    #[inline]
    #[must_use]
    pub fn get(&self, kind: SourceKind) -> &Extractor {
        &self.entries[kind.index()]
    }
}

/// Box a closure as an [`Extractor`].
pub fn extractor<F>(f: F) -> Extractor
where
    F: Fn(&ParameterDescriptor, &mut RequestContext) -> Result<Arg, BindingError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// The built-in extractor for a source kind.
#[must_use]
pub fn default_extractor(kind: SourceKind) -> Extractor {
    match kind {
        SourceKind::QueryParam => extractor(|d, ctx| {
            let values: Vec<&str> = ctx.param_values(&d.name).collect();
            coerce(d, &values)
        }),
        SourceKind::PathVariable => extractor(|d, ctx| {
            let value = ctx.path_variable(&d.name);
            coerce(d, value.as_deref().as_slice())
        }),
        SourceKind::Header => extractor(|d, ctx| {
            let values: Vec<&str> = ctx.header_values(&d.name).collect();
            coerce(d, &values)
        }),
        SourceKind::Cookie => extractor(|d, ctx| coerce(d, ctx.cookie(&d.name).as_slice())),
        SourceKind::Body => extractor(extract_body),
        SourceKind::MultipartFile => extractor(|d, ctx| {
            check_multipart(ctx)?;
            Ok(ctx
                .files(&d.name)
                .next()
                .cloned()
                .map_or(Arg::Absent, Arg::File))
        }),
        SourceKind::MultipartFileList => extractor(|d, ctx| {
            check_multipart(ctx)?;
            let files: Vec<_> = ctx.files(&d.name).cloned().collect();
            Ok(if files.is_empty() {
                Arg::Absent
            } else {
                Arg::Files(files)
            })
        }),
        SourceKind::Session => {
            extractor(|_, ctx| Ok(ctx.session_or_create().map_or(Arg::Absent, Arg::Session)))
        }
        SourceKind::RequestContext => extractor(|_, _| Ok(Arg::Context)),
        SourceKind::Throwable => extractor(|_, ctx| {
            Ok(ctx
                .failure()
                .map_or(Arg::Absent, |f| Arg::Failure(Arc::clone(f))))
        }),
    }
}

fn check_multipart(ctx: &RequestContext) -> Result<(), BindingError> {
    match ctx.multipart_error() {
        Some(err) => Err(BindingError::Multipart(err.to_string())),
        None => Ok(()),
    }
}

fn extract_body(d: &ParameterDescriptor, ctx: &mut RequestContext) -> Result<Arg, BindingError> {
    let body = ctx.body();
    if body.is_empty() {
        return Ok(Arg::Absent);
    }
    let body_error = |detail: String| BindingError::Body {
        name: d.name.to_string(),
        detail,
    };

    if d.ty == DeclaredType::Str {
        let text = std::str::from_utf8(body).map_err(|e| body_error(e.to_string()))?;
        return Ok(Arg::Value(Value::String(text.to_string())));
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| body_error(e.to_string()))?;
    conform(&value, &d.ty)
        .map(Arg::Value)
        .ok_or_else(|| body_error(format!("expected {}", d.ty)))
}

/// Check a parsed JSON value against the declared type. JSON strings are
/// accepted for scalar types and coerced the way text sources are.
fn conform(value: &Value, ty: &DeclaredType) -> Option<Value> {
    match (ty, value) {
        (DeclaredType::Json, v) => Some(v.clone()),
        (DeclaredType::Str, Value::String(_)) => Some(value.clone()),
        (DeclaredType::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
        (DeclaredType::Float, Value::Number(_)) => Some(value.clone()),
        (DeclaredType::Bool, Value::Bool(_)) => Some(value.clone()),
        (DeclaredType::Int | DeclaredType::Float | DeclaredType::Bool, Value::String(s)) => {
            coerce_scalar(s, ty)
        }
        (DeclaredType::List(inner), Value::Array(items)) => items
            .iter()
            .map(|item| conform(item, inner))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        _ => None,
    }
}

/// Coerce raw text values to a descriptor's declared type.
///
/// Scalars take the last value. An empty value is absent for every type but
/// `Str`. Lists accept repeated values, comma-separated values, or both.
pub fn coerce(d: &ParameterDescriptor, values: &[&str]) -> Result<Arg, BindingError> {
    let fail = |value: &str| BindingError::Coercion {
        name: d.name.to_string(),
        kind: d.kind,
        value: value.to_string(),
        expected: d.ty.to_string(),
    };

    match &d.ty {
        DeclaredType::List(inner) => {
            let items = values
                .iter()
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| coerce_scalar(item, inner).ok_or_else(|| fail(item)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if items.is_empty() {
                Arg::Absent
            } else {
                Arg::Value(Value::Array(items))
            })
        }
        ty => match values.last().copied() {
            None => Ok(Arg::Absent),
            Some(v) if v.is_empty() && *ty != DeclaredType::Str => Ok(Arg::Absent),
            Some(v) => coerce_scalar(v, ty).map(Arg::Value).ok_or_else(|| fail(v)),
        },
    }
}

/// Convert one text value. `None` means the text does not fit the type.
#[must_use]
pub fn coerce_scalar(raw: &str, ty: &DeclaredType) -> Option<Value> {
    match ty {
        DeclaredType::Str => Some(Value::String(raw.to_string())),
        DeclaredType::Int => raw.trim().parse::<i64>().ok().map(Value::from),
        DeclaredType::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        DeclaredType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        DeclaredType::Json => serde_json::from_str(raw).ok(),
        _ => None,
    }
}
