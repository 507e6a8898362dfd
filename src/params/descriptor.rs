//! Parameter metadata: what a handler declares, and what the resolver chain
//! turns it into.

use std::fmt;
use std::sync::Arc;

/// Where a bound argument comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    QueryParam,
    PathVariable,
    Header,
    Cookie,
    Body,
    Session,
    MultipartFile,
    MultipartFileList,
    RequestContext,
    Throwable,
}

impl SourceKind {
    pub const COUNT: usize = 10;

    /// Every kind, in extractor-table order.
    pub const ALL: [SourceKind; Self::COUNT] = [
        SourceKind::QueryParam,
        SourceKind::PathVariable,
        SourceKind::Header,
        SourceKind::Cookie,
        SourceKind::Body,
        SourceKind::Session,
        SourceKind::MultipartFile,
        SourceKind::MultipartFileList,
        SourceKind::RequestContext,
        SourceKind::Throwable,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::QueryParam => "QUERY_PARAM",
            SourceKind::PathVariable => "PATH_VARIABLE",
            SourceKind::Header => "HEADER",
            SourceKind::Cookie => "COOKIE",
            SourceKind::Body => "BODY",
            SourceKind::Session => "SESSION",
            SourceKind::MultipartFile => "MULTIPART_FILE",
            SourceKind::MultipartFileList => "MULTIPART_FILE_LIST",
            SourceKind::RequestContext => "REQUEST_CONTEXT",
            SourceKind::Throwable => "THROWABLE",
        };
        f.write_str(s)
    }
}

/// The declared type of a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    Str,
    Int,
    Float,
    Bool,
    List(Box<DeclaredType>),
    /// Any structured JSON value.
    Json,
    File,
    FileList,
    Session,
    Context,
    Failure,
}

impl DeclaredType {
    /// Convenience for `List(Box::new(inner))`.
    #[must_use]
    pub fn list(inner: DeclaredType) -> Self {
        DeclaredType::List(Box::new(inner))
    }

    /// Types a plain request parameter can be coerced into.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        match self {
            DeclaredType::Str
            | DeclaredType::Int
            | DeclaredType::Float
            | DeclaredType::Bool
            | DeclaredType::Json => true,
            DeclaredType::List(inner) => inner.is_simple(),
            _ => false,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Str => f.write_str("string"),
            DeclaredType::Int => f.write_str("integer"),
            DeclaredType::Float => f.write_str("number"),
            DeclaredType::Bool => f.write_str("boolean"),
            DeclaredType::List(inner) => write!(f, "list<{inner}>"),
            DeclaredType::Json => f.write_str("json"),
            DeclaredType::File => f.write_str("file"),
            DeclaredType::FileList => f.write_str("file list"),
            DeclaredType::Session => f.write_str("session"),
            DeclaredType::Context => f.write_str("request context"),
            DeclaredType::Failure => f.write_str("failure"),
        }
    }
}

/// Explicit source annotation on a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    RequestParam,
    PathVariable,
    RequestHeader,
    CookieValue,
    RequestBody,
}

/// What the handler declares about one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: DeclaredType,
    pub annotation: Option<Annotation>,
    /// Overrides `name` as the lookup key in the request.
    pub binding_name: Option<String>,
    pub required: bool,
    pub default_value: Option<String>,
}

impl ParamSpec {
    /// An un-annotated parameter. Resolution falls to the declared type.
    pub fn plain(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self {
            name: name.into(),
            ty,
            annotation: None,
            binding_name: None,
            required: false,
            default_value: None,
        }
    }

    fn annotated(name: impl Into<String>, ty: DeclaredType, annotation: Annotation) -> Self {
        Self {
            annotation: Some(annotation),
            required: true,
            ..Self::plain(name, ty)
        }
    }

    /// `@RequestParam`: query string or form field. Required by default.
    pub fn query(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self::annotated(name, ty, Annotation::RequestParam)
    }

    pub fn path(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self::annotated(name, ty, Annotation::PathVariable)
    }

    pub fn header(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self::annotated(name, ty, Annotation::RequestHeader)
    }

    pub fn cookie(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self::annotated(name, ty, Annotation::CookieValue)
    }

    pub fn body(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self::annotated(name, ty, Annotation::RequestBody)
    }

    /// A single uploaded file from a multipart form field.
    pub fn file(name: impl Into<String>) -> Self {
        Self::plain(name, DeclaredType::File)
    }

    /// Every uploaded file of a multipart form field.
    pub fn files(name: impl Into<String>) -> Self {
        Self::plain(name, DeclaredType::FileList)
    }

    pub fn session(name: impl Into<String>) -> Self {
        Self::plain(name, DeclaredType::Session)
    }

    pub fn context(name: impl Into<String>) -> Self {
        Self::plain(name, DeclaredType::Context)
    }

    /// The captured handler failure; used by advice handlers.
    pub fn failure(name: impl Into<String>) -> Self {
        Self::plain(name, DeclaredType::Failure)
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the request carries none. Implies not required.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self.required = false;
        self
    }

    /// Look the value up under a different name than the parameter's own.
    #[must_use]
    pub fn bind_as(mut self, name: impl Into<String>) -> Self {
        self.binding_name = Some(name.into());
        self
    }

    /// The request-side key: the binding name if set, else the parameter name.
    #[must_use]
    pub fn lookup_name(&self) -> &str {
        self.binding_name.as_deref().unwrap_or(&self.name)
    }
}

/// Immutable, registration-time description of how to bind one argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    /// Request-side lookup key.
    pub name: Arc<str>,
    pub ty: DeclaredType,
    pub kind: SourceKind,
    pub required: bool,
    pub default_value: Option<Arc<str>>,
}

impl ParameterDescriptor {
    /// Descriptor for `spec` with the given source kind, keeping its
    /// lookup name, required flag and default.
    #[must_use]
    pub fn from_spec(spec: &ParamSpec, kind: SourceKind) -> Self {
        Self {
            name: Arc::from(spec.lookup_name()),
            ty: spec.ty.clone(),
            kind,
            required: spec.required && spec.default_value.is_none(),
            default_value: spec.default_value.as_deref().map(Arc::from),
        }
    }

    /// Descriptor for injected objects that are never "missing".
    #[must_use]
    pub fn injected(spec: &ParamSpec, kind: SourceKind) -> Self {
        Self {
            required: false,
            default_value: None,
            ..Self::from_spec(spec, kind)
        }
    }
}
