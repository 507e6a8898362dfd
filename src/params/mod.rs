//! # Parameter Resolution
//!
//! Binding runs in two passes:
//!
//! 1. **Registration**: the [`ResolverChain`] turns each declared
//!    [`ParamSpec`] into an immutable [`ParameterDescriptor`] carrying a
//!    [`SourceKind`]. A parameter no resolver supports fails registration.
//!
//! 2. **Request**: the [`ParameterPipeline`] hands each descriptor to the
//!    extractor registered for its source kind and collects positional
//!    [`Arg`]s for the handler.
//!
//! Default resolver order: path variable, request header, cookie value, request
//! body, multipart file, multipart file list, session, request context,
//! throwable, then request param as the fallback for un-annotated scalars.

mod args;
mod descriptor;
mod extract;
mod pipeline;
mod resolver;
#[cfg(test)]
mod tests;

pub use args::{Arg, ArgError, Args};
pub use descriptor::{Annotation, DeclaredType, ParamSpec, ParameterDescriptor, SourceKind};
pub use extract::{coerce, coerce_scalar, default_extractor, extractor, Extractor, ExtractorTable};
pub use pipeline::ParameterPipeline;
pub use resolver::{
    CookieValueResolver, MultipartFileListResolver, MultipartFileResolver, ParameterResolver,
    PathVariableResolver, RequestBodyResolver, RequestContextResolver, RequestHeaderResolver,
    RequestParamResolver, ResolverChain, SessionResolver, ThrowableResolver,
};
