//! Registration-time resolver strategies.
//!
//! A resolver decides whether it can bind a declared parameter and, if so,
//! produces the [`ParameterDescriptor`] the request-time extractors work from.
//! The chain is consulted in order: custom resolvers first, then the defaults.

use super::descriptor::{Annotation, DeclaredType, ParamSpec, ParameterDescriptor, SourceKind};
use super::extract::coerce;
use crate::error::RegistrationError;
use std::sync::Arc;
use tracing::debug;

/// Strategy that turns a declared parameter into a descriptor.
pub trait ParameterResolver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn supports(&self, spec: &ParamSpec) -> bool;

    /// Build the descriptor. Only called when [`supports`](Self::supports)
    /// returned true.
    fn describe(&self, spec: &ParamSpec) -> ParameterDescriptor;
}

macro_rules! annotation_resolver {
    ($ty:ident, $label:literal, $annotation:path, $kind:path) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        impl ParameterResolver for $ty {
            fn name(&self) -> &'static str {
                $label
            }

            fn supports(&self, spec: &ParamSpec) -> bool {
                spec.annotation == Some($annotation) && spec.ty.is_simple()
            }

            fn describe(&self, spec: &ParamSpec) -> ParameterDescriptor {
                ParameterDescriptor::from_spec(spec, $kind)
            }
        }
    };
}

macro_rules! type_resolver {
    ($ty:ident, $label:literal, $declared:path, $kind:path, $describe:path) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        impl ParameterResolver for $ty {
            fn name(&self) -> &'static str {
                $label
            }

            fn supports(&self, spec: &ParamSpec) -> bool {
                spec.ty == $declared
            }

            fn describe(&self, spec: &ParamSpec) -> ParameterDescriptor {
                $describe(spec, $kind)
            }
        }
    };
}

annotation_resolver!(
    PathVariableResolver,
    "path_variable",
    Annotation::PathVariable,
    SourceKind::PathVariable
);
annotation_resolver!(
    RequestHeaderResolver,
    "request_header",
    Annotation::RequestHeader,
    SourceKind::Header
);
annotation_resolver!(
    CookieValueResolver,
    "cookie_value",
    Annotation::CookieValue,
    SourceKind::Cookie
);
annotation_resolver!(
    RequestBodyResolver,
    "request_body",
    Annotation::RequestBody,
    SourceKind::Body
);
type_resolver!(
    MultipartFileResolver,
    "multipart_file",
    DeclaredType::File,
    SourceKind::MultipartFile,
    ParameterDescriptor::from_spec
);
type_resolver!(
    MultipartFileListResolver,
    "multipart_file_list",
    DeclaredType::FileList,
    SourceKind::MultipartFileList,
    ParameterDescriptor::from_spec
);
type_resolver!(
    SessionResolver,
    "session",
    DeclaredType::Session,
    SourceKind::Session,
    ParameterDescriptor::injected
);
type_resolver!(
    RequestContextResolver,
    "request_context",
    DeclaredType::Context,
    SourceKind::RequestContext,
    ParameterDescriptor::injected
);
type_resolver!(
    ThrowableResolver,
    "throwable",
    DeclaredType::Failure,
    SourceKind::Throwable,
    ParameterDescriptor::injected
);

/// `@RequestParam`, or any un-annotated scalar/list parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParamResolver;

impl ParameterResolver for RequestParamResolver {
    fn name(&self) -> &'static str {
        "request_param"
    }

    fn supports(&self, spec: &ParamSpec) -> bool {
        match spec.annotation {
            Some(Annotation::RequestParam) => spec.ty.is_simple(),
            Some(_) => false,
            None => spec.ty.is_simple(),
        }
    }

    fn describe(&self, spec: &ParamSpec) -> ParameterDescriptor {
        ParameterDescriptor::from_spec(spec, SourceKind::QueryParam)
    }
}

/// Ordered resolver list used at registration.
#[derive(Clone)]
pub struct ResolverChain {
    custom: Vec<Arc<dyn ParameterResolver>>,
    defaults: Vec<Arc<dyn ParameterResolver>>,
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverChain {
    #[must_use]
    pub fn new() -> Self {
        let defaults: Vec<Arc<dyn ParameterResolver>> = vec![
            Arc::new(PathVariableResolver),
            Arc::new(RequestHeaderResolver),
            Arc::new(CookieValueResolver),
            Arc::new(RequestBodyResolver),
            Arc::new(MultipartFileResolver),
            Arc::new(MultipartFileListResolver),
            Arc::new(SessionResolver),
            Arc::new(RequestContextResolver),
            Arc::new(ThrowableResolver),
            Arc::new(RequestParamResolver),
        ];
        Self {
            custom: Vec::new(),
            defaults,
        }
    }

    /// Custom resolvers are consulted before every default, in the order they
    /// were added.
    pub fn push(&mut self, resolver: Arc<dyn ParameterResolver>) {
        self.custom.push(resolver);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ParameterResolver>> {
        self.custom.iter().chain(self.defaults.iter())
    }

    /// Describe one parameter with the first supporting resolver.
    #[must_use]
    pub fn describe(&self, spec: &ParamSpec) -> Option<ParameterDescriptor> {
        self.iter().find(|r| r.supports(spec)).map(|r| {
            let descriptor = r.describe(spec);
            debug!(
                resolver = r.name(),
                param = %spec.name,
                kind = %descriptor.kind,
                required = descriptor.required,
                "Parameter described"
            );
            descriptor
        })
    }

    /// Describe every parameter of a handler, preserving declaration order.
    ///
    /// A default that does not convert to its declared type fails here.
    pub fn describe_all(
        &self,
        handler: &str,
        specs: &[ParamSpec],
    ) -> Result<Vec<ParameterDescriptor>, RegistrationError> {
        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let descriptor = self.describe(spec).ok_or_else(|| {
                    RegistrationError::UnsupportedParameter {
                        handler: handler.to_string(),
                        index,
                        name: spec.name.clone(),
                        declared: spec.ty.to_string(),
                    }
                })?;
                if let Some(default) = descriptor.default_value.as_deref() {
                    coerce(&descriptor, &[default]).map_err(|source| {
                        RegistrationError::InvalidDefault {
                            handler: handler.to_string(),
                            name: spec.name.clone(),
                            source,
                        }
                    })?;
                }
                Ok(descriptor)
            })
            .collect()
    }
}
