use crate::error::{HandlerError, RegistrationError};
use crate::handler::{handler_fn, HandlerFn, HandlerResult};
use crate::params::{Args, ParamSpec, ParameterDescriptor};
use crate::route::ViewKind;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registration input for an error handler.
///
/// The handler is bound like a route handler; declare a
/// [`ParamSpec::failure`] parameter to receive the captured error.
#[derive(Clone)]
pub struct AdviceDefinition {
    pub(crate) name: Option<String>,
    pub(crate) handler: HandlerFn,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) view: Option<ViewKind>,
    pub(crate) template: Option<String>,
    pub(crate) status: Option<u16>,
}

impl AdviceDefinition {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut Args<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: None,
            handler: handler_fn(handler),
            params: Vec::new(),
            view: None,
            template: None,
            status: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
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

    /// Render with this view kind instead of the failed route's.
    #[must_use]
    pub fn view(mut self, view: ViewKind) -> Self {
        self.view = Some(view);
        self
    }

    #[must_use]
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self.view = Some(ViewKind::Html);
        self
    }

    /// Response status; the rendered response otherwise keeps its own.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Debug for AdviceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdviceDefinition")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("view", &self.view)
            .field("template", &self.template)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Error handler for one exact error type.
pub struct AdviceEntry {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub handler_name: Arc<str>,
    pub handler: HandlerFn,
    pub descriptors: Arc<[ParameterDescriptor]>,
    pub view: Option<ViewKind>,
    pub template: Option<Arc<str>>,
    pub status: Option<u16>,
}

impl fmt::Debug for AdviceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdviceEntry")
            .field("type_name", &self.type_name)
            .field("handler_name", &self.handler_name)
            .field("descriptors", &self.descriptors)
            .field("view", &self.view)
            .field("template", &self.template)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Advice keyed by exact error type.
///
/// Lookup never walks wrappers or sources: an error wrapped in another type
/// only matches advice registered for the wrapper.
#[derive(Clone, Default)]
pub struct AdviceRegistry {
    entries: HashMap<TypeId, Arc<AdviceEntry>>,
}

impl AdviceRegistry {
    pub fn insert(&mut self, entry: AdviceEntry) -> Result<(), RegistrationError> {
        if self.entries.contains_key(&entry.type_id) {
            return Err(RegistrationError::DuplicateAdvice {
                type_name: entry.type_name,
            });
        }
        self.entries.insert(entry.type_id, Arc::new(entry));
        Ok(())
    }

    #[must_use]
    pub fn find(&self, error: &HandlerError) -> Option<&Arc<AdviceEntry>> {
        self.entries.get(&error.error_type_id())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
