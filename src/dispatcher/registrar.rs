use super::advice::{AdviceDefinition, AdviceEntry, AdviceRegistry};
use super::core::{Dispatcher, UnhandledErrorPolicy};
use crate::error::RegistrationError;
use crate::multipart::MultipartConfig;
use crate::params::{
    Extractor, ExtractorTable, ParameterPipeline, ParameterResolver, ResolverChain, SourceKind,
};
use crate::render::{ResponseRenderer, TemplateEngine};
use crate::route::{Route, RouteDefinition};
use crate::router::{PathPattern, RouteRegistry};
use crate::session::{InMemorySessionStore, SessionStore};
use crate::static_files::{StaticFallback, StaticFiles};
use std::any::TypeId;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Startup-time registration surface.
///
/// Routes are described against the resolvers registered so far, so custom
/// resolvers go in before the routes that need them. [`Registrar::freeze`]
/// hands everything to an immutable [`Dispatcher`].
pub struct Registrar {
    registry: RouteRegistry,
    resolvers: ResolverChain,
    extractors: ExtractorTable,
    advice: AdviceRegistry,
    templates: TemplateEngine,
    static_fallback: Option<Arc<dyn StaticFallback>>,
    sessions: Option<Arc<dyn SessionStore>>,
    error_policy: UnhandledErrorPolicy,
    multipart: MultipartConfig,
}

impl Default for Registrar {
    fn default() -> Self {
        Self::new()
    }
}

impl Registrar {
    /// Default resolvers and extractors, an in-memory session store, no
    /// static fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RouteRegistry::new(),
            resolvers: ResolverChain::new(),
            extractors: ExtractorTable::new(),
            advice: AdviceRegistry::default(),
            templates: TemplateEngine::new(),
            static_fallback: None,
            sessions: Some(Arc::new(InMemorySessionStore::default())),
            error_policy: UnhandledErrorPolicy::default(),
            multipart: MultipartConfig::default(),
        }
    }

    /// Describe a route's parameters and store it.
    pub fn register_route(&mut self, def: RouteDefinition) -> Result<Arc<Route>, RegistrationError> {
        let pattern =
            PathPattern::parse(&def.template).map_err(|source| RegistrationError::InvalidTemplate {
                template: def.template.clone(),
                source,
            })?;
        let handler_name = def.resolved_name();
        let descriptors = self.resolvers.describe_all(&handler_name, &def.params)?;

        let route = Route {
            method: def.method,
            pattern,
            handler_name: Arc::from(handler_name),
            descriptors: Arc::from(descriptors),
            view: def.view,
            template: def.view_template.map(Arc::from),
            handler: def.handler,
        };
        self.registry.register(route)
    }

    /// Register several routes, stopping at the first failure.
    pub fn register_routes(
        &mut self,
        defs: impl IntoIterator<Item = RouteDefinition>,
    ) -> Result<(), RegistrationError> {
        for def in defs {
            self.register_route(def)?;
        }
        Ok(())
    }

    /// Register the error handler for exactly `E`.
    ///
    /// Errors of other types, including types that wrap an `E`, do not reach
    /// it.
    pub fn register_advice<E>(&mut self, def: AdviceDefinition) -> Result<(), RegistrationError>
    where
        E: std::error::Error + 'static,
    {
        let type_name = std::any::type_name::<E>();
        let handler_name = def
            .name
            .clone()
            .unwrap_or_else(|| format!("advice<{type_name}>"));
        let descriptors = self.resolvers.describe_all(&handler_name, &def.params)?;

        self.advice.insert(AdviceEntry {
            type_id: TypeId::of::<E>(),
            type_name,
            handler_name: Arc::from(handler_name.as_str()),
            handler: def.handler,
            descriptors: Arc::from(descriptors),
            view: def.view,
            template: def.template.map(Arc::from),
            status: def.status,
        })?;
        info!(error_type = type_name, handler_name = %handler_name, "Advice registered");
        Ok(())
    }

    /// Add a resolver ahead of the defaults.
    pub fn register_parameter_resolver(&mut self, resolver: Arc<dyn ParameterResolver>) {
        debug!(resolver = resolver.name(), "Parameter resolver registered");
        self.resolvers.push(resolver);
    }

    /// Replace the extractor for one source kind.
    pub fn register_extractor(&mut self, kind: SourceKind, extractor: Extractor) {
        debug!(kind = %kind, "Extractor replaced");
        self.extractors.set(kind, extractor);
    }

    /// Serve files from `dir` when no route matches a GET or HEAD.
    pub fn static_files<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.static_fallback = Some(Arc::new(StaticFiles::new(dir)));
        self
    }

    pub fn static_fallback(&mut self, fallback: Arc<dyn StaticFallback>) -> &mut Self {
        self.static_fallback = Some(fallback);
        self
    }

    pub fn template_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.templates.set_dir(dir);
        self
    }

    /// Register a template by name.
    pub fn template(&mut self, name: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.templates.add_template(name, source);
        self
    }

    /// Replace the session store; `None` disables sessions.
    pub fn sessions(&mut self, store: Option<Arc<dyn SessionStore>>) -> &mut Self {
        self.sessions = store;
        self
    }

    pub fn error_policy(&mut self, policy: UnhandledErrorPolicy) -> &mut Self {
        self.error_policy = policy;
        self
    }

    pub fn multipart(&mut self, config: MultipartConfig) -> &mut Self {
        self.multipart = config;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Finish registration.
    #[must_use]
    pub fn freeze(self) -> Dispatcher {
        info!(
            routes = self.registry.len(),
            advice = self.advice.len(),
            static_fallback = self.static_fallback.is_some(),
            sessions = self.sessions.is_some(),
            error_policy = %self.error_policy,
            "Dispatcher ready"
        );
        Dispatcher {
            registry: self.registry,
            pipeline: ParameterPipeline::new(self.extractors),
            advice: self.advice,
            renderer: ResponseRenderer::new(self.templates),
            static_fallback: self.static_fallback,
            sessions: self.sessions,
            error_policy: self.error_policy,
            multipart: self.multipart,
        }
    }
}
