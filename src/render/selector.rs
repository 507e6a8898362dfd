use super::template::TemplateEngine;
use crate::context::{OutboundResponse, ResponseParts};
use crate::error::RenderError;
use crate::handler::Reply;
use crate::route::{Route, ViewKind};
use serde_json::{Map, Value};
use tracing::debug;

/// String results starting with this render as a 302 redirect.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// String results ending with one of these name a template.
pub const TEMPLATE_SUFFIXES: [&str; 3] = [".html", ".htm", ".j2"];

/// The renderer picked for one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStrategy {
    Json,
    /// `None` falls back to the route's configured template.
    Html { template: Option<String> },
    Text,
    Redirect { location: String },
    /// A complete response from the handler.
    Passthrough,
}

fn has_template_suffix(s: &str) -> bool {
    TEMPLATE_SUFFIXES.iter().any(|suffix| s.ends_with(suffix))
}

/// Turns handler replies into wire responses.
#[derive(Debug, Clone, Default)]
pub struct ResponseRenderer {
    templates: TemplateEngine,
}

impl ResponseRenderer {
    #[must_use]
    pub fn new(templates: TemplateEngine) -> Self {
        Self { templates }
    }

    #[must_use]
    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    /// Pick exactly one renderer.
    ///
    /// Only strings are inspected: a `redirect:` prefix first, then a template
    /// suffix, then the route's view kind. On an HTML route a plain string
    /// names the template.
    #[must_use]
    pub fn select(view: ViewKind, reply: &Reply) -> RenderStrategy {
        match reply {
            Reply::Response(_) => RenderStrategy::Passthrough,
            Reply::View(mv) => RenderStrategy::Html {
                template: mv.view.clone(),
            },
            Reply::Text(s) => {
                if let Some(location) = s.strip_prefix(REDIRECT_PREFIX) {
                    RenderStrategy::Redirect {
                        location: location.trim().to_string(),
                    }
                } else if has_template_suffix(s) || view == ViewKind::Html {
                    RenderStrategy::Html {
                        template: Some(s.clone()),
                    }
                } else if view == ViewKind::Json {
                    RenderStrategy::Json
                } else {
                    RenderStrategy::Text
                }
            }
            Reply::Value(_) | Reply::Empty => match view {
                ViewKind::Json => RenderStrategy::Json,
                ViewKind::Html => RenderStrategy::Html { template: None },
                ViewKind::Text => RenderStrategy::Text,
            },
        }
    }

    /// Render a reply for a route and merge the handler's response parts.
    pub fn render(
        &self,
        route: &Route,
        reply: Reply,
        parts: &ResponseParts,
    ) -> Result<OutboundResponse, RenderError> {
        let strategy = Self::select(route.view, &reply);
        debug!(
            handler_name = %route.handler_name,
            view = %route.view,
            strategy = ?strategy,
            "Render strategy selected"
        );

        let mut resp = match strategy {
            RenderStrategy::Passthrough => {
                if let Reply::Response(resp) = reply {
                    return checked(resp);
                }
                OutboundResponse::new(204)
            }
            RenderStrategy::Redirect { location } => OutboundResponse::redirect(location),
            RenderStrategy::Json => {
                let value = match reply {
                    Reply::Empty => Value::Null,
                    Reply::Text(s) => Value::String(s),
                    Reply::Value(v) => v,
                    Reply::View(mv) => Value::Object(mv.model),
                    Reply::Response(_) => Value::Null,
                };
                OutboundResponse::with_body(200, "application/json", serde_json::to_vec(&value)?)
            }
            RenderStrategy::Text => {
                let body = match reply {
                    Reply::Empty | Reply::Response(_) => String::new(),
                    Reply::Text(s) | Reply::Value(Value::String(s)) => s,
                    Reply::Value(v) => v.to_string(),
                    Reply::View(mv) => Value::Object(mv.model).to_string(),
                };
                OutboundResponse::text(200, body)
            }
            RenderStrategy::Html { template } => {
                let name = template
                    .or_else(|| route.template.as_deref().map(str::to_string))
                    .ok_or_else(|| RenderError::MissingTemplate {
                        route: format!("{} {}", route.method, route.pattern),
                    })?;
                let model = match reply {
                    Reply::View(mv) => Value::Object(mv.model),
                    Reply::Value(Value::Object(map)) => Value::Object(map),
                    Reply::Value(v) => {
                        let mut map = Map::new();
                        map.insert("value".to_string(), v);
                        Value::Object(map)
                    }
                    _ => Value::Object(Map::new()),
                };
                OutboundResponse::html(200, self.templates.render(&name, &model)?)
            }
        };

        parts.apply_to(&mut resp);
        checked(resp)
    }
}

/// Refuse responses whose headers would split the header block, e.g. a
/// redirect target carrying a decoded CR/LF.
fn checked(resp: OutboundResponse) -> Result<OutboundResponse, RenderError> {
    match resp.invalid_header() {
        Some(name) => Err(RenderError::InvalidHeader {
            name: name.to_string(),
        }),
        None => Ok(resp),
    }
}
