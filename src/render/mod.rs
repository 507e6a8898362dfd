//! Response rendering: JSON, HTML templates, plain text and redirects.

mod selector;
mod template;

pub use selector::{RenderStrategy, ResponseRenderer, REDIRECT_PREFIX, TEMPLATE_SUFFIXES};
pub use template::TemplateEngine;
