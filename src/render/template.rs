use crate::error::RenderError;
use minijinja::{AutoEscape, Environment};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Template sources for HTML rendering, from an optional directory plus
/// templates registered in code. Rendered with minijinja, HTML auto-escaping on.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    base_dir: Option<PathBuf>,
    inline: HashMap<String, String>,
}

impl TemplateEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            base_dir: Some(dir.into()),
            inline: HashMap::new(),
        }
    }

    pub fn set_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.base_dir = Some(dir.into());
    }

    /// Register a template under a name. Takes precedence over files.
    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.inline.insert(name.into(), source.into());
    }

    fn candidates(name: &str) -> [String; 2] {
        [name.to_string(), format!("{name}.html")]
    }

    fn file_path(&self, name: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone()?;
        for comp in Path::new(name.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        pb.is_file().then_some(pb)
    }

    /// Source text of a template. A name without a match is retried with an
    /// `.html` suffix.
    pub fn source(&self, name: &str) -> Result<String, RenderError> {
        for candidate in Self::candidates(name) {
            if let Some(source) = self.inline.get(&candidate) {
                return Ok(source.clone());
            }
            if let Some(path) = self.file_path(&candidate) {
                return fs::read_to_string(&path).map_err(|source| RenderError::TemplateLoad {
                    name: name.to_string(),
                    source,
                });
            }
        }
        Err(RenderError::TemplateLoad {
            name: name.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "template not found"),
        })
    }

    pub fn render(&self, name: &str, ctx: &Value) -> Result<String, RenderError> {
        let source = self.source(name)?;
        let template_error = |source| RenderError::Template {
            name: name.to_string(),
            source,
        };

        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template(name, &source).map_err(template_error)?;
        env.get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(template_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inline_template_with_suffix_fallback() {
        let mut engine = TemplateEngine::new();
        engine.add_template("greeting.html", "<h1>Hello {{ name }}!</h1>");
        let ctx = json!({ "name": "World" });
        assert_eq!(
            engine.render("greeting", &ctx).unwrap(),
            "<h1>Hello World!</h1>"
        );
        assert_eq!(
            engine.render("greeting.html", &ctx).unwrap(),
            "<h1>Hello World!</h1>"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        let mut engine = TemplateEngine::new();
        engine.add_template("t", "{{ v }}");
        let out = engine.render("t", &json!({ "v": "<b>" })).unwrap();
        assert_eq!(out, "&lt;b&gt;");
    }

    #[test]
    fn test_file_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.j2"), "{{ title }}").unwrap();
        let engine = TemplateEngine::with_dir(dir.path());
        assert_eq!(engine.render("page.j2", &json!({"title": "x"})).unwrap(), "x");
        assert!(matches!(
            engine.render("missing.html", &json!({})),
            Err(RenderError::TemplateLoad { .. })
        ));
        assert!(matches!(
            engine.render("../page.j2", &json!({})),
            Err(RenderError::TemplateLoad { .. })
        ));
    }

    #[test]
    fn test_syntax_error() {
        let mut engine = TemplateEngine::new();
        engine.add_template("bad.html", "{% if %}");
        assert!(matches!(
            engine.render("bad.html", &json!({})),
            Err(RenderError::Template { .. })
        ));
    }
}
