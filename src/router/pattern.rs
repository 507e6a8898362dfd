//! URL templates decomposed into literal and variable segments.
//!
//! A template such as `/users/{id}/posts/{postId}` is split on `/` into
//! segments. Each segment is either fully literal or exactly one `{name}`
//! variable; partial-segment variables (`/files/{name}.txt`) are rejected when
//! the pattern is parsed.

use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the registered template
/// (known at startup) and are cloned per request; values are per-request data.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Reasons a URL template is rejected at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("template must start with '/'")]
    MissingLeadingSlash,
    #[error("segment '{0}' mixes literal text and a variable; a variable must span the whole segment")]
    PartialSegment(String),
    #[error("segment '{0}' declares an empty variable name")]
    EmptyVariable(String),
    #[error("segment '{0}' has unbalanced braces")]
    UnbalancedBraces(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Box<str>),
    Variable(Arc<str>),
}

/// A parsed URL template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: Arc<str>,
    segments: Vec<Segment>,
    literal_prefix_len: usize,
    variable_count: usize,
}

/// Strip the query string (and fragment) and any trailing slash from a request
/// path. The root path stays `/`.
#[must_use]
pub fn normalize_path(raw: &str) -> &str {
    let path = match raw.find(['?', '#']) {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

impl PathPattern {
    /// Parse a URL template. The template is normalized the same way request
    /// paths are, so `/users/` and `/users` are the same template.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        if !template.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }
        let template = normalize_path(template);

        let mut segments = Vec::with_capacity(template.matches('/').count() + 1);
        let mut variable_count = 0;
        for raw in template.split('/') {
            let opens = raw.matches('{').count();
            let closes = raw.matches('}').count();
            if opens == 0 && closes == 0 {
                segments.push(Segment::Literal(raw.into()));
                continue;
            }
            if opens != 1 || closes != 1 {
                return Err(PatternError::UnbalancedBraces(raw.to_string()));
            }
            if !(raw.starts_with('{') && raw.ends_with('}')) {
                return Err(PatternError::PartialSegment(raw.to_string()));
            }
            let name = raw[1..raw.len() - 1].trim();
            if name.is_empty() {
                return Err(PatternError::EmptyVariable(raw.to_string()));
            }
            segments.push(Segment::Variable(Arc::from(name)));
            variable_count += 1;
        }

        let literal_prefix_len = template.find('{').unwrap_or(template.len());

        Ok(Self {
            template: Arc::from(template),
            segments,
            literal_prefix_len,
            variable_count,
        })
    }

    /// The normalized template string, e.g. `/users/{id}`.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn template_arc(&self) -> Arc<str> {
        Arc::clone(&self.template)
    }

    /// True when the template has no variable segments.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.variable_count == 0
    }

    /// Substring of the template before the first variable placeholder.
    #[must_use]
    pub fn literal_prefix(&self) -> &str {
        &self.template[..self.literal_prefix_len]
    }

    /// Number of `/`-separated segments, counting the empty leading one.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    /// Variable names in declaration order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a normalized request path, returning the variable bindings in
    /// declaration order. Variable values are percent-decoded.
    ///
    /// The cheap checks run first: literal prefix, then segment count.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        if !path.starts_with(self.literal_prefix()) {
            return None;
        }
        if path.split('/').count() != self.segments.len() {
            return None;
        }

        let mut params = ParamVec::new();
        for (segment, value) in self.segments.iter().zip(path.split('/')) {
            match segment {
                Segment::Literal(literal) => {
                    if literal.as_ref() != value {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    if value.is_empty() {
                        return None;
                    }
                    let decoded = urlencoding::decode(value)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| value.to_string());
                    params.push((Arc::clone(name), decoded));
                }
            }
        }
        Some(params)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
    }
}

impl Eq for PathPattern {}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}
