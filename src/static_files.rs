//! Static-file fallback, consulted when no route matches a GET or HEAD request.

use crate::context::OutboundResponse;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Serves a response for a path no route claimed.
pub trait StaticFallback: Send + Sync {
    /// `None` lets the dispatcher answer 404.
    fn try_serve(&self, path: &str) -> Option<OutboundResponse>;
}

/// Files under a base directory. `/` serves `index.html`.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a URL path under the base directory. Any `..`, root or prefix
    /// component rejects the path.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(url_path).ok()?;
        let mut pb = self.base_dir.clone();
        for comp in Path::new(decoded.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            _ => "application/octet-stream",
        }
    }

    /// Read a file and its content type.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let url_path = if url_path.is_empty() || url_path == "/" {
            "index.html"
        } else {
            url_path
        };
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

impl StaticFallback for StaticFiles {
    fn try_serve(&self, path: &str) -> Option<OutboundResponse> {
        match self.load(path) {
            Ok((bytes, content_type)) => {
                debug!(
                    path = %path,
                    content_type = content_type,
                    size_bytes = bytes.len(),
                    "Static file served"
                );
                Some(OutboundResponse::with_body(200, content_type, bytes))
            }
            Err(err) => {
                debug!(path = %path, error = %err, "Static file not served");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, StaticFiles) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), "Hello\n").unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::create_dir(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css").join("site.css"), "body{}").unwrap();
        let sf = StaticFiles::new(dir.path());
        (dir, sf)
    }

    #[test]
    fn test_map_path_prevents_traversal() {
        let (_dir, sf) = fixture();
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("/../../Cargo.toml").is_none());
        assert!(sf.map_path("/css/%2E%2E/%2E%2E/secret").is_none());
        assert!(sf.try_serve("/../Cargo.toml").is_none());
    }

    #[test]
    fn test_load_plain_file() {
        let (_dir, sf) = fixture();
        let (bytes, ct) = sf.load("/hello.txt").unwrap();
        assert_eq!(ct, "text/plain; charset=utf-8");
        assert_eq!(String::from_utf8(bytes).unwrap(), "Hello\n");
    }

    #[test]
    fn test_root_serves_index() {
        let (_dir, sf) = fixture();
        let resp = sf.try_serve("/").unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(resp.body_str(), "<h1>home</h1>");
    }

    #[test]
    fn test_nested_and_missing() {
        let (_dir, sf) = fixture();
        let resp = sf.try_serve("/css/site.css").unwrap();
        assert_eq!(resp.content_type(), Some("text/css"));
        assert!(sf.try_serve("/nope.txt").is_none());
        assert!(sf.try_serve("/css").is_none());
    }
}
