//! Where a document came from, and how relative imports resolve against it.

use std::path::{Path, PathBuf};

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentLocation {
    File(PathBuf),
    Url(Url),
}

impl DocumentLocation {
    /// Interpret `raw` as a URL when it carries an http(s) scheme, else as a file path.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            if let Ok(url) = Url::parse(raw) {
                return DocumentLocation::Url(url);
            }
        }
        if let Some(stripped) = raw.strip_prefix("file://") {
            return DocumentLocation::File(PathBuf::from(stripped));
        }
        DocumentLocation::File(PathBuf::from(raw))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, DocumentLocation::File(_))
    }

    /// Resolve `reference` relative to this document. Absolute references and
    /// URLs are returned as-is.
    pub fn join(&self, reference: &str) -> DocumentLocation {
        let target = DocumentLocation::parse(reference);
        match (self, target) {
            (_, DocumentLocation::Url(url)) => DocumentLocation::Url(url),
            (DocumentLocation::File(base), DocumentLocation::File(rel)) => {
                if rel.is_absolute() {
                    DocumentLocation::File(rel)
                } else {
                    let dir = base.parent().unwrap_or_else(|| Path::new(""));
                    DocumentLocation::File(dir.join(rel))
                }
            }
            (DocumentLocation::Url(base), DocumentLocation::File(rel)) => {
                match base.join(&rel.to_string_lossy()) {
                    Ok(url) => DocumentLocation::Url(url),
                    Err(_) => DocumentLocation::File(rel),
                }
            }
        }
    }
}

impl std::fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentLocation::File(path) => write!(f, "{}", path.display()),
            DocumentLocation::Url(url) => write!(f, "{}", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_file_joins_against_parent_dir() {
        let base = DocumentLocation::parse("defs/service.yaml");
        assert_eq!(
            base.join("types/compute.yaml"),
            DocumentLocation::File(PathBuf::from("defs/types/compute.yaml"))
        );
    }

    #[test]
    fn relative_file_joins_against_url_base() {
        let base = DocumentLocation::parse("https://example.com/tosca/service.yaml");
        assert_eq!(
            base.join("types.yaml").to_string(),
            "https://example.com/tosca/types.yaml"
        );
    }

    #[test]
    fn url_reference_overrides_file_base() {
        let base = DocumentLocation::parse("service.yaml");
        assert!(!base.join("http://example.com/a.yaml").is_local());
    }
}
