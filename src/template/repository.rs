//! Repository definitions (`repositories` section).

use serde_yaml::Value;
use url::Url;

use crate::diagnostics::Collector;
use crate::error::Issue;
use crate::parse::{display_value, str_field};

pub const REPOSITORY_KEYS: [&str; 3] = ["description", "url", "credential"];

#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub credential: Option<Value>,
}

impl Repository {
    /// Accepts the short form `name: <url>` and the full definition.
    pub fn new(name: &str, definition: &Value, collector: &mut Collector) -> Repository {
        let what = format!("Repository \"{}\"", name);
        let mut repository = Repository {
            name: name.to_string(),
            url: None,
            description: None,
            credential: None,
        };
        match definition {
            Value::String(url) => repository.url = Some(url.clone()),
            Value::Mapping(body) => {
                for key in body.keys() {
                    let key = display_value(key);
                    if !REPOSITORY_KEYS.contains(&key.as_str()) {
                        collector.push(Issue::unknown_field(what.clone(), key));
                    }
                }
                repository.url = str_field(body, "url").map(str::to_string);
                repository.description = str_field(body, "description").map(str::to_string);
                repository.credential = body.get("credential").cloned();
            }
            _ => {}
        }

        match &repository.url {
            None => collector.push(Issue::missing_field(what, "url")),
            Some(url) if Url::parse(url).is_err() => collector.push(Issue::UrlFailure {
                what: format!("repositories \"{}\" Invalid Url", name),
            }),
            Some(_) => {}
        }
        repository
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    fn repository(yaml: &str, collector: &mut Collector) -> Repository {
        Repository::new("repo", &serde_yaml::from_str(yaml).unwrap(), collector)
    }

    #[test]
    fn short_and_full_forms() {
        let mut collector = Collector::new();
        let short = repository("https://example.com/types", &mut collector);
        let full = repository("{url: 'https://example.com/types', description: types}", &mut collector);
        assert!(!collector.has_errors());
        assert_eq!(short.url, full.url);
        assert_eq!(full.description.as_deref(), Some("types"));
    }

    #[test]
    fn url_is_required_and_checked() {
        let mut collector = Collector::new();
        repository("{description: nowhere}", &mut collector);
        repository("not a url", &mut collector);
        assert_eq!(collector.count_kind(DiagnosticKind::MissingRequiredField), 1);
        assert_eq!(collector.count_kind(DiagnosticKind::UrlFailure), 1);
    }
}
