use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SourceError, SourceResult};

/// One page of results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub results: Vec<Value>,
    /// Cursor to the following page; `None` on the last page.
    pub next: Option<String>,
}

impl Page {
    /// Parse a raw page payload.
    pub fn from_value(url: &str, value: Value) -> SourceResult<Self> {
        serde_json::from_value(value).map_err(|e| SourceError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Turns an API URL into its JSON payload.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> SourceResult<Value>;

    /// Fetch and parse a paginated payload.
    fn fetch_page(&self, url: &str) -> SourceResult<Page> {
        Page::from_value(url, self.fetch(url)?)
    }
}

/// Serves canned payloads keyed by URL.
#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    payloads: HashMap<String, Value>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the payload returned for `url`.
    pub fn with(mut self, url: impl Into<String>, payload: Value) -> Self {
        self.payloads.insert(url.into(), payload);
        self
    }
}

impl PageFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> SourceResult<Value> {
        self.payloads
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::Fetch {
                url: url.to_string(),
                reason: "no payload registered".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_last_page() {
        let fetcher = StaticFetcher::new().with("/p", json!({"results": [1, 2], "next": null}));
        let page = fetcher.fetch_page("/p").unwrap();
        assert_eq!(page.results, vec![json!(1), json!(2)]);
        assert!(page.next.is_none());
    }

    #[test]
    fn page_without_results_is_malformed() {
        let fetcher = StaticFetcher::new().with("/p", json!({"detail": "Not found."}));
        assert!(matches!(fetcher.fetch_page("/p"), Err(SourceError::Malformed { .. })));
    }

    #[test]
    fn unknown_url_fails() {
        assert!(matches!(StaticFetcher::new().fetch("/nope"), Err(SourceError::Fetch { .. })));
    }
}
