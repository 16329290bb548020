//! URL predicate that identifies the stock-data response.
//!
//! Matching happens on the URL alone so that bodies are only fetched for the
//! one response of interest; everything else the page loads is discarded
//! without ever being read.

use url::Url;

/// Predicate over response URLs. A response matches when it is served from the
/// configured scheme/host/path prefix and its query string carries both
/// required signals: the backend script identifier and the check-stock
/// operation marker.
#[derive(Clone, Debug)]
pub struct MatchRule {
    url_prefix: String,
    script_param: (String, String),
    op_param: (String, String),
}

const DEFAULT_URL_PREFIX: &str = "https://www.kitchenwarehouse.com.au/app/site/hosting/scriptlet.nl";
const DEFAULT_SCRIPT_PARAM: (&str, &str) = ("script", "3587");
const DEFAULT_OP_PARAM: (&str, &str) = ("type", "check_stock");

impl MatchRule {
    pub fn new(
        url_prefix: impl Into<String>,
        script_param: (impl Into<String>, impl Into<String>),
        op_param: (impl Into<String>, impl Into<String>),
    ) -> Self {
        Self {
            url_prefix: url_prefix.into(),
            script_param: (script_param.0.into(), script_param.1.into()),
            op_param: (op_param.0.into(), op_param.1.into()),
        }
    }

    /// Stateless, side-effect free; safe to call concurrently and redundantly.
    pub fn matches(&self, url: &str) -> bool {
        let Ok(candidate) = Url::parse(url) else {
            return false;
        };
        let Ok(prefix) = Url::parse(&self.url_prefix) else {
            return false;
        };

        if candidate.scheme() != prefix.scheme() {
            return false;
        }
        // `Url::parse` lowercases registered hosts, which also covers mixed
        // case variants of the configured prefix.
        match (candidate.host_str(), prefix.host_str()) {
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => {}
            _ => return false,
        }
        if !candidate.path().starts_with(prefix.path()) {
            return false;
        }

        let has_signal = |key: &str, want: &str| {
            candidate
                .query_pairs()
                .any(|(k, v)| k == key && v == want)
        };
        has_signal(&self.script_param.0, &self.script_param.1)
            && has_signal(&self.op_param.0, &self.op_param.1)
    }
}

impl Default for MatchRule {
    fn default() -> Self {
        Self::new(DEFAULT_URL_PREFIX, DEFAULT_SCRIPT_PARAM, DEFAULT_OP_PARAM)
    }
}
