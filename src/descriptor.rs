//! Call descriptors and request-target construction
//!
//! A [`CallDescriptor`] captures everything about one logical call: method,
//! path segments, query parameters, optional JSON body, and the two flags
//! the refresh machinery reads (`retry_eligible`, `is_replay`). Descriptors
//! are immutable per dispatch attempt; the replay after a credential refresh
//! is a *derived* descriptor produced by [`CallDescriptor::into_replay`],
//! which is what makes the one-replay bound structurally visible.
//!
//! Example
//! ```rust
//! use authgate::{CallDescriptor, Method};
//! use url::Url;
//!
//! let base = Url::parse("https://api.example.com").unwrap();
//! let call = CallDescriptor::new(Method::Get, ["markets", "premier league"])
//!     .query("limit", 20)
//!     .query_opt("cursor", None::<&str>);
//! let target = call.target(&base).unwrap();
//! assert_eq!(target.as_str(), "https://api.example.com/markets/premier%20league?limit=20");
//! ```

use std::fmt;

use serde_json::Value;
use url::Url;

/// HTTP methods understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Wire form of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors building a request target from a base URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TargetError {
    /// The base URL cannot carry path segments (e.g. `data:` URLs).
    #[error("base URL cannot carry path segments")]
    CannotBeABase,
}

/// One logical call to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    method: Method,
    paths: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    retry_eligible: bool,
    is_replay: bool,
}

impl CallDescriptor {
    /// Describe a call to the endpoint at `paths`, joined and escaped per
    /// segment when the target is built.
    ///
    /// Calls are retry-eligible by default; opt out with
    /// [`retry_eligible(false)`](Self::retry_eligible) for endpoints where a
    /// transparent replay is unwanted (e.g. the sign-in call itself).
    pub fn new<I, S>(method: Method, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            paths: paths.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            retry_eligible: true,
            is_replay: false,
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter only when a value is present; `None` is
    /// omitted from the target entirely rather than serialized as an empty
    /// string.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Attach a JSON request body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set whether an authorization failure on this call may trigger the
    /// refresh-and-replay path.
    pub fn retry_eligible(mut self, eligible: bool) -> Self {
        self.retry_eligible = eligible;
        self
    }

    /// Derive the replay form of this call, dispatched once after a
    /// successful credential refresh. A replayed call is never refreshed a
    /// second time.
    pub fn into_replay(mut self) -> Self {
        self.is_replay = true;
        self
    }

    /// The call's HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The call's path segments, unescaped.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The call's JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Whether an authorization failure may trigger refresh-and-replay.
    pub fn is_retry_eligible(&self) -> bool {
        self.retry_eligible
    }

    /// Whether this descriptor is the post-refresh replay of a call.
    pub fn is_replay(&self) -> bool {
        self.is_replay
    }

    /// Build the request target against `base`.
    ///
    /// Path segments replace the base's path and are percent-escaped
    /// individually, so a segment containing `/` stays one segment. Query
    /// parameters are appended in insertion order.
    pub fn target(&self, base: &Url) -> Result<Url, TargetError> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| TargetError::CannotBeABase)?;
            segments.clear();
            segments.extend(self.paths.iter().map(String::as_str));
        }
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}
