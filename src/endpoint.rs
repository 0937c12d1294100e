//! Replica endpoints and request URL construction.
//!
//! An [`Endpoint`] is validated once, where the caller hands it over, so a
//! malformed replica address never surfaces deep inside a fan-out. The
//! [`UrlBuilder`] then assembles per-request URLs from an endpoint, a path
//! template with `:name` placeholders and query parameters.

use crate::error::{ClientError, Result};
use std::fmt;
use std::str::FromStr;
use url::{form_urlencoded, Url};

/// Scheme assumed for host-only endpoint strings.
pub const DEFAULT_SCHEME: &str = "https";

/// One network-addressable replica, normalized to `scheme://host[:port][/prefix]`
/// without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ClientError::malformed(input, "empty endpoint"));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("{DEFAULT_SCHEME}://{trimmed}")
        };

        let mut url = Url::parse(&candidate).map_err(|e| ClientError::malformed(input, e))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::malformed(
                input,
                format!("unsupported scheme {}", url.scheme()),
            ));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ClientError::malformed(input, "missing host"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(ClientError::malformed(
                input,
                "credentials in endpoint urls are not supported",
            ));
        }

        url.set_query(None);
        url.set_fragment(None);
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);

        Ok(Self { url })
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host, port and any path prefix, e.g. `node.example.com:7071/miner01`.
    pub fn authority_and_prefix(&self) -> String {
        let mut out = self.url.host_str().unwrap_or_default().to_string();
        if let Some(port) = self.url.port() {
            out.push(':');
            out.push_str(&port.to_string());
        }
        out.push_str(self.url.path().trim_end_matches('/'));
        out
    }
}

impl FromStr for Endpoint {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str().trim_end_matches('/'))
    }
}

/// Parses a list of raw endpoint strings, failing on the first malformed one.
pub fn parse_endpoints<I, S>(inputs: I) -> Result<Vec<Endpoint>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inputs
        .into_iter()
        .map(|s| Endpoint::parse(s.as_ref()))
        .collect()
}

/// Builder for request URLs.
///
/// Every call to [`UrlBuilder::build`] produces a fresh `String`; further
/// changes to the builder never affect strings already returned.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    scheme: String,
    host: String,
    path: String,
    params: Vec<(String, String)>,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            host: String::new(),
            path: String::new(),
            params: Vec::new(),
        }
    }
}

impl UrlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an endpoint's scheme, host, port and path prefix.
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        Self::new()
            .set_scheme(endpoint.scheme())
            .set_host(endpoint.authority_and_prefix())
    }

    pub fn set_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn set_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn set_path(mut self, template: impl Into<String>) -> Self {
        self.path = template.into();
        self
    }

    /// Replaces the first `:name` segment of the path template with `value`,
    /// percent-encoded so it always stays a single segment.
    /// A name with no matching placeholder leaves the path untouched.
    pub fn set_path_variable(mut self, name: &str, value: &str) -> Self {
        let placeholder = format!(":{name}");
        // Form encoding writes a space as `+`, which a path would keep literally.
        let encoded = form_urlencoded::byte_serialize(value.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        let value = encoded.as_str();
        let mut replaced = false;
        let segments: Vec<&str> = self
            .path
            .split('/')
            .map(|segment| {
                if !replaced && segment == placeholder {
                    replaced = true;
                    value
                } else {
                    segment
                }
            })
            .collect();
        self.path = segments.join("/");
        self
    }

    /// Adds a query parameter; a repeated name overwrites the earlier value in place.
    pub fn add_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::new();

        if !self.host.is_empty() {
            out.push_str(&self.scheme);
            out.push_str("://");
            out.push_str(&self.host);
        }

        if !self.path.is_empty() {
            if !self.path.starts_with('/') {
                out.push('/');
            }
            out.push_str(&self.path);
        }

        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.params.iter())
                .finish();
            out.push('?');
            out.push_str(&query);
        }

        out
    }

    /// Builds and parses an absolute URL. A builder without a host yields a
    /// relative string, which fails here as a malformed endpoint.
    pub fn build_url(&self) -> Result<Url> {
        let raw = self.build();
        Url::parse(&raw).map_err(|e| ClientError::malformed(raw.clone(), e))
    }
}
