//! Request templates and resolved requests.
//!
//! A [`RequestTemplate`] is the compiled request shape owned by a method
//! descriptor: verb, path template, query and header templates, body.
//! Resolution derives a new, fully literal template from call-time bindings;
//! the compiled instance is never mutated, so it is safe to share across
//! concurrent calls. [`RequestTemplate::to_request`] then produces the
//! [`Request`] handed to the transport.

use std::time::Duration;

use crate::error::TemplateError;
use crate::method::HttpMethod;
use crate::template::{encode_value, pct_decode, Bindings, Template, TemplateKind, QUERY};

/// How a multi-valued query binding is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionFormat {
    /// Repeated pairs: `tag=a&tag=b`.
    #[default]
    Exploded,
    /// One comma-joined pair: `tag=a,b`.
    Csv,
}

/// Per-request options consulted by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    connect_timeout: Duration,
    read_timeout: Duration,
    follow_redirects: bool,
}

impl Options {
    /// Creates options with explicit timeouts and redirect behavior.
    pub fn new(connect_timeout: Duration, read_timeout: Duration, follow_redirects: bool) -> Self {
        Self {
            connect_timeout,
            read_timeout,
            follow_redirects,
        }
    }

    /// Time allowed for connection establishment.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Time allowed for the full request/response exchange.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Whether redirects are followed automatically.
    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(60), true)
    }
}

/// One query parameter: a name and its value templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    name: String,
    values: Vec<Template>,
}

impl QuerySpec {
    /// The (already normalized) parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One header: a name and its value templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    name: String,
    values: Vec<Template>,
}

impl HeaderSpec {
    /// The header name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The request body shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BodySpec {
    /// No body.
    #[default]
    None,
    /// Literal bytes, ready to send.
    Literal(Vec<u8>),
    /// A body template resolved at call time.
    Template(Template),
}

/// The compiled request shape for one method.
#[derive(Debug, Clone, Default)]
pub struct RequestTemplate {
    method: Option<HttpMethod>,
    target: Option<String>,
    path: Option<Template>,
    queries: Vec<QuerySpec>,
    headers: Vec<HeaderSpec>,
    body: BodySpec,
    decode_slash: Option<bool>,
    collection_format: CollectionFormat,
}

impl RequestTemplate {
    /// An empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP verb.
    pub fn set_method(&mut self, method: HttpMethod) -> &mut Self {
        self.method = Some(method);
        self
    }

    /// The HTTP verb, if one was set.
    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    /// Sets the target prefix (base URL). A template keeps the first target
    /// it is given; see [`crate::target::Target::apply`].
    pub fn set_target(&mut self, target: impl Into<String>) -> &mut Self {
        self.target = Some(target.into());
        self
    }

    /// The target prefix, if one was set.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Parses a `path?query` string into the path template and query specs.
    ///
    /// ## Errors
    ///
    /// Propagates template parse failures.
    pub fn uri(&mut self, uri: &str) -> Result<&mut Self, TemplateError> {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };
        if !path.is_empty() {
            self.path = Some(Template::parse(path, TemplateKind::Path)?);
        }
        if let Some(query) = query {
            for pair in query.split('&').filter(|pair| !pair.is_empty()) {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                self.query(name, &[value])?;
            }
        }
        Ok(self)
    }

    /// Appends query values, interpreting `{...}` as expressions.
    ///
    /// ## Errors
    ///
    /// Propagates template parse failures.
    pub fn query(&mut self, name: &str, values: &[&str]) -> Result<&mut Self, TemplateError> {
        let templates = values
            .iter()
            .map(|value| Template::parse(value, TemplateKind::Query))
            .collect::<Result<Vec<_>, _>>()?;
        self.push_query(name, templates);
        Ok(self)
    }

    /// Appends pre-resolved query values, bypassing brace interpretation.
    ///
    /// Values are percent-encoded here unless `encoded` says they already
    /// are.
    pub(crate) fn query_literal(&mut self, name: &str, values: &[String], encoded: bool) {
        let templates = values
            .iter()
            .map(|value| {
                let value = if encoded {
                    value.clone()
                } else {
                    encode_value(value, QUERY)
                };
                Template::from_literal(&value, TemplateKind::Query)
            })
            .collect();
        self.push_query(name, templates);
    }

    fn push_query(&mut self, name: &str, mut templates: Vec<Template>) {
        let name = crate::template::encode_literal(name);
        match self.queries.iter_mut().find(|spec| spec.name == name) {
            Some(spec) => spec.values.append(&mut templates),
            None => self.queries.push(QuerySpec {
                name,
                values: templates,
            }),
        }
    }

    /// Appends header values, interpreting `{...}` as expressions.
    /// An empty value list removes the header instead.
    ///
    /// ## Errors
    ///
    /// Propagates template parse failures.
    pub fn header(&mut self, name: &str, values: &[&str]) -> Result<&mut Self, TemplateError> {
        if values.is_empty() {
            self.headers.retain(|spec| !spec.name.eq_ignore_ascii_case(name));
            return Ok(self);
        }
        let templates = values
            .iter()
            .map(|value| Template::parse(value, TemplateKind::Header))
            .collect::<Result<Vec<_>, _>>()?;
        self.push_header(name, templates);
        Ok(self)
    }

    /// Appends pre-resolved header values, bypassing brace interpretation.
    pub(crate) fn header_literal(&mut self, name: &str, values: &[String]) {
        let templates = values
            .iter()
            .map(|value| Template::from_literal(value, TemplateKind::Header))
            .collect();
        self.push_header(name, templates);
    }

    fn push_header(&mut self, name: &str, mut templates: Vec<Template>) {
        match self
            .headers
            .iter_mut()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
        {
            Some(spec) => spec.values.append(&mut templates),
            None => self.headers.push(HeaderSpec {
                name: name.to_string(),
                values: templates,
            }),
        }
    }

    /// The header specs, in insertion order.
    pub fn headers(&self) -> &[HeaderSpec] {
        &self.headers
    }

    /// The query specs, in insertion order.
    pub fn queries(&self) -> &[QuerySpec] {
        &self.queries
    }

    /// Sets a literal body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = BodySpec::Literal(body.into());
        self
    }

    /// Sets a templated body.
    ///
    /// ## Errors
    ///
    /// Propagates template parse failures.
    pub fn set_body_template(&mut self, body: &str) -> Result<&mut Self, TemplateError> {
        self.body = BodySpec::Template(Template::parse(body, TemplateKind::Body)?);
        Ok(self)
    }

    /// The body shape.
    pub fn body(&self) -> &BodySpec {
        &self.body
    }

    /// Controls whether `%2F` in resolved path values is normalized to `/`.
    pub fn set_decode_slash(&mut self, decode_slash: bool) -> &mut Self {
        self.decode_slash = Some(decode_slash);
        self
    }

    /// Whether slashes are decoded in resolved path values (default: yes).
    pub fn decode_slash(&self) -> bool {
        self.decode_slash.unwrap_or(true)
    }

    /// Sets the multi-value join style for query parameters.
    pub fn set_collection_format(&mut self, format: CollectionFormat) -> &mut Self {
        self.collection_format = format;
        self
    }

    /// The multi-value join style.
    pub fn collection_format(&self) -> CollectionFormat {
        self.collection_format
    }

    /// Whether any template in this request binds `name`.
    pub fn has_variable(&self, name: &str) -> bool {
        self.path
            .iter()
            .chain(self.queries.iter().flat_map(|spec| spec.values.iter()))
            .chain(self.headers.iter().flat_map(|spec| spec.values.iter()))
            .chain(match &self.body {
                BodySpec::Template(template) => Some(template),
                _ => None,
            })
            .any(|template| template.has_variable(name))
    }

    /// Resolves every template against the bindings, producing a working
    /// copy in which all chunks are literal. `self` is not modified.
    ///
    /// ## Errors
    ///
    /// Returns [`TemplateError::Unresolved`] when a required path or body
    /// expression has no binding.
    pub fn resolve(&self, bindings: &Bindings) -> Result<RequestTemplate, TemplateError> {
        let mut resolved = RequestTemplate {
            method: self.method,
            target: self.target.clone(),
            path: None,
            queries: Vec::new(),
            headers: Vec::new(),
            body: BodySpec::None,
            decode_slash: self.decode_slash,
            collection_format: self.collection_format,
        };

        if let Some(path) = &self.path {
            // required expressions make this always Some
            let mut text = path
                .resolve(bindings)?
                .unwrap_or_default();
            if self.decode_slash() {
                text = text.replace("%2F", "/").replace("%2f", "/");
            }
            resolved.path = Some(Template::from_literal(&text, TemplateKind::Path));
        }

        for spec in &self.queries {
            let mut values = Vec::new();
            for template in &spec.values {
                if let Some(mut expanded) = template.resolve_values(bindings)? {
                    values.append(&mut expanded);
                }
            }
            if values.is_empty() {
                continue;
            }
            let values = match self.collection_format {
                CollectionFormat::Exploded => values,
                CollectionFormat::Csv => vec![values.join(",")],
            };
            resolved.queries.push(QuerySpec {
                name: spec.name.clone(),
                values: values
                    .iter()
                    .map(|value| Template::from_literal(value, TemplateKind::Query))
                    .collect(),
            });
        }

        for spec in &self.headers {
            let mut values = Vec::new();
            for template in &spec.values {
                match template.resolve(bindings)? {
                    Some(value) if !value.is_empty() => values.push(value),
                    _ => {}
                }
            }
            if values.is_empty() {
                continue;
            }
            resolved.headers.push(HeaderSpec {
                name: spec.name.clone(),
                values: values
                    .iter()
                    .map(|value| Template::from_literal(value, TemplateKind::Header))
                    .collect(),
            });
        }

        resolved.body = match &self.body {
            BodySpec::None => BodySpec::None,
            BodySpec::Literal(bytes) => BodySpec::Literal(bytes.clone()),
            BodySpec::Template(template) => {
                // reserved characters arrive percent-encoded in body markers;
                // the expanded body goes out decoded
                let text = template.resolve(bindings)?.unwrap_or_default();
                BodySpec::Literal(pct_decode(&text).into_bytes())
            }
        };

        Ok(resolved)
    }

    /// Produces the wire-ready request.
    ///
    /// ## Errors
    ///
    /// Returns [`TemplateError::IncompleteRequest`] when no verb or target
    /// was set, and [`TemplateError::Unresolved`] when an unresolved
    /// required expression remains.
    pub fn to_request(&self) -> Result<Request, TemplateError> {
        let method = self
            .method
            .ok_or(TemplateError::IncompleteRequest { reason: "no HTTP method" })?;
        let target = self
            .target
            .as_deref()
            .ok_or(TemplateError::IncompleteRequest { reason: "no target" })?;

        let empty = Bindings::new();
        let mut url = target.trim_end_matches('/').to_string();
        if let Some(path) = &self.path {
            let path = path.resolve(&empty)?.unwrap_or_default();
            if !path.starts_with('/') && !path.is_empty() {
                url.push('/');
            }
            url.push_str(&path);
        }

        let mut first = true;
        for spec in &self.queries {
            for template in &spec.values {
                let Some(value) = template.resolve(&empty)? else { continue };
                url.push(if first { '?' } else { '&' });
                first = false;
                url.push_str(&spec.name);
                url.push('=');
                url.push_str(&value);
            }
        }

        let mut headers = Vec::new();
        for spec in &self.headers {
            for template in &spec.values {
                if let Some(value) = template.resolve(&empty)? {
                    if !value.is_empty() {
                        headers.push((spec.name.clone(), value));
                    }
                }
            }
        }

        let body = match &self.body {
            BodySpec::None => None,
            BodySpec::Literal(bytes) => Some(bytes.clone()),
            BodySpec::Template(template) => Some(
                pct_decode(&template.resolve(&empty)?.unwrap_or_default()).into_bytes(),
            ),
        };

        Ok(Request {
            method,
            url,
            headers,
            body,
        })
    }
}

/// A fully resolved request, ready for the transport collaborator.
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpMethod,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl Request {
    /// The HTTP verb.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The absolute URL, query string included.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// All header pairs, in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of the named header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body bytes, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}
