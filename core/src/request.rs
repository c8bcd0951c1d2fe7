use crate::{Error, Result};
use http::header::{IntoHeaderName, HOST};
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{HeaderMap, HeaderValue, Method, Uri};
use std::fmt::Write;
use std::mem;
use std::str::FromStr;

/// SigningRequest is a request taken apart so a signer can canonicalize it.
///
/// [`SigningRequest::build`] moves the uri and headers out of
/// `http::request::Parts` and [`SigningRequest::apply`] moves them back,
/// writing the query in the order the signer left it. What goes on the wire
/// is therefore the request that was signed.
///
/// Requests without a scheme are taken to be https, which is all a managed
/// search domain serves.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// `http` or `https`.
    pub scheme: Scheme,
    /// Host and optional port.
    pub authority: Authority,
    /// Path as sent, still percent-encoded.
    pub path: String,
    /// Decoded query pairs.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Take `parts` apart for signing.
    ///
    /// The uri and headers of `parts` are left empty until
    /// [`SigningRequest::apply`] puts them back.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();

        let scheme = match uri.scheme {
            None => Scheme::HTTPS,
            Some(s) if s == Scheme::HTTP || s == Scheme::HTTPS => s,
            Some(s) => {
                return Err(Error::request_invalid("only http and https can be signed")
                    .with_context(format!("scheme: {s}")))
            }
        };
        let authority = uri.authority.ok_or_else(|| {
            Error::request_invalid("request without authority is invalid for signing")
        })?;
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        let path = paq.path().to_string();
        let query = paq
            .query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme,
            authority,
            path,
            query,
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Put the signed uri and headers back into `parts`.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let mut paq = mem::take(&mut self.path);
        if !self.query.is_empty() {
            paq.push('?');
            for (i, (k, v)) in self.query.iter().enumerate() {
                if i > 0 {
                    paq.push('&');
                }
                paq.push_str(k);
                if !v.is_empty() {
                    paq.push('=');
                    paq.push_str(v);
                }
            }
        }

        let mut uri = mem::take(&mut parts.uri).into_parts();
        uri.scheme = Some(self.scheme);
        uri.authority = Some(self.authority);
        uri.path_and_query = Some(PathAndQuery::from_str(&paq)?);

        parts.method = self.method;
        parts.uri = Uri::from_parts(uri)?;
        parts.headers = self.headers;
        Ok(())
    }

    /// Trim surrounding spaces from every header value.
    pub fn normalize_header_values(&mut self) {
        for (_, value) in self.headers.iter_mut() {
            header_value_trim(value)
        }
    }

    /// Insert `name` unless the caller already set it.
    pub fn ensure_header(&mut self, name: impl IntoHeaderName, value: HeaderValue) {
        self.headers.entry(name).or_insert(value);
    }

    /// Insert a `host` header taken from the authority unless one is set.
    ///
    /// A caller supplied host, such as the domain name in front of a tunnel,
    /// is what gets signed.
    pub fn ensure_host(&mut self) -> Result<()> {
        if !self.headers.contains_key(HOST) {
            let value = HeaderValue::from_str(self.authority.as_str())?;
            self.headers.insert(HOST, value);
        }
        Ok(())
    }

    /// Header value as text, `None` when absent.
    pub fn header_str(&self, name: &str) -> Result<Option<&str>> {
        self.headers
            .get(name)
            .map(|v| {
                v.to_str().map_err(|e| {
                    Error::request_invalid("header value is not visible ascii")
                        .with_context(format!("header: {name}"))
                        .with_source(e)
                })
            })
            .transpose()
    }

    /// Lowercase header names in sorted order, every header is signed.
    pub fn signed_headers(&self) -> Vec<&str> {
        let mut names = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// One `name:value` line per signed header, repeated values joined by
    /// commas.
    pub fn canonical_headers(&self) -> Result<String> {
        let mut f = String::with_capacity(128);
        for name in self.signed_headers() {
            let values = self
                .headers
                .get_all(name)
                .iter()
                .map(|v| v.to_str())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| {
                    Error::request_invalid("header value is not visible ascii")
                        .with_context(format!("header: {name}"))
                        .with_source(e)
                })?;
            writeln!(f, "{}:{}", name, values.join(","))?;
        }
        Ok(f)
    }
}

fn header_value_trim(v: &mut HeaderValue) {
    let bs = v.as_bytes();
    let start = bs.iter().position(|b| *b != b' ').unwrap_or(0);
    let end = bs.len() - bs.iter().rev().position(|b| *b != b' ').unwrap_or(0);

    // Only spaces were removed from a valid value.
    *v = HeaderValue::from_bytes(&bs[start..end]).expect("invalid header value")
}
