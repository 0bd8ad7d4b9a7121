use std::collections::BTreeMap;

use axum::{
    http::{HeaderMap, HeaderValue, header},
    response::Response,
};

/// CookieJar
///
/// The request's cookies, parsed from every `Cookie` header (HTTP/2 clients may split
/// them across several).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = BTreeMap::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            for pair in raw.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    let name = name.trim();
                    // Clients send the most specific path first; that value wins.
                    if !name.is_empty() {
                        cookies
                            .entry(name.to_string())
                            .or_insert_with(|| value.trim().to_string());
                    }
                }
            }
        }
        Self { cookies }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Replays mutations so the jar reflects what the client will hold after the response.
    pub fn apply(&mut self, mutations: &[CookieMutation]) {
        for mutation in mutations {
            if mutation.is_removal() {
                self.cookies.remove(&mutation.name);
            } else {
                self.cookies
                    .insert(mutation.name.clone(), mutation.value.clone());
            }
        }
    }

    /// Serializes the jar back into a single `Cookie` request header value.
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        if self.cookies.is_empty() {
            return None;
        }
        let joined = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: String,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieAttributes {
    /// Attributes shared by both session cookies.
    pub fn session(max_age: i64, secure: bool) -> Self {
        Self {
            path: "/".to_string(),
            max_age: Some(max_age),
            http_only: true,
            secure,
            same_site: SameSite::Lax,
        }
    }
}

/// CookieMutation
///
/// A name/value/attributes triple that must reach the client as a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieMutation {
    pub name: String,
    pub value: String,
    pub attributes: CookieAttributes,
}

impl CookieMutation {
    pub fn set(name: &str, value: impl Into<String>, attributes: CookieAttributes) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            attributes,
        }
    }

    /// Expires the cookie on the client.
    pub fn remove(name: &str, secure: bool) -> Self {
        Self::set(name, "", CookieAttributes::session(0, secure))
    }

    pub fn is_removal(&self) -> bool {
        self.attributes.max_age == Some(0)
    }

    pub fn to_set_cookie(&self) -> String {
        let attrs = &self.attributes;
        let mut out = format!("{}={}; Path={}", self.name, self.value, attrs.path);
        if let Some(max_age) = attrs.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if attrs.http_only {
            out.push_str("; HttpOnly");
        }
        if attrs.secure {
            out.push_str("; Secure");
        }
        out.push_str("; SameSite=");
        out.push_str(attrs.same_site.as_str());
        out
    }
}

/// with_cookies
///
/// Appends one `Set-Cookie` header per mutation. Every response leaving the access gate,
/// forwarded or redirected, goes through here.
///
/// A mutation is skipped when the response already sets a cookie of the same name: the
/// handler that produced the response (sign-in, sign-out) has the final say over it.
pub fn with_cookies(mut response: Response, mutations: &[CookieMutation]) -> Response {
    let already_set = set_cookie_names(response.headers());
    let headers = response.headers_mut();
    for mutation in mutations {
        if already_set.iter().any(|name| *name == mutation.name) {
            tracing::debug!(cookie = %mutation.name, "response already sets cookie, skipping");
            continue;
        }
        match HeaderValue::from_str(&mutation.to_set_cookie()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!(cookie = %mutation.name, "dropping unencodable cookie"),
        }
    }
    response
}

fn set_cookie_names(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| raw.split_once('='))
        .map(|(name, _)| name.trim().to_string())
        .collect()
}
