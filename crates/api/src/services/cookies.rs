//! Session and CSRF cookies.
//!
//! The session cookie is HttpOnly. The CSRF cookie is readable by the
//! frontend, which echoes it back in the `X-CSRF-Token` header.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

use crate::config::SessionConfig;

#[derive(Debug, Clone)]
pub struct CookieHelper {
    config: SessionConfig,
}

impl CookieHelper {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn session_cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn csrf_cookie_name(&self) -> &str {
        &self.config.csrf_cookie_name
    }

    pub fn build_session_cookie(&self, token: &str) -> String {
        self.build_cookie(&self.config.cookie_name, token, self.config.ttl_secs, true)
    }

    pub fn build_csrf_cookie(&self, token: &str) -> String {
        self.build_cookie(
            &self.config.csrf_cookie_name,
            token,
            self.config.ttl_secs,
            false,
        )
    }

    /// Appends both `Set-Cookie` headers for a fresh session.
    pub fn add_session_cookies(&self, headers: &mut HeaderMap, session_token: &str, csrf_token: &str) {
        for cookie in [
            self.build_session_cookie(session_token),
            self.build_csrf_cookie(csrf_token),
        ] {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.append(SET_COOKIE, value);
            }
        }
    }

    /// Appends headers that expire both cookies.
    pub fn add_clear_cookies(&self, headers: &mut HeaderMap) {
        for cookie in [
            self.build_clear_cookie(&self.config.cookie_name, true),
            self.build_clear_cookie(&self.config.csrf_cookie_name, false),
        ] {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.append(SET_COOKIE, value);
            }
        }
    }

    /// Reads a cookie value by name from every `Cookie` header.
    pub fn extract_cookie<'a>(&self, headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|header| header.split(';'))
            .find_map(|pair| {
                let (cookie_name, value) = pair.trim().split_once('=')?;
                (cookie_name == name && !value.is_empty()).then_some(value)
            })
    }

    pub fn extract_session_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        self.extract_cookie(headers, &self.config.cookie_name)
    }

    pub fn extract_csrf_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        self.extract_cookie(headers, &self.config.csrf_cookie_name)
    }

    fn attributes(&self, http_only: bool) -> String {
        let mut attrs = String::from("; Path=/");
        if http_only {
            attrs.push_str("; HttpOnly");
        }
        if self.config.secure_cookies {
            attrs.push_str("; Secure");
        }
        attrs.push_str(&format!("; SameSite={}", self.config.same_site));
        attrs
    }

    fn build_cookie(&self, name: &str, value: &str, max_age: i64, http_only: bool) -> String {
        format!(
            "{}={}; Max-Age={}{}",
            name,
            value,
            max_age,
            self.attributes(http_only)
        )
    }

    fn build_clear_cookie(&self, name: &str, http_only: bool) -> String {
        format!(
            "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT{}",
            name,
            self.attributes(http_only)
        )
    }
}
