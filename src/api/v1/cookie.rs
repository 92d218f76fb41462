use crate::application_port::AuthTokens;
use crate::settings::Environment;
use std::fmt::Write;
use std::net::IpAddr;
use std::time::Duration;

pub const ACCESS_TOKEN_COOKIE: &str = "access-token-cookie";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh-token-cookie";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of one `Set-Cookie` header. `max_age_ms` is in milliseconds
/// and rendered as whole seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub domain: Option<String>,
    pub max_age_ms: u64,
}

impl CookieOptions {
    pub fn header_value(&self, name: &str, value: &str) -> String {
        let mut out = format!("{name}={value}; Path={}", self.path);
        if let Some(domain) = &self.domain {
            let _ = write!(out, "; Domain={domain}");
        }
        let _ = write!(out, "; Max-Age={}", self.max_age_ms / 1000);
        if self.max_age_ms == 0 {
            out.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        let _ = write!(out, "; SameSite={}", self.same_site.as_str());
        out
    }
}

#[derive(Debug, Clone)]
pub struct CookieConfig<'a> {
    pub domain: Option<&'a str>,
    pub environment: Environment,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Options for the access and refresh cookies plus the variant used to clear
/// them. All three share every attribute except the lifetime.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub access: CookieOptions,
    pub refresh: CookieOptions,
    pub cleared: CookieOptions,
}

impl CookiePolicy {
    pub fn new(config: &CookieConfig<'_>) -> Self {
        let base = CookieOptions {
            http_only: true,
            secure: !config.environment.is_development(),
            same_site: SameSite::Strict,
            path: "/".to_string(),
            domain: config
                .domain
                .map(str::trim)
                .filter(|d| !d.is_empty() && !is_loopback_host(d))
                .map(str::to_string),
            max_age_ms: 0,
        };
        Self {
            access: CookieOptions {
                max_age_ms: duration_ms(config.access_ttl),
                ..base.clone()
            },
            refresh: CookieOptions {
                max_age_ms: duration_ms(config.refresh_ttl),
                ..base.clone()
            },
            cleared: base,
        }
    }

    pub fn session_cookies(&self, tokens: &AuthTokens) -> [String; 2] {
        [
            self.access
                .header_value(ACCESS_TOKEN_COOKIE, &tokens.access_token.0),
            self.refresh
                .header_value(REFRESH_TOKEN_COOKIE, &tokens.refresh_token.0),
        ]
    }

    pub fn cleared_cookies(&self) -> [String; 2] {
        [
            self.cleared.header_value(ACCESS_TOKEN_COOKIE, ""),
            self.cleared.header_value(REFRESH_TOKEN_COOKIE, ""),
        ]
    }
}

fn duration_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

/// Browsers reject a `Domain` attribute naming a loopback host.
pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}
