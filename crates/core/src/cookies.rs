//! Netscape cookie-export parsing.
//!
//! The authentication material for the target site arrives as a flat
//! tab-separated export (`domain, includeSubdomains, path, secure, expiration,
//! name, value`). Parsing is tolerant: malformed lines are dropped, not fatal,
//! because exports from browser extensions routinely contain noise.

use std::collections::HashSet;
use std::path::Path;

use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    #[serde(rename = "None")]
    None,
    #[default]
    #[serde(rename = "Lax")]
    Lax,
    #[serde(rename = "Strict")]
    Strict,
}

impl From<SameSite> for CookieSameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::None => CookieSameSite::None,
            SameSite::Lax => CookieSameSite::Lax,
            SameSite::Strict => CookieSameSite::Strict,
        }
    }
}

/// One parsed authentication cookie.
///
/// `expires` is Unix seconds; `-1` marks a session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieRecord {
    /// True when the source line never carried an expiration timestamp.
    pub fn is_session(&self) -> bool {
        self.expires < 0
    }

    /// Re-serialize into the Netscape line format this record was parsed from.
    pub fn to_netscape_line(&self) -> String {
        let domain = if self.http_only {
            format!("#HttpOnly_{}", self.domain)
        } else {
            self.domain.clone()
        };
        let include_subdomains = if self.domain.starts_with('.') {
            "TRUE"
        } else {
            "FALSE"
        };
        let secure = if self.secure { "TRUE" } else { "FALSE" };
        format!(
            "{domain}\t{include_subdomains}\t{}\t{secure}\t{}\t{}\t{}",
            self.path, self.expires, self.name, self.value
        )
    }
}

/// Parse a cookie export file. A missing or unreadable file is fatal to
/// authentication readiness, so it surfaces as an error rather than an empty
/// jar.
pub fn parse_cookie_file(path: impl AsRef<Path>) -> Result<Vec<CookieRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::CookieFile {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_cookie_text(&content);
    debug!(
        target = "dreambridge",
        path = %path.display(),
        count = records.len(),
        "parsed cookie file"
    );
    Ok(records)
}

/// Parse cookie export text, skipping comments, blank lines, and anything
/// with fewer than seven tab-separated fields.
pub fn parse_cookie_text(content: &str) -> Vec<CookieRecord> {
    content.lines().filter_map(parse_line).collect()
}

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

fn parse_line(line: &str) -> Option<CookieRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    // The #HttpOnly_ marker is data, every other #-line is a comment.
    if line.starts_with('#') && !line.starts_with(HTTP_ONLY_PREFIX) {
        return None;
    }

    let fields: Vec<&str> = line.splitn(7, '\t').collect();
    if fields.len() < 7 {
        return None;
    }

    let raw_domain = fields[0].trim();
    let (domain, http_only) = match raw_domain.strip_prefix(HTTP_ONLY_PREFIX) {
        Some(stripped) => (stripped, true),
        None => (raw_domain, false),
    };

    let name = fields[5].trim();
    if name.is_empty() || domain.is_empty() {
        return None;
    }

    Some(CookieRecord {
        name: name.to_string(),
        value: fields[6].trim().to_string(),
        domain: domain.to_string(),
        path: fields[2].trim().to_string(),
        expires: fields[4].trim().parse().unwrap_or(-1),
        http_only,
        secure: fields[3].trim().eq_ignore_ascii_case("TRUE"),
        same_site: SameSite::default(),
    })
}

/// Convert records into CDP cookie parameters for wholesale injection.
///
/// Expiration is intentionally not forwarded: the records ride an existing
/// server-side session, and the upstream still enforces expiry.
pub fn to_cdp_params(records: &[CookieRecord]) -> Result<Vec<CookieParam>> {
    let mut params = Vec::with_capacity(records.len());
    for record in records {
        let param = CookieParam::builder()
            .name(&record.name)
            .value(&record.value)
            .domain(&record.domain)
            .path(&record.path)
            .secure(record.secure)
            .http_only(record.http_only)
            .same_site(record.same_site)
            .build()
            .map_err(|e| Error::Protocol(format!("cookie param build error: {e}")))?;
        params.push(param);
    }
    Ok(params)
}

/// Distinct domains present in the jar, for startup logging.
pub fn domains(records: &[CookieRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.domain.clone()))
        .map(|r| r.domain.clone())
        .collect()
}
