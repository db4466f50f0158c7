//! URL normalization and link resolution helpers.

use url::Url;

use crate::error::ResolveError;

/// Canonical comparison key for a URL.
///
/// Case-folds, drops the scheme and any leading `www.`, strips query string,
/// fragment and trailing slashes. Two URLs that only differ in these respects
/// map to the same key, and the function is idempotent.
pub fn normalize_url(raw: &str) -> String {
    let mut s = raw.to_lowercase();

    // Strip every leading scheme, `www.`, slash or space until none is left.
    loop {
        let trimmed = s.trim_start_matches(|c: char| c == '/' || c.is_whitespace());
        let rest = ["https://", "http://", "www."]
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix));
        match rest {
            Some(rest) => s = rest.to_string(),
            None => {
                s = trimmed.to_string();
                break;
            }
        }
    }

    if let Some(idx) = s.find('#') {
        s.truncate(idx);
    }
    if let Some(idx) = s.find('?') {
        s.truncate(idx);
    }

    s.trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}

/// Scheme of `raw` when it starts with one (`ftp:`, `mailto:`), excluding
/// `host:port` forms.
fn explicit_scheme(raw: &str) -> Option<&str> {
    let (scheme, rest) = raw.split_once(':')?;
    let valid = scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return None;
    }
    let port = rest.split('/').next().unwrap_or_default();
    if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(scheme)
}

/// Prefix `https://` when the string has no scheme. Strings carrying another
/// scheme are returned unchanged.
pub fn ensure_scheme(raw: &str) -> String {
    let trimmed = raw.trim();
    if explicit_scheme(trimmed).is_some() {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Parse a candidate string into an absolute http(s) URL.
pub fn parse_candidate(raw: &str) -> Result<Url, ResolveError> {
    let url = Url::parse(&ensure_scheme(raw))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ResolveError::InvalidUrl(format!(
                "unsupported scheme {} in {}",
                other, raw
            )))
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ResolveError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Lower-cased host of a URL string, if it parses.
pub fn host_of(raw: &str) -> Option<String> {
    parse_candidate(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Subdomain labels of a host: everything left of the registrable domain,
/// with `www` removed.
pub fn subdomain_labels(host: &str) -> Vec<&str> {
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return Vec::new();
    }
    labels[..labels.len() - 2]
        .iter()
        .copied()
        .filter(|l| *l != "www")
        .collect()
}

/// Resolve an `href` found on `base` into an absolute http(s) URL.
///
/// Returns `None` for in-page anchors and non-navigational schemes.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Root page of the site hosting `url` (`https://host/`).
pub fn site_root(url: &Url) -> Option<String> {
    url.host_str()
        .map(|host| format!("{}://{}/", url.scheme(), host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_scheme_query_and_slash() {
        assert_eq!(
            normalize_url("HTTPS://www.Club-TT.fr/Tournoi/?utm=1#top"),
            "club-tt.fr/tournoi"
        );
        assert_eq!(normalize_url("http://club-tt.fr/tournoi"), "club-tt.fr/tournoi");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "https://www.www.example.fr/a/",
            "  http://https://Example.fr/x?y=1  ",
            "tournoi.club.fr/ /",
            "www.http://club.fr#frag",
            "",
            "/",
            "/https:///https:///https:///https:///https:///https:///club.fr",
            "www. http://www./club.fr/",
            "HTTPS://WWW.CLUB.FR?x#y/",
        ];
        for input in inputs {
            let once = normalize_url(input);
            assert_eq!(normalize_url(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn ensure_scheme_prefixes_https() {
        assert_eq!(ensure_scheme("club.fr"), "https://club.fr");
        assert_eq!(ensure_scheme("http://club.fr"), "http://club.fr");
        assert_eq!(ensure_scheme("club.fr:8080/t"), "https://club.fr:8080/t");
        assert_eq!(ensure_scheme("ftp://club.fr/file"), "ftp://club.fr/file");
    }

    #[test]
    fn nested_schemes_normalize_in_one_pass() {
        assert_eq!(
            normalize_url("/https:///https:///https:///https:///https:///https:///club.fr"),
            "club.fr"
        );
    }

    #[test]
    fn parse_candidate_rejects_other_schemes() {
        assert!(parse_candidate("ftp://club.fr/file").is_err());
        assert!(parse_candidate("mailto:contact@club.fr").is_err());
        assert!(parse_candidate("javascript:void(0)").is_err());
        assert!(parse_candidate("tournoi.club.fr").is_ok());
        assert_eq!(
            parse_candidate("localhost:8080/inscription").unwrap().as_str(),
            "https://localhost:8080/inscription"
        );
    }

    #[test]
    fn subdomain_labels_skip_www() {
        assert_eq!(subdomain_labels("tournoi.club-tt.fr"), vec!["tournoi"]);
        assert!(subdomain_labels("www.club-tt.fr").is_empty());
        assert!(subdomain_labels("club-tt.fr").is_empty());
    }

    #[test]
    fn resolve_link_handles_relative_and_junk() {
        let base = Url::parse("https://club.fr/tournoi/index.html").unwrap();
        assert_eq!(
            resolve_link(&base, "inscription.php#form").unwrap().as_str(),
            "https://club.fr/tournoi/inscription.php"
        );
        assert_eq!(
            resolve_link(&base, "/contact").unwrap().as_str(),
            "https://club.fr/contact"
        );
        assert!(resolve_link(&base, "mailto:a@club.fr").is_none());
        assert!(resolve_link(&base, "#top").is_none());
    }
}
