//! Utility functions for handling domain names.

use crate::core::error::{AppError, Result};
use url::Url;

/// Extracts the bare domain (e.g. "example.com") from a URL or domain string.
///
/// Handles common variations:
/// - Adds `https://` scheme if missing.
/// - Extracts the host, dropping port, path and query.
/// - Removes a leading `www.`.
/// - Converts to lowercase.
pub(crate) fn get_domain_from_url(website_url_or_domain: &str) -> Result<String> {
    let trimmed_input = website_url_or_domain.trim();
    if trimmed_input.is_empty() {
        return Err(AppError::DomainExtraction(
            "Input string is empty".to_string(),
        ));
    }

    let url_str_with_scheme = if !trimmed_input.contains("://") {
        format!("https://{}", trimmed_input)
    } else {
        trimmed_input.to_string()
    };

    let url = match Url::parse(&url_str_with_scheme) {
        Ok(parsed_url) => parsed_url,
        Err(e) => {
            if !trimmed_input.contains('/')
                && trimmed_input.contains('.')
                && !trimmed_input.starts_with('.')
                && !trimmed_input.ends_with('.')
            {
                tracing::debug!(
                    "Input '{}' failed URL parsing but looks like a domain, using it directly.",
                    trimmed_input
                );
                let host = trimmed_input.strip_prefix("www.").unwrap_or(trimmed_input);
                return Ok(host.to_lowercase());
            }
            return Err(AppError::UrlParse(e));
        }
    };

    let host = url.host_str().ok_or_else(|| {
        AppError::DomainExtraction(format!("Could not extract host from parsed URL: {}", url))
    })?;

    let final_domain = host.strip_prefix("www.").unwrap_or(host).to_lowercase();

    if !final_domain.contains('.') || final_domain.starts_with('.') || final_domain.ends_with('.') {
        return Err(AppError::DomainExtraction(format!(
            "Extracted domain appears invalid: {}",
            final_domain
        )));
    }

    Ok(final_domain)
}

/// Guesses a company's domain from its name: "Acme Widgets Inc." becomes
/// `acmewidgetsinc.com`. Returns `None` when nothing usable remains.
pub(crate) fn guess_domain_from_company(company_name: &str) -> Option<String> {
    let compact: String = company_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let compact = compact.trim_matches('-');
    if compact.is_empty() {
        None
    } else {
        Some(format!("{}.com", compact))
    }
}

/// True when `domain` equals `base` or is a subdomain of it.
pub(crate) fn domain_matches(domain: &str, base: &str) -> bool {
    let domain = domain.trim_end_matches('.');
    let base = base.trim_end_matches('.');
    domain.eq_ignore_ascii_case(base)
        || (domain.len() > base.len()
            && domain[domain.len() - base.len()..].eq_ignore_ascii_case(base)
            && domain.as_bytes()[domain.len() - base.len() - 1] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_domain_from_url_valid() {
        assert_eq!(
            get_domain_from_url("https://www.example-corp.com").unwrap(),
            "example-corp.com"
        );
        assert_eq!(get_domain_from_url("bigcorp.com").unwrap(), "bigcorp.com");
        assert_eq!(get_domain_from_url("www.bigcorp.com").unwrap(), "bigcorp.com");
        assert_eq!(
            get_domain_from_url("https://BIGCORP.com/about?team=1").unwrap(),
            "bigcorp.com"
        );
        assert_eq!(
            get_domain_from_url("http://bigcorp.com:8080").unwrap(),
            "bigcorp.com"
        );
        assert_eq!(
            get_domain_from_url(" mail.bigcorp.co.uk ").unwrap(),
            "mail.bigcorp.co.uk"
        );
    }

    #[test]
    fn test_get_domain_from_url_invalid() {
        assert!(get_domain_from_url("").is_err());
        assert!(get_domain_from_url("   ").is_err());
        assert!(get_domain_from_url("https://").is_err());
        assert!(get_domain_from_url(".com").is_err());
        assert!(get_domain_from_url("bigcorp").is_err());
    }

    #[test]
    fn test_guess_domain_from_company() {
        assert_eq!(
            guess_domain_from_company("Robinhood").as_deref(),
            Some("robinhood.com")
        );
        assert_eq!(
            guess_domain_from_company("Acme Widgets Inc.").as_deref(),
            Some("acmewidgetsinc.com")
        );
        assert_eq!(guess_domain_from_company("  &  "), None);
    }

    #[test]
    fn test_domain_matches() {
        assert!(domain_matches("example.com", "example.com"));
        assert!(domain_matches("mail.example.com", "example.com"));
        assert!(domain_matches("EXAMPLE.com", "example.com"));
        assert!(!domain_matches("example-corp.com", "example.com"));
        assert!(!domain_matches("notexample.com", "example.com"));
    }
}
