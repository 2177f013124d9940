//! Generates candidate email addresses from a person's name and domains.

use crate::core::config::Config;
use crate::core::models::{CandidateEmail, CandidateKind, PatternId, PersonProfile};
use crate::utils::domain::{get_domain_from_url, guess_domain_from_company};
use std::collections::HashSet;

const HONORIFICS: &[&str] = &["dr", "mr", "mrs", "ms", "miss", "prof"];
const SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "phd", "md", "esq"];

/// Lowercases and strips everything but ASCII alphanumerics and inner hyphens.
fn sanitize_name_part(part: &str) -> String {
    let cleaned: String = part
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    cleaned.trim_matches('-').to_string()
}

/// Usable name tokens, with leading honorifics and trailing suffixes removed.
pub(crate) fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens: Vec<String> = name
        .split_whitespace()
        .map(sanitize_name_part)
        .filter(|t| !t.is_empty())
        .collect();

    while tokens.len() > 1 && HONORIFICS.contains(&tokens[0].as_str()) {
        tokens.remove(0);
    }
    while tokens.len() > 1 && tokens.last().is_some_and(|t| SUFFIXES.contains(&t.as_str())) {
        tokens.pop();
    }
    tokens
}

/// Local parts for `first`/`last`, highest priority first.
fn local_parts(first: &str, last: &str) -> Vec<(PatternId, String)> {
    let first_initial = first.chars().next().unwrap_or_default();
    let last_initial = last.chars().next().unwrap_or_default();

    vec![
        (PatternId::FirstDotLast, format!("{}.{}", first, last)),
        (PatternId::FirstLast, format!("{}{}", first, last)),
        (PatternId::FirstUnderscoreLast, format!("{}_{}", first, last)),
        (PatternId::LastDotFirst, format!("{}.{}", last, first)),
        (PatternId::InitialLast, format!("{}{}", first_initial, last)),
        (PatternId::FirstInitial, format!("{}{}", first, last_initial)),
        (PatternId::First, first.to_string()),
        (PatternId::Last, last.to_string()),
    ]
}

/// Undoes common address obfuscation (`jane [at] corp [dot] com`).
pub(crate) fn normalize_seed_email(raw: &str) -> String {
    let mut email = raw.to_lowercase();
    for (from, to) in [
        ("[at]", "@"),
        ("(at)", "@"),
        (" at ", "@"),
        ("[dot]", "."),
        ("(dot)", "."),
        (" dot ", "."),
    ] {
        email = email.replace(from, to);
    }
    let email: String = email.chars().filter(|c| !c.is_whitespace()).collect();
    email
        .trim_start_matches("mailto:")
        .trim_matches(|c: char| matches!(c, '<' | '>' | ',' | ';' | '"' | '\''))
        .to_string()
}

/// The caller-supplied organisational domain, normalised.
pub(crate) fn organisation_domain(profile: &PersonProfile) -> Option<String> {
    let raw = profile.company_domain.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    match get_domain_from_url(raw) {
        Ok(domain) => Some(domain),
        Err(e) => {
            tracing::warn!("Ignoring unusable company domain '{}': {}", raw, e);
            None
        }
    }
}

/// Domain used for work candidates: the supplied one, or a guess from the
/// company name when inference is enabled.
fn work_domain(config: &Config, profile: &PersonProfile) -> Option<String> {
    organisation_domain(profile).or_else(|| {
        if !config.infer_company_domain {
            return None;
        }
        let guess = profile
            .company_name
            .as_deref()
            .and_then(guess_domain_from_company)?;
        tracing::debug!(
            "Inferred company domain '{}' from company name '{}'",
            guess,
            profile.company_name.as_deref().unwrap_or_default()
        );
        Some(guess)
    })
}

/// Generates the ordered, deduplicated, capped candidate set for a profile.
///
/// Order: seeds, work name patterns, personal name patterns, work bare
/// patterns, personal bare patterns. Anything failing the strict address
/// syntax is dropped. Truncation to `config.max_candidates` removes the tail.
pub(crate) fn generate_candidates(
    config: &Config,
    profile: &PersonProfile,
    seed_emails: &[String],
) -> Vec<CandidateEmail> {
    let mut ordered: Vec<(String, String, PatternId, CandidateKind)> = Vec::new();

    for raw in seed_emails {
        let normalized = normalize_seed_email(raw);
        match normalized.split_once('@') {
            Some((local, domain)) if config.email_regex.is_match(&normalized) => ordered.push((
                local.to_string(),
                domain.to_string(),
                PatternId::Seeded,
                CandidateKind::Seeded,
            )),
            _ => {
                tracing::warn!("Dropping seed email with invalid format: '{}'", raw);
            }
        }
    }

    let tokens = name_tokens(&profile.name);
    if tokens.len() >= 2 {
        let first = &tokens[0];
        let last = &tokens[tokens.len() - 1];
        let parts = local_parts(first, last);
        let (named, bare): (Vec<_>, Vec<_>) = parts.into_iter().partition(|(p, _)| !p.is_bare());
        let work = work_domain(config, profile);

        for group in [&named, &bare] {
            if let Some(ref domain) = work {
                for (pattern, local) in group.iter() {
                    ordered.push((local.clone(), domain.clone(), *pattern, CandidateKind::Work));
                }
            }
            for (pattern, local) in group.iter() {
                for provider in &config.personal_providers {
                    ordered.push((
                        local.clone(),
                        provider.clone(),
                        *pattern,
                        CandidateKind::Personal,
                    ));
                }
            }
        }
    } else {
        tracing::debug!(
            "Name '{}' has fewer than two usable tokens; no name-based candidates.",
            profile.name
        );
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(ordered.len().min(config.max_candidates));
    for (local, domain, pattern, kind) in ordered {
        let candidate = CandidateEmail::new(&local, &domain, pattern, kind, candidates.len());
        if !config.email_regex.is_match(&candidate.full_address) {
            tracing::trace!("Generated pattern failed format validation: {}", candidate);
            continue;
        }
        if !seen.insert(candidate.full_address.clone()) {
            continue;
        }
        if candidates.len() == config.max_candidates {
            tracing::debug!(
                "Candidate cap of {} reached for '{}'; dropping remaining lower-priority patterns.",
                config.max_candidates,
                profile.name
            );
            break;
        }
        candidates.push(candidate);
    }

    tracing::debug!(
        "Generated {} unique candidates for '{}'",
        candidates.len(),
        profile.name
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigBuilder;

    fn test_config() -> Config {
        ConfigBuilder::new()
            .without_default_files()
            .build()
            .expect("Failed to build default config for test")
    }

    fn addresses(candidates: &[CandidateEmail]) -> Vec<&str> {
        candidates.iter().map(|c| c.full_address.as_str()).collect()
    }

    #[test]
    fn test_work_and_personal_candidates() {
        let config = test_config();
        let profile = PersonProfile::new("Jane Doe").with_company_domain("example-corp.com");
        let candidates = generate_candidates(&config, &profile, &[]);
        let emails = addresses(&candidates);

        assert_eq!(emails[0], "jane.doe@example-corp.com");
        assert!(emails.contains(&"janedoe@example-corp.com"));
        assert!(emails.contains(&"jane_doe@example-corp.com"));
        assert!(emails.contains(&"doe.jane@example-corp.com"));
        assert!(emails.contains(&"jdoe@example-corp.com"));
        assert!(emails.contains(&"janed@example-corp.com"));
        assert!(emails.contains(&"jane.doe@gmail.com"));
        assert!(emails.contains(&"jane@example-corp.com"));
        assert_eq!(candidates.len(), 40);
    }

    #[test]
    fn test_generation_order_work_then_personal_then_bare() {
        let config = test_config();
        let profile = PersonProfile::new("Jane Doe").with_company_domain("example-corp.com");
        let candidates = generate_candidates(&config, &profile, &[]);

        let first_personal = candidates
            .iter()
            .position(|c| c.kind == CandidateKind::Personal)
            .unwrap();
        let first_bare = candidates.iter().position(|c| c.pattern.is_bare()).unwrap();
        assert!(candidates[..first_personal]
            .iter()
            .all(|c| c.kind == CandidateKind::Work));
        assert!(first_personal < first_bare);
        assert!(candidates[first_bare..].iter().all(|c| c.pattern.is_bare()));
        for (i, c) in candidates.iter().enumerate() {
            assert_eq!(c.order, i);
        }
    }

    #[test]
    fn test_no_company_domain_yields_only_personal_candidates() {
        let config = test_config();
        let profile = PersonProfile::new("John Smith");
        let candidates = generate_candidates(&config, &profile, &[]);

        assert_eq!(candidates.len(), 32);
        let mut seen = HashSet::new();
        for c in &candidates {
            assert_eq!(c.kind, CandidateKind::Personal);
            assert!(config.personal_providers.contains(&c.domain));
            assert!(config.email_regex.is_match(&c.full_address));
            assert!(seen.insert(c.full_address.clone()), "duplicate {}", c);
        }
    }

    #[test]
    fn test_truncation_drops_bare_patterns_first() {
        let config = ConfigBuilder::new()
            .without_default_files()
            .max_candidates(30)
            .build()
            .unwrap();
        let profile = PersonProfile::new("Jane Doe").with_company_domain("example-corp.com");
        let candidates = generate_candidates(&config, &profile, &[]);

        assert_eq!(candidates.len(), 30);
        assert!(candidates.iter().all(|c| !c.pattern.is_bare()));
    }

    #[test]
    fn test_single_token_name_yields_nothing() {
        let config = test_config();
        let profile = PersonProfile::new("Madonna").with_company_domain("example-corp.com");
        assert!(generate_candidates(&config, &profile, &[]).is_empty());
        assert!(generate_candidates(&config, &PersonProfile::new("   "), &[]).is_empty());
    }

    #[test]
    fn test_duplicates_collapse_when_first_equals_last() {
        let config = ConfigBuilder::new()
            .without_default_files()
            .personal_providers(vec![])
            .build()
            .unwrap();
        let profile = PersonProfile::new("Test Test").with_company_domain("test.io");
        let candidates = generate_candidates(&config, &profile, &[]);
        let emails = addresses(&candidates);

        assert_eq!(
            emails,
            vec![
                "test.test@test.io",
                "testtest@test.io",
                "test_test@test.io",
                "ttest@test.io",
                "testt@test.io",
                "test@test.io",
            ]
        );
    }

    #[test]
    fn test_honorifics_and_suffixes_stripped() {
        assert_eq!(name_tokens("Dr. Jane  Doe Jr."), vec!["jane", "doe"]);
        assert_eq!(name_tokens("Jean-Luc O'Malley"), vec!["jean-luc", "omalley"]);
        assert_eq!(name_tokens("  John%$ "), vec!["john"]);
    }

    #[test]
    fn test_seed_emails_normalized_and_prepended() {
        let config = test_config();
        let profile = PersonProfile::new("Jane Doe");
        let seeds = vec![
            "Jane [at] Example-Corp [dot] com".to_string(),
            "not an email".to_string(),
            "jane.doe@gmail.com".to_string(),
        ];
        let candidates = generate_candidates(&config, &profile, &seeds);

        assert_eq!(candidates[0].full_address, "jane@example-corp.com");
        assert_eq!(candidates[0].kind, CandidateKind::Seeded);
        assert_eq!(candidates[1].full_address, "jane.doe@gmail.com");
        assert_eq!(candidates[1].pattern, PatternId::Seeded);
        let dupes = candidates
            .iter()
            .filter(|c| c.full_address == "jane.doe@gmail.com")
            .count();
        assert_eq!(dupes, 1);
    }

    #[test]
    fn test_company_domain_inference_is_opt_in() {
        let profile = PersonProfile::new("Ashley Garrison").with_company_name("Robinhood");

        let default_config = test_config();
        assert!(generate_candidates(&default_config, &profile, &[])
            .iter()
            .all(|c| c.kind == CandidateKind::Personal));

        let config = ConfigBuilder::new()
            .without_default_files()
            .infer_company_domain(true)
            .build()
            .unwrap();
        let candidates = generate_candidates(&config, &profile, &[]);
        assert_eq!(candidates[0].full_address, "ashley.garrison@robinhood.com");
        assert_eq!(candidates[0].kind, CandidateKind::Work);
    }

    #[test]
    fn test_company_domain_given_as_url() {
        let config = test_config();
        let profile =
            PersonProfile::new("Jane Doe").with_company_domain("https://www.example-corp.com/team");
        let candidates = generate_candidates(&config, &profile, &[]);
        assert_eq!(candidates[0].full_address, "jane.doe@example-corp.com");
    }
}
