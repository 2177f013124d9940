//! Confidence scoring and best-address selection.

use crate::core::config::Config;
use crate::core::models::{
    CandidateEmail, CandidateKind, EmailSelection, EmailTag, RankedEmail, VerificationReport,
};
use crate::utils::domain::domain_matches;

const NAME_MATCH_SCORE: i32 = 30;
const KNOWN_PROVIDER_SCORE: i32 = 45;
const RESOLVED_DOMAIN_SCORE: i32 = 40;
const STRICT_FORMAT_SCORE: i32 = 20;
const ORGANISATION_DOMAIN_SCORE: i32 = 60;
const MAX_CONFIDENCE: i32 = 100;

/// Placeholder mailboxes and reserved domains that never belong to a person.
pub(crate) fn is_denylisted(config: &Config, candidate: &CandidateEmail) -> bool {
    config
        .denylist_local_parts
        .iter()
        .any(|part| candidate.local_part.contains(part.as_str()))
        || config
            .denylist_domains
            .iter()
            .any(|domain| domain_matches(&candidate.domain, domain))
}

fn tags_for(config: &Config, candidate: &CandidateEmail, organisation: Option<&str>) -> Vec<EmailTag> {
    match candidate.kind {
        CandidateKind::Work => vec![EmailTag::Work],
        CandidateKind::Personal => vec![EmailTag::Personal],
        CandidateKind::Seeded => {
            let mut tags = vec![EmailTag::Seeded];
            if organisation.is_some_and(|org| candidate.domain.eq_ignore_ascii_case(org)) {
                tags.push(EmailTag::Work);
            } else if config
                .personal_providers
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&candidate.domain))
            {
                tags.push(EmailTag::Personal);
            }
            tags
        }
    }
}

/// Scores every candidate and returns the survivors, highest confidence
/// first with ties kept in generation order.
///
/// Excluded: denylisted candidates, candidates whose domain was found
/// unresolvable, and anything scoring zero. Candidates the orchestrator never
/// reached are scored on what is known and carry no method.
pub(crate) fn rank_candidates(
    config: &Config,
    candidates: &[CandidateEmail],
    report: &VerificationReport,
    name_tokens: &[String],
    organisation: Option<&str>,
) -> Vec<RankedEmail> {
    let mut ranked: Vec<RankedEmail> = candidates
        .iter()
        .filter_map(|candidate| {
            if is_denylisted(config, candidate) {
                tracing::debug!("Excluding denylisted candidate {}", candidate);
                return None;
            }

            let verdict = report.verdicts.get(&candidate.domain);
            if verdict.is_some_and(|v| !v.is_valid()) {
                return None;
            }
            let result = report.result_for(&candidate.full_address);

            let mut score = 0;
            if name_tokens
                .iter()
                .any(|token| token.len() > 1 && candidate.local_part.contains(token.as_str()))
            {
                score += NAME_MATCH_SCORE;
            }
            if config.is_known_provider(&candidate.domain) {
                score += KNOWN_PROVIDER_SCORE;
            } else if verdict.is_some_and(|v| v.is_valid()) {
                score += RESOLVED_DOMAIN_SCORE;
            }
            if config.email_regex.is_match(&candidate.full_address) {
                score += STRICT_FORMAT_SCORE;
            }
            if organisation.is_some_and(|org| candidate.domain.eq_ignore_ascii_case(org)) {
                score += ORGANISATION_DOMAIN_SCORE;
            }

            let confidence = score.clamp(0, MAX_CONFIDENCE) as u8;
            if confidence == 0 {
                return None;
            }

            Some(RankedEmail {
                email: candidate.full_address.clone(),
                confidence,
                method: result.map(|r| r.method()),
                can_receive: result.is_some_and(|r| r.can_receive()),
                tags: tags_for(config, candidate, organisation),
                pattern: candidate.pattern,
                order: candidate.order,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.confidence.cmp(&a.confidence).then(a.order.cmp(&b.order)));
    ranked
}

/// Best = highest-ranked deliverable entry, falling back to the top entry.
/// Alternatives are the next `max_alternatives` entries after it.
pub(crate) fn select_best(ranked: &[RankedEmail], max_alternatives: usize) -> EmailSelection {
    let Some(best_index) = ranked
        .iter()
        .position(|r| r.can_receive)
        .or_else(|| (!ranked.is_empty()).then_some(0))
    else {
        return EmailSelection::none_found();
    };

    let alternatives = ranked
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best_index)
        .map(|(_, r)| r.clone())
        .take(max_alternatives)
        .collect();

    EmailSelection {
        best: Some(ranked[best_index].clone()),
        alternatives,
    }
}
