//! # Email Hunter Core Library
//!
//! Generates likely email addresses for a person from their name and
//! (optionally) their organisation's domain, verifies each candidate with
//! DNS, an SMTP recipient handshake and mail-port reachability, and ranks the
//! survivors by confidence.
//!
//! It is designed to be used either directly as a library or via the
//! `email-hunter` command-line tool (which uses this library). Network access
//! goes through the [`DnsLookup`], [`HandshakeProbe`] and [`PortProbe`]
//! traits, so callers can substitute their own backends with
//! [`EmailFinder::with_backends`].

mod core;
mod utils;
mod verification;

pub use crate::core::config::{Config, ConfigBuilder, ConfigFile, ProbeMode};
pub use crate::core::error::{AppError, LookupError, ProbeError, Result};
pub use crate::core::finder::EmailFinder;
pub use crate::core::models::{
    CandidateEmail, CandidateKind, DomainStatus, DomainVerdict, EmailSelection, EmailTag,
    FindResult, PatternId, PersonProfile, ProfileRequest, RankedEmail, ResolutionMethod,
    VerificationMethod, VerificationResult,
};
pub use crate::utils::dns::{DnsLookup, MailServer};
pub use crate::utils::ports::PortProbe;
pub use crate::utils::smtp::HandshakeProbe;

use crate::utils::smtp::test_smtp_connectivity;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

/// Builds an [`EmailFinder`] backed by the system resolver (or the configured
/// name servers), a `lettre` SMTP prober and plain TCP port checks.
pub async fn initialize_finder(config: &Config) -> Result<EmailFinder> {
    EmailFinder::new(config).await
}

/// Performs an early check for outbound SMTP (port 25) connectivity.
pub async fn check_smtp_connectivity() -> Result<()> {
    test_smtp_connectivity().await
}

/// Processes a single profile to find an email address.
///
/// Missing data never fails the call: a profile that yields no candidates
/// comes back with an empty ranking and no selection.
pub async fn find_single_email(finder: &EmailFinder, request: ProfileRequest) -> FindResult {
    let task_id = request.profile.label();
    tracing::info!(target: "find_single_email", "[{}] Starting processing.", task_id);

    let result = finder.find_email(&request).await;

    match result.email() {
        Some(email) => tracing::info!(target: "find_single_email",
            "[{}] ✓ Found likely email: {} (Confidence: {}/100)",
            task_id, email, result.confidence().unwrap_or(0)),
        None => tracing::info!(target: "find_single_email", "[{}] No email found.", task_id),
    }
    result
}

/// Processes a batch of profiles with at most `config.max_profile_concurrency`
/// profiles in flight. Results are returned in input order.
pub async fn process_profiles(
    config: Arc<Config>,
    finder: Arc<EmailFinder>,
    requests: Vec<ProfileRequest>,
) -> Vec<FindResult> {
    let total_records = requests.len();
    if total_records == 0 {
        return Vec::new();
    }

    let max_in_flight = config.max_profile_concurrency.max(1);
    let profiles: Vec<PersonProfile> = requests.iter().map(|r| r.profile.clone()).collect();
    let mut tasks = FuturesUnordered::new();
    let mut finished: Vec<(usize, FindResult)> = Vec::with_capacity(total_records);

    for (index, request) in requests.into_iter().enumerate() {
        while tasks.len() >= max_in_flight {
            if let Some(join_handle_result) = tasks.next().await {
                match join_handle_result {
                    Ok(indexed_result) => finished.push(indexed_result),
                    Err(e) => tracing::error!("A processing task failed to join: {}", e),
                }
            } else {
                tracing::warn!("Task queue unexpectedly empty while limiting concurrency.");
                break;
            }
        }

        let finder_clone = Arc::clone(&finder);
        tasks.push(tokio::spawn(async move {
            (index, find_single_email(&finder_clone, request).await)
        }));
    }

    while let Some(join_handle_result) = tasks.next().await {
        match join_handle_result {
            Ok(indexed_result) => finished.push(indexed_result),
            Err(e) => tracing::error!("A processing task failed to join during final drain: {}", e),
        }
    }

    assemble_in_order(profiles, finished)
}

/// Places finished results at their input index. Profiles whose task never
/// reported back get a [`FindResult::failed`] entry, so the output always
/// matches the input in length and order.
fn assemble_in_order(
    profiles: Vec<PersonProfile>,
    finished: Vec<(usize, FindResult)>,
) -> Vec<FindResult> {
    let mut slots: Vec<Option<FindResult>> = profiles.iter().map(|_| None).collect();
    for (index, result) in finished {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    slots
        .into_iter()
        .zip(profiles)
        .map(|(slot, profile)| {
            slot.unwrap_or_else(|| {
                tracing::warn!("[{}] Processing task aborted; recording an empty result.", profile.label());
                FindResult::failed(profile, "Processing task aborted before completion")
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(name: &str) -> FindResult {
        FindResult {
            elapsed_ms: 5,
            ..FindResult::failed(PersonProfile::new(name), "unused")
        }
    }

    #[test]
    fn test_assemble_in_order_fills_aborted_profiles() {
        let profiles = vec![
            PersonProfile::new("Jane Doe"),
            PersonProfile::new("John Smith"),
            PersonProfile::new("Alan Turing"),
        ];
        let results = assemble_in_order(
            profiles,
            vec![(2, finished("Alan Turing")), (0, finished("Jane Doe"))],
        );

        let names: Vec<&str> = results.iter().map(|r| r.profile.name.as_str()).collect();
        assert_eq!(names, ["Jane Doe", "John Smith", "Alan Turing"]);
        assert_eq!(results[0].elapsed_ms, 5);
        assert_eq!(results[2].elapsed_ms, 5);

        let aborted = &results[1];
        assert!(aborted.ranked_emails.is_empty());
        assert!(!aborted.selection.is_found());
        assert!(aborted.verification_log.contains_key("error"));
    }
}
