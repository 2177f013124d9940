//! Data types flowing through the discovery pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{Duration, SystemTime};

/// The person an email address is being searched for.
///
/// Supplied by upstream profile extraction. Only `name` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonProfile {
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    /// Pre-resolved organisational domain, e.g. `example-corp.com`.
    #[serde(default)]
    pub company_domain: Option<String>,
    /// Handle the profile was extracted from. Only used for logging.
    #[serde(default)]
    pub source_identifier: Option<String>,
}

impl PersonProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_company_name(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = Some(company_name.into());
        self
    }

    pub fn with_company_domain(mut self, company_domain: impl Into<String>) -> Self {
        self.company_domain = Some(company_domain.into());
        self
    }

    pub fn with_source_identifier(mut self, source: impl Into<String>) -> Self {
        self.source_identifier = Some(source.into());
        self
    }

    /// Short label used to prefix log lines for this profile.
    pub(crate) fn label(&self) -> String {
        match (&self.source_identifier, &self.company_domain) {
            (Some(source), _) => format!("{} ({})", self.name.trim(), source),
            (None, Some(domain)) => format!("{}@{}", self.name.trim(), domain),
            (None, None) => self.name.trim().to_string(),
        }
    }
}

/// One unit of work: a profile plus optional hand-authored guesses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRequest {
    #[serde(flatten)]
    pub profile: PersonProfile,
    #[serde(default)]
    pub seed_emails: Vec<String>,
}

impl From<PersonProfile> for ProfileRequest {
    fn from(profile: PersonProfile) -> Self {
        Self {
            profile,
            seed_emails: Vec::new(),
        }
    }
}

/// The generation rule that produced a candidate local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternId {
    /// `first.last`
    FirstDotLast,
    /// `firstlast`
    FirstLast,
    /// `first_last`
    FirstUnderscoreLast,
    /// `last.first`
    LastDotFirst,
    /// `flast`
    InitialLast,
    /// `firstl`
    FirstInitial,
    /// bare `first`
    First,
    /// bare `last`
    Last,
    /// Supplied by the caller rather than generated.
    Seeded,
}

impl PatternId {
    /// Single-name patterns; lowest priority when truncating.
    pub fn is_bare(self) -> bool {
        matches!(self, PatternId::First | PatternId::Last)
    }
}

/// Where a candidate's domain came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Work,
    Personal,
    Seeded,
}

/// A generated, unverified guess at an address.
///
/// Identity is `full_address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEmail {
    pub local_part: String,
    pub domain: String,
    pub full_address: String,
    pub pattern: PatternId,
    pub kind: CandidateKind,
    /// Position in generation order; used to break ranking ties.
    pub order: usize,
}

impl CandidateEmail {
    pub fn new(
        local_part: &str,
        domain: &str,
        pattern: PatternId,
        kind: CandidateKind,
        order: usize,
    ) -> Self {
        let local_part = local_part.trim().to_lowercase();
        let domain = domain.trim().to_lowercase();
        let full_address = format!("{}@{}", local_part, domain);
        Self {
            local_part,
            domain,
            full_address,
            pattern,
            kind,
            order,
        }
    }

    /// Splits a full address into a candidate. Returns `None` when there is
    /// no single `@` with text on both sides.
    pub fn from_address(
        address: &str,
        pattern: PatternId,
        kind: CandidateKind,
        order: usize,
    ) -> Option<Self> {
        let (local, domain) = address.trim().split_once('@')?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return None;
        }
        Some(Self::new(local, domain, pattern, kind, order))
    }
}

impl fmt::Display for CandidateEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Valid,
    Invalid,
    Unknown,
}

/// Which DNS tier decided a domain verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    MxRecord,
    AddressRecord,
    Unresolvable,
}

/// Domain-level answer to "can this domain receive mail".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainVerdict {
    pub domain: String,
    pub status: DomainStatus,
    pub method: ResolutionMethod,
    /// Host to contact for handshake and port probes.
    pub mail_host: Option<String>,
    pub observed_at: SystemTime,
}

impl DomainVerdict {
    pub fn via_mx(domain: &str, exchange: &str) -> Self {
        Self {
            domain: domain.to_string(),
            status: DomainStatus::Valid,
            method: ResolutionMethod::MxRecord,
            mail_host: Some(exchange.trim_end_matches('.').to_lowercase()),
            observed_at: SystemTime::now(),
        }
    }

    /// Address-only domains receive mail on the domain itself (implicit MX).
    pub fn via_address(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            status: DomainStatus::Valid,
            method: ResolutionMethod::AddressRecord,
            mail_host: Some(domain.to_string()),
            observed_at: SystemTime::now(),
        }
    }

    pub fn unresolvable(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            status: DomainStatus::Invalid,
            method: ResolutionMethod::Unresolvable,
            mail_host: None,
            observed_at: SystemTime::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == DomainStatus::Valid
    }
}

/// How a candidate's deliverability was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    KnownProvider,
    DomainResolved,
    SmtpAccepted,
    PortReachable,
    DomainFailed,
}

impl VerificationMethod {
    pub fn is_positive(self) -> bool {
        !matches!(self, VerificationMethod::DomainFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VerificationMethod::KnownProvider => "known_provider",
            VerificationMethod::DomainResolved => "domain_resolved",
            VerificationMethod::SmtpAccepted => "smtp_accepted",
            VerificationMethod::PortReachable => "port_reachable",
            VerificationMethod::DomainFailed => "domain_failed",
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one candidate. Immutable once built; `can_receive` is
/// derived from `method` so the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    candidate: CandidateEmail,
    can_receive: bool,
    method: VerificationMethod,
    detail: String,
}

impl VerificationResult {
    pub fn new(candidate: CandidateEmail, method: VerificationMethod, detail: String) -> Self {
        Self {
            candidate,
            can_receive: method.is_positive(),
            method,
            detail,
        }
    }

    pub fn failed(candidate: CandidateEmail, detail: String) -> Self {
        Self::new(candidate, VerificationMethod::DomainFailed, detail)
    }

    pub fn candidate(&self) -> &CandidateEmail {
        &self.candidate
    }

    pub fn can_receive(&self) -> bool {
        self.can_receive
    }

    pub fn method(&self) -> VerificationMethod {
        self.method
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTag {
    Work,
    Personal,
    Seeded,
}

/// A scored candidate, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEmail {
    pub email: String,
    pub confidence: u8,
    /// `None` when the candidate was never probed before the deadline.
    pub method: Option<VerificationMethod>,
    pub can_receive: bool,
    pub tags: Vec<EmailTag>,
    pub pattern: PatternId,
    #[serde(skip)]
    pub(crate) order: usize,
}

impl RankedEmail {
    pub fn has_tag(&self, tag: EmailTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// The chosen address plus runners-up. `best == None` means "none found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailSelection {
    pub best: Option<RankedEmail>,
    pub alternatives: Vec<RankedEmail>,
}

impl EmailSelection {
    pub fn none_found() -> Self {
        Self::default()
    }

    pub fn is_found(&self) -> bool {
        self.best.is_some()
    }
}

/// Everything the orchestrator observed during one run.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub results: Vec<VerificationResult>,
    pub verdicts: HashMap<String, DomainVerdict>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl VerificationReport {
    pub fn result_for(&self, address: &str) -> Option<&VerificationResult> {
        self.results
            .iter()
            .find(|r| r.candidate().full_address == address)
    }
}

/// Per-profile outcome handed to display logic.
#[derive(Debug, Clone, Serialize)]
pub struct FindResult {
    pub profile: PersonProfile,
    pub candidates_generated: usize,
    pub candidates_verified: usize,
    pub ranked_emails: Vec<RankedEmail>,
    pub selection: EmailSelection,
    pub timed_out: bool,
    pub elapsed_ms: u64,
    pub verification_log: BTreeMap<String, String>,
}

impl FindResult {
    /// Placeholder for a profile whose processing aborted before producing a
    /// result. The reason is kept under the `error` log key.
    pub fn failed(profile: PersonProfile, reason: impl Into<String>) -> Self {
        Self {
            profile,
            candidates_generated: 0,
            candidates_verified: 0,
            ranked_emails: Vec::new(),
            selection: EmailSelection::none_found(),
            timed_out: false,
            elapsed_ms: 0,
            verification_log: BTreeMap::from([("error".to_string(), reason.into())]),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.selection.best.as_ref().map(|b| b.email.as_str())
    }

    pub fn confidence(&self) -> Option<u8> {
        self.selection.best.as_ref().map(|b| b.confidence)
    }
}
