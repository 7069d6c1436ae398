//! Email validation capability
//!
//! The batch processor only sees the [`EmailValidator`] trait; the built-in
//! [`HeuristicValidator`] is offline (syntax, disposable domains, role
//! accounts, typo detection). DNS/MX or API-backed validators plug in behind
//! the same trait without touching the processor.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ImportResultStatus, ValidationDetails};

/// Outcome of validating one email address. A malformed address is a normal
/// `Invalid` outcome, never an `Err` — errors are reserved for validator
/// infrastructure failures.
#[derive(Debug, Clone)]
pub struct EmailValidation {
    /// `Valid`, `Risky` or `Invalid`; the threshold comparison happens here
    /// so the batch processor stays policy-agnostic.
    pub status: ImportResultStatus,
    pub confidence_score: u8,
    pub details: ValidationDetails,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Pluggable validation capability.
#[async_trait]
pub trait EmailValidator: Send + Sync {
    /// Classify one address against the job's configured threshold.
    async fn validate(&self, email: &str, threshold: u8) -> Result<EmailValidation>;
}

// ==========================================================================
// Built-in heuristic validator
// ==========================================================================

static EMAIL_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("static email regex")
});

static DISPOSABLE_DOMAINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "mailinator.com",
        "guerrillamail.com",
        "tempmail.com",
        "throwawaymail.com",
        "10minutemail.com",
        "yopmail.com",
        "temp-mail.org",
        "maildrop.cc",
    ])
});

static ROLE_ACCOUNTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "admin",
        "info",
        "support",
        "sales",
        "contact",
        "help",
        "service",
        "webmaster",
        "postmaster",
        "hostmaster",
        "abuse",
    ])
});

static COMMON_TYPOS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("gmial.com", "gmail.com"),
        ("gamil.com", "gmail.com"),
        ("gmal.com", "gmail.com"),
        ("hotmial.com", "hotmail.com"),
        ("hotmal.com", "hotmail.com"),
        ("yaho.com", "yahoo.com"),
        ("outloo.com", "outlook.com"),
        ("iclou.com", "icloud.com"),
    ])
});

const MAX_EMAIL_LENGTH: usize = 254;

// Score deductions per failed check.
const DEDUCT_DISPOSABLE: i32 = 30;
const DEDUCT_ROLE_ACCOUNT: i32 = 20;
const DEDUCT_TYPO: i32 = 25;

/// Offline heuristic validator: syntax, disposable-domain and role-account
/// sets, common domain typos with corrective suggestions.
#[derive(Debug, Default)]
pub struct HeuristicValidator;

impl HeuristicValidator {
    pub fn new() -> Self {
        Self
    }

    fn classify(&self, email: &str, threshold: u8) -> EmailValidation {
        let mut details = ValidationDetails {
            provider: "heuristic".to_string(),
            ..ValidationDetails::default()
        };
        let mut issues = Vec::new();
        let mut suggestions = Vec::new();

        details.syntax_valid =
            email.len() <= MAX_EMAIL_LENGTH && EMAIL_SYNTAX.is_match(email);
        if !details.syntax_valid {
            issues.push("Invalid email format".to_string());
            return EmailValidation {
                status: ImportResultStatus::Invalid,
                confidence_score: 0,
                details,
                issues,
                suggestions,
            };
        }

        // Syntax already guarantees exactly one '@'.
        let (local_part, domain) = email.split_once('@').unwrap_or((email, ""));
        let domain = domain.to_lowercase();
        let local_part = local_part.to_lowercase();

        let mut score: i32 = 100;

        details.is_disposable = DISPOSABLE_DOMAINS.contains(domain.as_str());
        if details.is_disposable {
            issues.push("Disposable email address".to_string());
            score -= DEDUCT_DISPOSABLE;
        }

        details.is_role_account = ROLE_ACCOUNTS.contains(local_part.as_str());
        if details.is_role_account {
            issues.push("Role-based email address".to_string());
            score -= DEDUCT_ROLE_ACCOUNT;
        }

        if let Some(correct) = COMMON_TYPOS.get(domain.as_str()) {
            details.has_typos = true;
            issues.push("Possible typo in email address".to_string());
            suggestions.push(format!("Did you mean: {}@{}?", local_part, correct));
            score -= DEDUCT_TYPO;
        }

        let confidence_score = score.clamp(0, 100) as u8;
        let status = if confidence_score < threshold {
            ImportResultStatus::Risky
        } else {
            ImportResultStatus::Valid
        };

        EmailValidation {
            status,
            confidence_score,
            details,
            issues,
            suggestions,
        }
    }
}

#[async_trait]
impl EmailValidator for HeuristicValidator {
    async fn validate(&self, email: &str, threshold: u8) -> Result<EmailValidation> {
        Ok(self.classify(email, threshold))
    }
}
