//! Identity enrichment
//!
//! Maps the scanner's ephemeral technical id to a durable business
//! identity (stable identity, owning team, region). The derivation is
//! pure and deterministic so the pipeline can be tested without the
//! source or either sink.

use vulnpipe_common::{EnrichedFinding, Error, RawFinding, Result};

/// The derivation policy, injected as data
///
/// The real-world mapping from technical ids to business identities is
/// external; this rule stands in for it and is swappable without
/// touching the pipeline. `cardinality` is deliberately decoupled from
/// the size of the technical-id pool: many technical ids fold onto one
/// stable identity.
#[derive(Debug, Clone)]
pub struct IdentityRule {
    pub identity_prefix: String,
    pub cardinality: u32,
    pub owner_even: String,
    pub owner_odd: String,
    pub region_low: String,
    pub region_high: String,
    pub region_threshold: u32,
}

impl Default for IdentityRule {
    fn default() -> Self {
        Self {
            identity_prefix: "payment-service".to_string(),
            cardinality: 10,
            owner_even: "Checkout Team".to_string(),
            owner_odd: "Platform Team".to_string(),
            region_low: "us-east1".to_string(),
            region_high: "europe-west2".to_string(),
            region_threshold: 50,
        }
    }
}

/// Pure enrichment stage: no I/O, no shared state
#[derive(Debug, Clone)]
pub struct Enricher {
    rule: IdentityRule,
}

impl Enricher {
    pub fn new(rule: IdentityRule) -> Self {
        Self { rule }
    }

    /// Derive stable identity, owner and region from the technical id
    ///
    /// Fails only for a malformed technical id (no numeric suffix);
    /// the coordinator skips that single record and continues.
    pub fn enrich(&self, raw: &RawFinding) -> Result<EnrichedFinding> {
        let n = Self::numeric_suffix(&raw.technical_id)?;
        let rule = &self.rule;

        let stable_identity = format!("{}-{}", rule.identity_prefix, n % rule.cardinality);
        let owner = if n % 2 == 0 {
            rule.owner_even.clone()
        } else {
            rule.owner_odd.clone()
        };
        let region = if n < rule.region_threshold {
            rule.region_low.clone()
        } else {
            rule.region_high.clone()
        };

        Ok(EnrichedFinding {
            raw: raw.clone(),
            stable_identity,
            owner,
            region,
        })
    }

    fn numeric_suffix(technical_id: &str) -> Result<u32> {
        technical_id
            .rsplit('-')
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| {
                Error::Enrichment(format!(
                    "technical id has no numeric suffix: {:?}",
                    technical_id
                ))
            })
    }
}
