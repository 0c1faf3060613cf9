//! Near-duplicate detection and per-domain quotas.

use std::collections::{BTreeMap, HashSet};
use sha2::{Digest, Sha256};
use acc_core::ContentRecord;
use crate::urls::domain_of;

pub const SIMILARITY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MAX_PER_DOMAIN: usize = 5;

const SUMMARY_PREFIX_CHARS: usize = 100;
const MIN_CONTAINED_TITLE_CHARS: usize = 20;
const MIN_COMPARED_SUMMARY_CHARS: usize = 50;

/// What an accepted record has in common with a new one.
#[derive(Debug, Clone, PartialEq)]
pub enum Similarity {
    SameTitle,
    ContainedTitle,
    SimilarSummary(f64),
    SameKeyPoints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFingerprint {
    title: String,
    summary_start: String,
    key_points_hash: Option<String>,
}

impl ContentFingerprint {
    pub fn of(record: &ContentRecord) -> Self {
        let key_points_hash = (!record.key_points.is_empty()).then(|| {
            let joined = record.key_points.join("\n").to_lowercase();
            format!("{:x}", Sha256::digest(joined.as_bytes()))
        });
        Self {
            title: record.title.trim().to_lowercase(),
            summary_start: record
                .summary
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .chars()
                .take(SUMMARY_PREFIX_CHARS)
                .collect(),
            key_points_hash,
        }
    }

    pub fn compare(&self, other: &Self) -> Option<Similarity> {
        if !self.title.is_empty() && self.title == other.title {
            return Some(Similarity::SameTitle);
        }

        let (a, b) = (&self.title, &other.title);
        if a.chars().count() > MIN_CONTAINED_TITLE_CHARS
            && b.chars().count() > MIN_CONTAINED_TITLE_CHARS
            && (a.contains(b.as_str()) || b.contains(a.as_str()))
        {
            return Some(Similarity::ContainedTitle);
        }

        if self.summary_start.chars().count() > MIN_COMPARED_SUMMARY_CHARS
            && other.summary_start.chars().count() > MIN_COMPARED_SUMMARY_CHARS
        {
            let score = jaccard_similarity(&self.summary_start, &other.summary_start);
            if score > SIMILARITY_THRESHOLD {
                return Some(Similarity::SimilarSummary(score));
            }
        }

        match (&self.key_points_hash, &other.key_points_hash) {
            (Some(a), Some(b)) if a == b => Some(Similarity::SameKeyPoints),
            _ => None,
        }
    }
}

/// Word-set overlap of two texts, from 0.0 to 1.0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

#[derive(Debug, Default)]
pub struct DuplicateDetector {
    seen: Vec<ContentFingerprint>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first way `record` resembles something already accepted.
    pub fn check(&self, record: &ContentRecord) -> Option<Similarity> {
        let fingerprint = ContentFingerprint::of(record);
        self.seen.iter().find_map(|seen| fingerprint.compare(seen))
    }

    pub fn remember(&mut self, record: &ContentRecord) {
        self.seen.push(ContentFingerprint::of(record));
    }
}

/// Accepted records per domain, capped so no single site dominates a run.
#[derive(Debug, Clone)]
pub struct DomainQuota {
    max_per_domain: usize,
    counts: BTreeMap<String, usize>,
}

impl Default for DomainQuota {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_DOMAIN)
    }
}

impl DomainQuota {
    pub fn new(max_per_domain: usize) -> Self {
        Self {
            max_per_domain,
            counts: BTreeMap::new(),
        }
    }

    pub fn max_per_domain(&self) -> usize {
        self.max_per_domain
    }

    pub fn count(&self, url: &str) -> usize {
        domain_of(url)
            .and_then(|d| self.counts.get(&d).copied())
            .unwrap_or(0)
    }

    /// URLs without a parseable domain are always allowed.
    pub fn allows(&self, url: &str) -> bool {
        self.count(url) < self.max_per_domain
    }

    pub fn record(&mut self, url: &str) {
        if let Some(domain) = domain_of(url) {
            *self.counts.entry(domain).or_insert(0) += 1;
        }
    }

    /// Domains at or one short of the cap.
    pub fn overrepresented(&self) -> Vec<String> {
        let threshold = self.max_per_domain.saturating_sub(1);
        self.counts
            .iter()
            .filter(|(_, count)| **count >= threshold)
            .map(|(domain, _)| domain.clone())
            .collect()
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }
}
