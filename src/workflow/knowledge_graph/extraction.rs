//! Lightweight keyword/pattern-based entity extraction. Full NLP entity
//! extraction is out of scope (spec.md §1); this is the seam a proper NER
//! model would replace, grounded in the same closed-keyword-list approach
//! `CompetitorAnalyzerNode` uses for competitor detection.

use super::entity::{Entity, EntityKind};

const TECHNOLOGY_KEYWORDS: &[&str] = &[
    "cloud", "kubernetes", "aws", "azure", "gcp", "api", "microservices", "ai", "machine learning",
    "data lake", "data warehouse", "blockchain", "iot", "devops", "ci/cd", "saas",
];

const CHALLENGE_KEYWORDS: &[&str] = &[
    "legacy", "scalability", "downtime", "compliance", "security", "latency", "manual process",
    "fragmented", "silo", "outdated", "inefficient", "bottleneck",
];

/// Extracts a small set of entities from free text by scanning for a closed
/// keyword list, case-insensitive. Each hit becomes one entity; duplicates
/// collapse by normalized key.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let lower = text.to_lowercase();
    let mut seen = std::collections::HashSet::new();
    let mut entities = Vec::new();

    for keyword in TECHNOLOGY_KEYWORDS {
        if lower.contains(keyword) && seen.insert(keyword.to_string()) {
            entities.push(Entity::new(*keyword, EntityKind::Technology));
        }
    }
    for keyword in CHALLENGE_KEYWORDS {
        if lower.contains(keyword) && seen.insert(keyword.to_string()) {
            entities.push(Entity::new(*keyword, EntityKind::Challenge));
        }
    }
    entities
}
