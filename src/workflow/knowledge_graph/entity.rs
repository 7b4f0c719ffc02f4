//! Entity/relationship types the knowledge graph is built from.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Challenge,
    Solution,
    Technology,
    Industry,
    Organization,
    Metric,
    Other,
}

impl EntityKind {
    /// Challenge/solution/technology entities weigh more heavily in
    /// case-study matching, per spec.md's §4.3 scoring rule.
    pub fn match_weight(self) -> f32 {
        match self {
            EntityKind::Challenge | EntityKind::Solution | EntityKind::Technology => 1.5,
            _ => 1.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub metadata: FxHashMap<String, String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            metadata: FxHashMap::default(),
        }
    }

    /// Normalized key used for dedup/lookup: lowercase, trimmed.
    pub fn key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Addresses,
    AddressedBy,
    RequiresTechnology,
    UsedIn,
    BelongsToIndustry,
    HasIndustry,
    DeliveredBy,
    Delivered,
}

impl RelationshipKind {
    /// The inverse relationship kind materialized alongside the forward
    /// edge, so `find_related` can walk in either direction.
    pub fn reverse(self) -> RelationshipKind {
        match self {
            RelationshipKind::Addresses => RelationshipKind::AddressedBy,
            RelationshipKind::AddressedBy => RelationshipKind::Addresses,
            RelationshipKind::RequiresTechnology => RelationshipKind::UsedIn,
            RelationshipKind::UsedIn => RelationshipKind::RequiresTechnology,
            RelationshipKind::BelongsToIndustry => RelationshipKind::HasIndustry,
            RelationshipKind::HasIndustry => RelationshipKind::BelongsToIndustry,
            RelationshipKind::DeliveredBy => RelationshipKind::Delivered,
            RelationshipKind::Delivered => RelationshipKind::DeliveredBy,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    pub strength: f32,
}
