//! Process-wide, read-mostly knowledge graph over case studies. Seeded once
//! at startup from persisted case-study records; read concurrently by
//! `CaseStudyMatcherNode` via `find_matching_case_studies`.
//!
//! Single-writer/multiple-reader via `parking_lot::RwLock`, matching §5's
//! concurrency note (seeding is the only writer; matching only reads).

mod entity;
mod extraction;

pub use entity::{Entity, EntityKind, Relationship, RelationshipKind};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// The subset of a persisted case study's fields the knowledge graph seeds
/// entities from.
#[derive(Clone, Debug)]
pub struct CaseStudySeed {
    pub id: String,
    pub title: String,
    pub industry: String,
    pub description: String,
    pub project_description: String,
    pub impact: String,
}

struct GraphInner {
    entities: FxHashMap<String, Entity>,
    adjacency: FxHashMap<String, Vec<Relationship>>,
    case_study_entities: FxHashMap<String, Vec<String>>,
    case_study_industry: FxHashMap<String, String>,
}

impl GraphInner {
    fn new() -> Self {
        Self {
            entities: FxHashMap::default(),
            adjacency: FxHashMap::default(),
            case_study_entities: FxHashMap::default(),
            case_study_industry: FxHashMap::default(),
        }
    }

    fn upsert_entity(&mut self, entity: Entity) -> String {
        let key = entity.key();
        self.entities.entry(key.clone()).or_insert(entity);
        key
    }

    fn link(&mut self, source: &str, target: &str, kind: RelationshipKind, strength: f32) {
        self.adjacency
            .entry(source.to_string())
            .or_default()
            .push(Relationship {
                source: source.to_string(),
                target: target.to_string(),
                kind,
                strength,
            });
        self.adjacency
            .entry(target.to_string())
            .or_default()
            .push(Relationship {
                source: target.to_string(),
                target: source.to_string(),
                kind: kind.reverse(),
                strength,
            });
    }
}

pub struct KnowledgeGraph {
    inner: RwLock<GraphInner>,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GraphInner::new()),
        }
    }

    /// Seeds the graph from persisted case studies: entity extraction runs
    /// over each case study's concatenated text fields, entities and
    /// relationships are inserted under the case study's id, and the
    /// industry is recorded for the match-multiplier step.
    pub fn seed(&self, case_studies: &[CaseStudySeed]) {
        let mut inner = self.inner.write();
        for cs in case_studies {
            let text = format!(
                "{} {} {} {} {}",
                cs.title, cs.industry, cs.description, cs.project_description, cs.impact
            );
            let extracted = extraction::extract_entities(&text);
            let mut keys = Vec::with_capacity(extracted.len());
            for entity in extracted {
                let key = inner.upsert_entity(entity);
                keys.push(key);
            }
            // Link all pairs within the same case study so a BFS from any
            // one of them can reach the rest within max_depth=2.
            for i in 0..keys.len() {
                for j in (i + 1)..keys.len() {
                    inner.link(&keys[i], &keys[j], RelationshipKind::Addresses, 1.0);
                }
            }
            inner
                .case_study_industry
                .insert(cs.id.clone(), cs.industry.clone());
            inner.case_study_entities.insert(cs.id.clone(), keys);
        }
    }

    /// Breadth-first walk from `entity_key` out to `max_depth` hops,
    /// returning every entity reached (excluding the start entity itself).
    pub fn find_related(&self, entity_key: &str, max_depth: u32) -> Vec<Entity> {
        let inner = self.inner.read();
        let start = entity_key.trim().to_lowercase();
        let mut visited: FxHashSet<String> = FxHashSet::default();
        visited.insert(start.clone());
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        queue.push_back((start, 0));
        let mut results = Vec::new();

        while let Some((key, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(edges) = inner.adjacency.get(&key) else {
                continue;
            };
            for edge in edges {
                if visited.insert(edge.target.clone()) {
                    if let Some(entity) = inner.entities.get(&edge.target) {
                        results.push(entity.clone());
                    }
                    queue.push_back((edge.target.clone(), depth + 1));
                }
            }
        }
        results
    }

    /// Expands each query entity to depth 2, groups candidate case studies
    /// by weighted entity-type overlap (challenge/solution/technology
    /// weigh 1.5, else 1.0; an industry match multiplies the total by
    /// 1.5), and returns case study ids sorted by descending weight.
    pub fn find_matching_case_studies(
        &self,
        query_entities: &[String],
        query_industry: Option<&str>,
        top_k: usize,
    ) -> Vec<(String, f32)> {
        let inner = self.inner.read();

        let mut expanded: FxHashSet<String> = FxHashSet::default();
        for entity_key in query_entities {
            let key = entity_key.trim().to_lowercase();
            expanded.insert(key.clone());
            for related in self.find_related(&key, 2) {
                expanded.insert(related.key());
            }
        }

        let mut scored: Vec<(String, f32)> = Vec::new();
        for (cs_id, cs_entities) in &inner.case_study_entities {
            let mut weight = 0.0f32;
            for entity_key in cs_entities {
                if expanded.contains(entity_key) {
                    if let Some(entity) = inner.entities.get(entity_key) {
                        weight += entity.kind.match_weight();
                    }
                }
            }
            if weight <= 0.0 {
                continue;
            }
            if let (Some(industry), Some(q)) =
                (inner.case_study_industry.get(cs_id), query_industry)
            {
                if industry.eq_ignore_ascii_case(q) {
                    weight *= 1.5;
                }
            }
            scored.push((cs_id.clone(), weight));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    pub fn extract_entities(text: &str) -> Vec<Entity> {
        extraction::extract_entities(text)
    }
}
