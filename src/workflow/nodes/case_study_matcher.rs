//! `CaseStudyMatcherNode` — part of the post-`challenge_extractor` parallel
//! fan-out. Entity-extracts the challenge text, asks the knowledge graph for
//! matching case studies, complements/falls back to semantic retrieval
//! filtered by industry, dedups by case-study id, and tags each match's
//! `source`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::knowledge_graph::{EntityKind, KnowledgeGraph};
use crate::workflow::nodes::support::Retriever;
use crate::workflow::state::{MatchingCaseStudy, WorkflowPatch, WorkflowSnapshotView};

const TOP_K: usize = 3;

pub struct CaseStudyMatcherNode {
    knowledge_graph: Arc<KnowledgeGraph>,
    retriever: Arc<dyn Retriever>,
}

impl CaseStudyMatcherNode {
    pub fn new(knowledge_graph: Arc<KnowledgeGraph>, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            knowledge_graph,
            retriever,
        }
    }
}

#[async_trait]
impl Node for CaseStudyMatcherNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let challenges = view.challenges();
        let project_id = view.project_id().unwrap_or_default();
        let challenge_text = challenges
            .iter()
            .map(|c| c.text.clone())
            .collect::<Vec<_>>()
            .join(". ");

        let extracted = KnowledgeGraph::extract_entities(&challenge_text);
        let query_entities: Vec<String> = extracted.iter().map(|e| e.key()).collect();
        let query_industry = extracted
            .iter()
            .find(|e| matches!(e.kind, EntityKind::Industry))
            .map(|e| e.name.clone());

        let mut matches: Vec<MatchingCaseStudy> = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();

        let graph_matches = self.knowledge_graph.find_matching_case_studies(
            &query_entities,
            query_industry.as_deref(),
            TOP_K,
        );
        for (id, score) in graph_matches {
            if !seen_ids.insert(id.clone()) {
                continue;
            }
            matches.push(MatchingCaseStudy {
                id: id.clone(),
                title: format!("Case study {id}"),
                industry: query_industry.clone().unwrap_or_default(),
                impact: String::new(),
                description: "Matched via knowledge graph entity overlap.".to_string(),
                score,
                source: "graph".to_string(),
            });
        }

        if matches.len() < TOP_K {
            let chunks = self
                .retriever
                .search(
                    project_id,
                    &challenge_text,
                    TOP_K * 2,
                    query_industry.as_deref(),
                )
                .await;
            for chunk in chunks {
                if matches.len() >= TOP_K {
                    break;
                }
                let surrogate_id = chunk.heading.clone();
                if surrogate_id.is_empty() || !seen_ids.insert(surrogate_id.clone()) {
                    continue;
                }
                matches.push(MatchingCaseStudy {
                    id: surrogate_id,
                    title: chunk.heading.clone(),
                    industry: query_industry.clone().unwrap_or_default(),
                    impact: String::new(),
                    description: chunk.content,
                    score: chunk.score,
                    source: "rag".to_string(),
                });
            }
        }

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(TOP_K);

        ctx.emit_node("case_study_matcher", format!("Matched {} case studies", matches.len()))
            .ok();

        Ok(WorkflowPatch::new("case_study_matcher")
            .set("matching_case_studies", serde_json::json!(matches))
            .with_log("success", &format!("Matched {} case studies", matches.len()))
            .build())
    }
}
