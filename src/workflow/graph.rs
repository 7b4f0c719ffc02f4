//! Wires the eleven agent nodes into the canonical RFP proposal graph:
//! an `analyzer` entry point, a parallel fan-out over discovery/value/
//! case-study/competitor nodes, an outline + human-approval gate, and a
//! critic/refine cycle bounded by `OrchestratorConfig`.
//!
//! ```text
//! Start -> analyzer
//! analyzer --[challenges_selected]--> challenge_extractor
//!         --[else]--> proposal_builder
//! challenge_extractor --> {discovery_question, value_proposition,
//!                          case_study_matcher, competitor_analyzer}
//! {discovery_question, value_proposition, case_study_matcher,
//!  competitor_analyzer} --> outline_generator
//! outline_generator --> human_approval
//! human_approval --[should_continue_after_approval]--> proposal_builder
//! proposal_builder --> critic
//! critic --[should_continue_refinement == "end"]--> End
//!        --[else == "refine"]--> refine --> critic
//! ```

use std::sync::Arc;

use crate::graphs::{EdgePredicate, GraphBuilder, GraphCompileError};
use crate::reducers::Reducer;
use crate::types::{ChannelType, NodeKind};
use crate::workflow::config::OrchestratorConfig;
use crate::workflow::knowledge_graph::KnowledgeGraph;
use crate::workflow::llm::LlmGateway;
use crate::workflow::nodes::support::Retriever;
use crate::workflow::nodes::{
    AnalyzerNode, CaseStudyMatcherNode, ChallengeExtractorNode, CompetitorAnalyzerNode,
    CriticNode, DiscoveryQuestionNode, HumanApprovalNode, OutlineGeneratorNode,
    ProposalBuilderNode, RefineNode, ValuePropositionNode,
};
use crate::workflow::reducer::WorkflowReducer;
use crate::workflow::state::WorkflowSnapshotView;

fn node(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

/// `selected_tasks.get("challenges")` is `true` or absent (default-enabled).
fn challenges_selected(view: &WorkflowSnapshotView) -> bool {
    view.challenges_selected()
}

/// Blocking variant: pauses at `human_approval` via
/// `StepOptions::interrupt_before` until `WorkflowManager::approve_outline`
/// moves `outline_approved` to `Approved`. The predicate itself only ever
/// routes forward; the pause is enforced by the caller supplying
/// `interrupt_before([human_approval])` while the gate is closed.
fn should_continue_after_approval(view: &WorkflowSnapshotView, require_approval: bool) -> bool {
    !require_approval || view.outline_approved().is_approved()
}

/// `"end"` if there is no draft, the critic score has cleared the
/// threshold, or the iteration cap is reached; otherwise `"refine"`.
fn should_continue_refinement(
    view: &WorkflowSnapshotView,
    score_threshold: f32,
    max_iterations: u32,
) -> &'static str {
    let Some(_) = view.proposal_draft() else {
        return "end";
    };
    let score = view.critic_score().unwrap_or(0.0);
    if score >= score_threshold || view.refinement_iterations() >= max_iterations {
        "end"
    } else {
        "refine"
    }
}

/// Collaborators every node in the canonical graph needs, constructor-
/// injected so the graph module owns no LLM/retrieval/knowledge-graph
/// wiring of its own.
pub struct GraphDeps {
    pub llm: Arc<dyn LlmGateway>,
    pub retriever: Arc<dyn Retriever>,
    pub knowledge_graph: Arc<KnowledgeGraph>,
}

/// Builds the compiled RFP proposal workflow graph, wiring every node and
/// edge guard against `config`.
pub fn build_rfp_graph(
    deps: GraphDeps,
    config: &OrchestratorConfig,
) -> Result<crate::app::App, GraphCompileError> {
    let GraphDeps {
        llm,
        retriever,
        knowledge_graph,
    } = deps;

    let analyzer = node("analyzer");
    let challenge_extractor = node("challenge_extractor");
    let discovery_question = node("discovery_question");
    let value_proposition = node("value_proposition");
    let case_study_matcher = node("case_study_matcher");
    let competitor_analyzer = node("competitor_analyzer");
    let outline_generator = node("outline_generator");
    let human_approval = node("human_approval");
    let proposal_builder = node("proposal_builder");
    let critic = node("critic");
    let refine = node("refine");

    let challenges_route = {
        let challenge_extractor = challenge_extractor.clone();
        let proposal_builder = proposal_builder.clone();
        let predicate: EdgePredicate = Arc::new(move |snapshot| {
            let view = WorkflowSnapshotView::new(&snapshot);
            let target = if challenges_selected(&view) {
                &challenge_extractor
            } else {
                &proposal_builder
            };
            vec![target.to_string_name()]
        });
        predicate
    };

    let require_outline_approval = config.require_outline_approval;
    let approval_route = {
        let proposal_builder = proposal_builder.clone();
        let human_approval = human_approval.clone();
        let predicate: EdgePredicate = Arc::new(move |snapshot| {
            let view = WorkflowSnapshotView::new(&snapshot);
            let target = if should_continue_after_approval(&view, require_outline_approval) {
                &proposal_builder
            } else {
                &human_approval
            };
            vec![target.to_string_name()]
        });
        predicate
    };

    let score_threshold = config.score_threshold;
    let max_iterations = config.max_refinement_iterations;
    let refinement_route = {
        let refine = refine.clone();
        let predicate: EdgePredicate = Arc::new(move |snapshot| {
            let view = WorkflowSnapshotView::new(&snapshot);
            match should_continue_refinement(&view, score_threshold, max_iterations) {
                "refine" => vec![refine.to_string_name()],
                _ => vec!["End".to_string()],
            }
        });
        predicate
    };

    GraphBuilder::new()
        .add_node(analyzer.clone(), AnalyzerNode::new(llm.clone(), retriever.clone(), config.use_long_context))
        .add_node(challenge_extractor.clone(), ChallengeExtractorNode::new(llm.clone()))
        .add_node(discovery_question.clone(), DiscoveryQuestionNode::new(llm.clone()))
        .add_node(value_proposition.clone(), ValuePropositionNode::new(llm.clone()))
        .add_node(
            case_study_matcher.clone(),
            CaseStudyMatcherNode::new(knowledge_graph.clone(), retriever.clone()),
        )
        .add_node(
            competitor_analyzer.clone(),
            CompetitorAnalyzerNode::new(config.enable_competitor_analysis),
        )
        .add_node(outline_generator.clone(), OutlineGeneratorNode::new(llm.clone()))
        .add_node(human_approval.clone(), HumanApprovalNode)
        .add_node(proposal_builder.clone(), ProposalBuilderNode::new(llm.clone()))
        .add_node(
            critic.clone(),
            CriticNode::new(llm.clone(), config.max_refinement_iterations, config.score_threshold),
        )
        .add_node(refine.clone(), RefineNode::new(llm, config.max_refinement_iterations))
        .add_edge(NodeKind::Start, analyzer.clone())
        .add_conditional_edge(analyzer, challenges_route)
        .add_edge(challenge_extractor.clone(), discovery_question.clone())
        .add_edge(challenge_extractor.clone(), value_proposition.clone())
        .add_edge(challenge_extractor.clone(), case_study_matcher.clone())
        .add_edge(challenge_extractor, competitor_analyzer.clone())
        .add_edge(discovery_question, outline_generator.clone())
        .add_edge(value_proposition, outline_generator.clone())
        .add_edge(case_study_matcher, outline_generator.clone())
        .add_edge(competitor_analyzer, outline_generator.clone())
        .add_edge(outline_generator, human_approval.clone())
        .add_conditional_edge(human_approval, approval_route)
        .add_edge(proposal_builder, critic.clone())
        .add_conditional_edge(critic.clone(), refinement_route)
        .add_edge(refine, critic)
        .with_reducer(ChannelType::Extra, Arc::new(WorkflowReducer) as Arc<dyn Reducer>)
        .compile()
}

trait NodeKindName {
    fn to_string_name(&self) -> String;
}

impl NodeKindName for NodeKind {
    fn to_string_name(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(name) => name.clone(),
        }
    }
}
