//! Per-step agent node implementations for the RFP workflow graph.

pub mod analyzer;
pub mod case_study_matcher;
pub mod challenge_extractor;
pub mod competitor_analyzer;
pub mod critic;
pub mod discovery_question;
pub mod human_approval;
pub mod outline_generator;
pub mod proposal_builder;
pub mod refine;
pub mod support;
pub mod value_proposition;

pub use analyzer::AnalyzerNode;
pub use case_study_matcher::CaseStudyMatcherNode;
pub use challenge_extractor::ChallengeExtractorNode;
pub use competitor_analyzer::CompetitorAnalyzerNode;
pub use critic::CriticNode;
pub use discovery_question::DiscoveryQuestionNode;
pub use human_approval::HumanApprovalNode;
pub use outline_generator::OutlineGeneratorNode;
pub use proposal_builder::ProposalBuilderNode;
pub use refine::RefineNode;
pub use value_proposition::ValuePropositionNode;
