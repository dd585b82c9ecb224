// Module declarations
pub mod analysis;
pub mod github;
pub mod patterns;
pub mod settings;

// Re-export commonly used types
pub use analysis::{
    BlockConvention, FailedTest, LogAnalyzer, NameRule, StatusRule, TestSummary,
    WorkflowRunAnalysis,
};
pub use github::{analyze_workflow_run, GitHubAction, GitHubApi, GitHubRepo};
