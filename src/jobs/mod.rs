// Job storage and the analysis workflow
pub mod orchestrator;
pub mod store;

pub use orchestrator::{AnalysisRequest, Orchestrator, WorkflowError};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
