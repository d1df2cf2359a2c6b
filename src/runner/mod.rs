mod command;
mod completion;
mod dispatcher;
mod job;
mod orchestrator;

pub use command::build_command;
pub use completion::is_complete;
pub use dispatcher::JobStatus;
pub use job::JOB_LOG_FILE;
pub use orchestrator::{BatchPlan, Orchestrator, RunOptions};
