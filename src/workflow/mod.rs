//! Generation workflows: single job, batch and chain.

mod batch;
mod chain;
mod job;
mod runner;

pub use batch::{print_summary, run_batch, BatchReport};
pub use chain::{offer_concat, run_chain, ChainReport};
pub use job::{GenerationJob, JobOutcome, JobState};
pub use runner::{file_timestamp, format_size, preview, run_job, video_path};
