//! Chunking, index building and background job tracking

mod jobs;
mod splitter;
mod transform;
mod worker;

pub use jobs::{JobStatus, JobStore, UploadJob};
pub use splitter::{TextSplitter, WindowSplitter};
pub use transform::TransformationPipeline;
pub use worker::{
    checkpoint, process_upload_background, run_job_sweeper, run_pipeline, UploadOutcome,
};
