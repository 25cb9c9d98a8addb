//! # slicer-pipeline
//!
//! Everything between an accepted input file and a downloadable batch.
//!
//! - **[`validate`]** -- pure type and size checks on a candidate file.
//! - **[`SegmentPipeline`]** -- one split run: engine readiness, segmentation,
//!   naming, progress milestones, publication of the batch.
//! - **[`SegmentStore`]** -- transient content handles for produced segments.
//! - **[`build_archive`]** -- bundle a batch into a single ZIP.

pub mod archive;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod validator;

pub use archive::{build_archive, Archive};
pub use pipeline::SegmentPipeline;
pub use progress::ProgressTracker;
pub use store::SegmentStore;
pub use validator::{check_type, validate, validate_with_limit, Rejection};
