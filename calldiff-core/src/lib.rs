//! calldiff core library: call classification, reporting and batch runs.
//!
//! The main entry point is [`pipeline::DiffPipeline`], which parses two
//! versions of a source file, matches their trees, derives an edit script
//! and reports the function calls it adds, removes or renames.

pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod locate;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod signature;

pub use classify::{ChangeEvent, Classification, classify, classify_script};
pub use locate::locate_calls;
pub use report::{emit, report, report_all};
pub use signature::{CallSignature, extract_signature};
