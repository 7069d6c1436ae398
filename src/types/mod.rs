//! Type definitions

pub mod import_job;
pub mod import_result;
pub mod options;
pub mod progress;

pub use import_job::*;
pub use import_result::*;
pub use options::*;
pub use progress::*;
