pub mod classify;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod report;
pub mod resolve;
pub mod session;

// Convenience re-exports (optional, but nice)
pub use classify::{Classify, FileCommand, MediaType};
pub use config::{ConfigState, RunType, Settings};
pub use dispatch::Plan;
pub use report::Report;
pub use resolve::{resolve, Resolved};
pub use session::{prepare, Request};
