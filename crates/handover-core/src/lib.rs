pub mod config;
pub mod error;
pub mod handler;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod policy;
pub mod probe;
pub mod registry;
pub mod report;
pub mod store;
pub mod types;

pub use error::{Result, WorkflowError};
