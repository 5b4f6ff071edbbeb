//! gatherlens library
//!
//! Offline investigation of cluster diagnostic captures: a repository layer
//! over the capture's on-disk manifest tree, derived report views for
//! autoscaling state, and the rendering/serving glue around them.

pub mod capture;
pub mod cli;
pub mod csr;
pub mod render;
pub mod report;
pub mod server;

// Re-export the types most callers need
pub use capture::resource::{Pod, Resource};
pub use capture::{Capture, CaptureError};
pub use report::{ReportContext, build as build_report};
