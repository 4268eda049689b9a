//! GraphQL-over-HTTP request runner
//!
//! - `batch`: request validation, serial/parallel partitioning and result assembly
//! - `single`: execution of one operation and error normalization

mod batch;
mod single;

pub use batch::run_http_query;
