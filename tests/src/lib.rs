//! Test support for the replicore workspace.

pub mod fixtures;
