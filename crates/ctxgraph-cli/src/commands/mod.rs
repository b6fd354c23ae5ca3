//! CLI command implementations

pub mod info;
pub mod match_cmd;
pub mod paths;
pub mod sample;
pub mod sweep;
