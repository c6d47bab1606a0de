//! Library surface of the `scout` binary, split out so the CLI pieces can
//! be unit-tested.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
