//! Library half of the `tfs` binary: argument definitions and command
//! implementations, kept out of `main` so they can be tested.

pub mod args;
pub mod commands;
