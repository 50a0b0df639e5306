//! `helperlib` driver: inspect the helper export table and self-check the
//! helpers against the reference host.
pub mod cli;
pub mod commands;
