//! Shared helpers for the process-level tests.
//!
//! Note: `helpers/mod.rs` rather than `helpers.rs`, because Cargo compiles
//! every top-level `.rs` file in `tests/` as its own test binary.

pub mod fake_xsdb;
