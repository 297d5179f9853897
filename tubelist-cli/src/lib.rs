//! Library target for the `tubelist` package.
//!
//! The primary deliverable of this package is the `tubelist` CLI binary
//! (`src/main.rs`). This library exists so CI can run
//! `cargo test -p tubelist --doc` for feature/doctype validation.

#[doc(hidden)]
pub use ytdlp_resolver;
