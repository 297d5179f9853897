//! Resolution of media references (watch URLs or bare video ids) into
//! playable stream endpoints, backed by the external `yt-dlp` binary.
//!
//! The binary is treated as an opaque capability behind [`ResolverBackend`];
//! [`ResolverClient`] adds the per-call timeout and retry behavior, and
//! [`worker::resolve_reference`] combines normalization, metadata and
//! endpoint resolution for one reference.

pub mod backend;
pub mod client;
pub mod error;
pub mod normalize;
pub mod record;
pub mod worker;

pub use backend::{ResolverAuth, ResolverBackend, ResolverOutput, YtDlpRunner};
pub use client::{MinimalMeta, ResolverClient, RetryPolicy};
pub use error::ResolverError;
pub use normalize::normalize_reference;
pub use record::{ResolvedRecord, is_manifest_url};
pub use worker::{ResolveOptions, resolve_reference};
