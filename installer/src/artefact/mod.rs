//! Artefact retrieval, integrity verification and extraction.
//!
//! These are the three stages that turn a manifest's URL into files on disk
//! that the installer can place:
//!
//! - [`download`] - Platform check, fetch trait and `ureq` implementation.
//! - [`verification`] - Streaming SHA-256 computation and comparison.
//! - [`extraction`] - Format detection, traversal-safe unpacking and the
//!   staging directory.
//!
//! Every stage owns its temporary directory through `tempfile`, so dropping
//! the returned value removes it on success and failure alike.

pub mod download;
pub mod extraction;
pub mod verification;
