//! Core relay logic for noterelay.
//!
//! This crate ties the enrichment lookups, note composition, and note
//! write-back into one pipeline (`pipeline::relay_event`).

pub mod http;
pub mod magnitude;
pub mod note;
pub mod pipeline;
