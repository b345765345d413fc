// src/checker/mod.rs
// =============================================================================
// This module contains all image link checking logic.
//
// Submodules:
// - probe: decides whether ONE url loads as an image (HTTP, data: URLs)
// - validator: runs probes for a whole document set and keeps the tally
//
// This file (mod.rs) is the module root - it re-exports the public API so
// callers write `checker::LinkValidator` instead of
// `checker::validator::LinkValidator`.
// =============================================================================

mod probe;
mod validator;

pub use probe::{HttpImageProber, ImageProber};
pub use validator::{
    ImageCheck, ImageLinkStatus, ImageStats, LinkValidator, ValidationRun, ValidatorSettings,
};

#[cfg(test)]
pub use probe::ProbeOutcome;
