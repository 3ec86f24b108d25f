//! Fatal build errors.
//!
//! Degenerate geometry is never an error: a bad lot or block is logged and
//! skipped so the visible effect is a missing building, not a failed run.
//! The conditions below abort the whole build instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TownError {
    #[error("cell count {0} is out of range (need 5..=200)")]
    TooFewCells(usize),

    #[error("tessellation produced no usable regions after {0} attempts")]
    NoUsableRegions(usize),

    #[error("walled area yielded no gates")]
    NoGates,
}
