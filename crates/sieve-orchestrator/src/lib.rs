//! # sieve-orchestrator
//!
//! Composes `sieve-scoring`'s pure functions and `sieve-store`'s
//! persistence trait into the single `score_invoice` call that backs
//! `POST /scoreInvoice`.
//!
//! No component above this crate needs to know the order operations run
//! in, or how candidate feature extraction is parallelized — it submits a
//! payload and gets a [`ScoreResult`] back.

mod pipeline;
mod types;

pub use pipeline::score_invoice;
pub use types::{Explanation, ScoreResult};
