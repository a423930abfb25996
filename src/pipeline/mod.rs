//! Pipeline stages for text formatting and image post-processing.
//!
//! Each submodule implements exactly one transformation step, so every stage
//! is testable on its own and a backend can be swapped without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ segment ──▶ page ─────────▶ postprocess
//! (path)    (pdfium)    (pages)     filter/spelling  (enclosures)
//!                                   rewrap
//!
//! extract ──▶ images ──▶ dedup
//!  (dump)     (rename)   (pHash)
//! ```
//!
//! 1. [`input`]   : validate the local path and choose the backend
//! 2. [`extract`] : page-delimited raw text; blocking, so run in `spawn_blocking`
//! 3. [`segment`] : split on the page-break marker, keeping blank pages
//! 4. [`page`]    : per-page chain built from [`filter`], [`spelling`] and
//!    [`rewrap`]; fanned out by [`dispatch`]
//! 5. [`postprocess`]: join pages and apply enclosure rules
//! 6. [`images`]  : discover, [`dedup`], re-encode and rename extracted images

pub mod dedup;
pub mod dispatch;
pub mod extract;
pub mod filter;
pub mod images;
pub mod input;
pub mod page;
pub mod postprocess;
pub mod rewrap;
pub mod segment;
pub mod spelling;
