//! # Render Pipeline
//!
//! Turns a stored carousel into one PNG per slide.
//!
//! ## Sub-modules:
//! - `placeholder`: substitutes slide values into template markup.
//! - `validate`: upload-time grammar checks and target size selection.
//! - `raster`: markup to PNG, with a deadline and a fallback image.
//! - `content`: where rendered bytes are kept and served from.
//! - `batch`: walks the slides of a carousel in order and records outcomes.

pub mod batch;
pub mod content;
pub mod placeholder;
pub mod raster;
pub mod validate;
