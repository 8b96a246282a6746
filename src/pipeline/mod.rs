//! Embed and extract orchestration.
//!
//! ```text
//! embed:   open -> scan chain -> check fit -> derive key -> seal -> frame -> append -> save
//! extract: open -> scan chain -> trial-decrypt each layer -> first verified payload
//! ```

mod embed;
mod engine;
mod extract;

pub use embed::EmbedReport;
pub use engine::StegoEngine;
