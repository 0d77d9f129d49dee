//! Journal lines and the journal builder.

pub mod builder;
pub mod line;

pub use builder::{AccountResolver, JournalBuilder};
pub use line::{AccountRef, JournalLine, Side};
