/// The layout engine: text store, shaping, line breaking and placement.
pub mod layout;
mod line;
mod run;
mod store;

pub use layout::{LineInfo, TextLayout};
