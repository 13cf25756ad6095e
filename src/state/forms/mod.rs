//! Text input state for the credential prompt and the filter editor

mod field;

pub use field::FormField;
