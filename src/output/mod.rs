pub mod formatter;

pub use formatter::{formatter_for, OutputFormatter};
