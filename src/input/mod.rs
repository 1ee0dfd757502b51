//! Input processing module
//! Handles file type detection and text extraction from document bytes

pub mod file_detector;
pub mod text_extractor;

pub use text_extractor::extract_lines;
