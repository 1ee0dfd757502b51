//! File type detection

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    /// Pre-2007 binary Word format, recognised only to reject it early
    LegacyDoc,
    Unknown,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => FileType::Pdf,
            "docx" => FileType::Docx,
            "doc" => FileType::LegacyDoc,
            _ => FileType::Unknown,
        }
    }

    pub fn from_filename(filename: &str) -> Self {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileType::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, FileType::Pdf | FileType::Docx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_is_case_insensitive() {
        assert_eq!(FileType::from_filename("cv.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_filename("Jane Doe.Docx"), FileType::Docx);
        assert_eq!(FileType::from_filename("old.doc"), FileType::LegacyDoc);
        assert_eq!(FileType::from_filename("notes.txt"), FileType::Unknown);
        assert_eq!(FileType::from_filename("README"), FileType::Unknown);
        assert!(!FileType::LegacyDoc.is_supported());
    }
}
