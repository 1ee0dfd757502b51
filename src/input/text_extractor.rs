//! Text extraction from PDF and DOCX byte streams

use crate::error::{Result, ResumeParserError};
use crate::input::file_detector::FileType;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

pub trait TextExtractor {
    /// Trimmed, non-empty lines in reading order
    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Turn raw document bytes into a line sequence, choosing the format by extension
pub fn extract_lines(bytes: &[u8], filename: &str) -> Result<Vec<String>> {
    let file_type = FileType::from_filename(filename);

    match file_type {
        FileType::LegacyDoc => {
            return Err(ResumeParserError::UnsupportedFormat(format!(
                "legacy .doc files are not supported, convert '{}' to .docx",
                filename
            )))
        }
        FileType::Unknown => {
            return Err(ResumeParserError::UnsupportedFormat(format!(
                "'{}' is not a .pdf or .docx file",
                filename
            )))
        }
        FileType::Pdf | FileType::Docx => {}
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        log::debug!("{} is empty, no lines extracted", filename);
        return Ok(Vec::new());
    }

    let lines = match file_type {
        FileType::Pdf => PdfExtractor.extract(bytes)?,
        _ => DocxExtractor.extract(bytes)?,
    };

    log::info!("Extracted {} lines from {}", lines.len(), filename);
    Ok(lines)
}

fn into_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run of non-blank lines on a page
#[derive(Debug, Clone, PartialEq, Eq)]
struct TextBlock {
    page: usize,
    ordinal: usize,
    lines: Vec<String>,
}

pub struct PdfExtractor;

impl PdfExtractor {
    /// Split extracted text into visual blocks: pages on form feeds, blocks on blank lines.
    ///
    /// pdf-extract reports no coordinates, so blocks come out in stream order,
    /// which is already (page, ordinal) order.
    fn blocks(text: &str) -> Vec<TextBlock> {
        let mut blocks = Vec::new();

        for (page, page_text) in text.split('\x0C').enumerate() {
            let mut current: Vec<String> = Vec::new();
            let mut ordinal = 0;

            for line in page_text.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    if !current.is_empty() {
                        blocks.push(TextBlock {
                            page,
                            ordinal,
                            lines: std::mem::take(&mut current),
                        });
                        ordinal += 1;
                    }
                } else {
                    current.push(trimmed.to_string());
                }
            }

            if !current.is_empty() {
                blocks.push(TextBlock {
                    page,
                    ordinal,
                    lines: current,
                });
            }
        }

        blocks
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>> {
        // pdf-extract panics on some malformed inputs instead of returning an error
        let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| ResumeParserError::DocumentRead("PDF parser panicked on malformed input".to_string()))?
            .map_err(|e| ResumeParserError::DocumentRead(format!("Failed to extract text from PDF: {}", e)))?;

        let blocks = Self::blocks(&text);
        log::debug!("PDF produced {} text blocks", blocks.len());

        Ok(blocks.into_iter().flat_map(|b| b.lines).collect())
    }
}

pub struct DocxExtractor;

/// Paragraph and table state while streaming `word/document.xml`
#[derive(Default)]
struct DocxWalker {
    output: Vec<String>,
    paragraph: String,
    in_text: bool,
    rows: Vec<Vec<String>>,
    cells: Vec<String>,
}

impl DocxWalker {
    fn start(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = true,
            b"p" => self.paragraph.clear(),
            b"tr" => self.rows.push(Vec::new()),
            b"tc" => self.cells.push(String::new()),
            _ => self.empty(name),
        }
    }

    fn empty(&mut self, name: &[u8]) {
        match name {
            b"tab" => self.paragraph.push(' '),
            b"br" | b"cr" => self.paragraph.push('\n'),
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"p" => {
                let paragraph = std::mem::take(&mut self.paragraph);
                match self.cells.last_mut() {
                    Some(cell) => {
                        let text = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
                        if !text.is_empty() {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(&text);
                        }
                    }
                    None => self.output.extend(into_lines(&paragraph)),
                }
            }
            b"tc" => {
                if let Some(cell) = self.cells.pop() {
                    if let Some(row) = self.rows.last_mut() {
                        row.push(cell);
                    }
                }
            }
            b"tr" => {
                if let Some(row) = self.rows.pop() {
                    let line = row
                        .into_iter()
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect::<Vec<_>>()
                        .join(" | ");
                    if line.is_empty() {
                        return;
                    }
                    // Nested tables flatten into the enclosing cell
                    match self.cells.last_mut() {
                        Some(cell) => {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(&line);
                        }
                        None => self.output.push(line),
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_text {
            self.paragraph.push_str(text);
        }
    }
}

impl DocxExtractor {
    fn document_xml(bytes: &[u8]) -> Result<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ResumeParserError::DocumentRead(format!("Not a valid DOCX container: {}", e)))?;

        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ResumeParserError::DocumentRead(format!("DOCX has no word/document.xml: {}", e)))?;

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| ResumeParserError::DocumentRead(format!("Failed to read document.xml: {}", e)))?;
        Ok(xml)
    }

    fn walk(xml: &str) -> Result<Vec<String>> {
        let mut reader = Reader::from_str(xml);
        let mut walker = DocxWalker::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => walker.start(e.local_name().as_ref()),
                Ok(Event::Empty(e)) => walker.empty(e.local_name().as_ref()),
                Ok(Event::End(e)) => walker.end(e.local_name().as_ref()),
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| ResumeParserError::DocumentRead(format!("Invalid XML text: {}", e)))?;
                    walker.text(&text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ResumeParserError::DocumentRead(format!(
                        "Malformed document.xml at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            }
        }

        Ok(walker.output)
    }
}

impl TextExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let xml = Self::document_xml(bytes)?;
        Self::walk(&xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Jane</w:t></w:r><w:r><w:t xml:space="preserve"> Doe</w:t></w:r></w:p>
    <w:p><w:r><w:t>Austin, TX</w:t><w:tab/><w:t>jane@example.com</w:t></w:r></w:p>
    <w:p></w:p>
    <w:p><w:r><w:t>SKILLS</w:t><w:br/><w:t>Rust &amp; Go</w:t></w:r></w:p>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Acme</w:t></w:r></w:p></w:tc>
        <w:tc><w:p></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>Engineer</w:t></w:r></w:p><w:p><w:r><w:t>Remote</w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
  </w:body>
</w:document>"#;

    #[test]
    fn test_docx_walk_paragraphs_and_tables() {
        let lines = DocxExtractor::walk(DOCUMENT).unwrap();
        assert_eq!(
            lines,
            vec![
                "Jane Doe",
                "Austin, TX jane@example.com",
                "SKILLS",
                "Rust & Go",
                "Acme | Engineer Remote",
            ]
        );
    }

    #[test]
    fn test_pdf_blocks_follow_page_then_position() {
        let text = "Jane Doe\nEngineer\n\n\nEXPERIENCE\n  Acme  \n\x0CEDUCATION\nMIT\n";
        let blocks = PdfExtractor::blocks(text);

        assert_eq!(blocks.len(), 3);
        assert_eq!((blocks[0].page, blocks[0].ordinal), (0, 0));
        assert_eq!(blocks[1].lines, vec!["EXPERIENCE", "Acme"]);
        assert_eq!((blocks[2].page, blocks[2].ordinal), (1, 0));
    }

    #[test]
    fn test_unsupported_extensions() {
        assert!(matches!(
            extract_lines(b"data", "resume.doc"),
            Err(ResumeParserError::UnsupportedFormat(msg)) if msg.contains(".docx")
        ));
        assert!(matches!(
            extract_lines(b"", "resume.txt"),
            Err(ResumeParserError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_empty_bytes_yield_no_lines() {
        assert!(extract_lines(b"", "resume.pdf").unwrap().is_empty());
        assert!(extract_lines(b"  \n\t", "resume.docx").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_docx_is_a_read_error() {
        assert!(matches!(
            extract_lines(b"not a zip archive", "resume.docx"),
            Err(ResumeParserError::DocumentRead(_))
        ));
    }
}
