//! Uploaded-document text extraction.
//!
//! Decodes a base64 data URL into raw bytes and dispatches on the declared
//! MIME type to one of three extractors. Each extractor returns an ordered
//! sequence of page/section text segments; the actual format parsing is
//! delegated to `pdf-extract` and `zip`. Extracted text lives only for the
//! duration of one request.

use std::io::{Cursor, Read};

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

use chatrelay_core::{Error, Result};

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Supported document formats, keyed by declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Pptx,
}

impl DocumentKind {
    pub fn from_mime(mime: &str) -> Result<Self> {
        match mime {
            PDF_MIME => Ok(Self::Pdf),
            DOCX_MIME => Ok(Self::Docx),
            PPTX_MIME => Ok(Self::Pptx),
            other => Err(Error::UnsupportedFileType(other.to_string())),
        }
    }
}

/// Decode a base64 file payload into raw bytes.
///
/// Accepts both full data URLs (`data:<mime>;base64,<payload>`) and bare
/// base64; browsers send the former.
pub fn decode_base64_file(payload: &str) -> Result<Vec<u8>> {
    let encoded = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };

    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::BadRequest(format!("invalid base64 file payload: {e}")))
}

/// Extract ordered text segments from an uploaded document.
///
/// PDF segments are pages, DOCX segments are paragraphs, PPTX segments are
/// slides. Unrecognized MIME types fail before any bytes are inspected.
pub fn extract_segments(bytes: &[u8], mime: &str) -> Result<Vec<String>> {
    let kind = DocumentKind::from_mime(mime)?;
    tracing::debug!("Extracting {:?} document ({} bytes)", kind, bytes.len());

    match kind {
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Pptx => extract_pptx(bytes),
    }
}

/// Flatten segments into the single `context` string the template receives.
pub fn flatten_segments(segments: &[String]) -> String {
    segments.join("\n\n")
}

// ---------------------------------------------------------------
// PDF
// ---------------------------------------------------------------

fn extract_pdf(bytes: &[u8]) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Extraction(format!("PDF parse error: {e}")))?;

    // pdf-extract separates pages with form feeds.
    let segments: Vec<String> = text
        .split('\u{0c}')
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect();

    Ok(segments)
}

// ---------------------------------------------------------------
// Office Open XML (DOCX / PPTX)
// ---------------------------------------------------------------

static DOCX_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").unwrap());
static PPTX_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a:t(?:\s[^>]*)?>([^<]*)</a:t>").unwrap());
static SLIDE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

/// One segment per `<w:p>` paragraph, text taken from its `<w:t>` runs.
fn extract_docx(bytes: &[u8]) -> Result<Vec<String>> {
    let xml = read_zip_entry(bytes, "word/document.xml")?;

    // Runs inside a paragraph carry their own spacing (xml:space), so they
    // concatenate directly.
    let segments = xml
        .split("</w:p>")
        .filter_map(|paragraph| {
            let text = collect_runs(&DOCX_RUN, paragraph, "");
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        })
        .collect();

    Ok(segments)
}

/// One segment per slide, in slide-number order, text from `<a:t>` runs.
fn extract_pptx(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = open_archive(bytes)?;

    let mut slides: Vec<(u32, String)> = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Extraction(format!("PPTX archive error: {e}")))?;

        let Some(caps) = SLIDE_NAME.captures(entry.name()) else {
            continue;
        };
        let number: u32 = caps[1]
            .parse()
            .map_err(|_| Error::Extraction(format!("bad slide name: {}", entry.name())))?;

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| Error::Extraction(format!("PPTX slide read error: {e}")))?;
        slides.push((number, xml));
    }

    slides.sort_by_key(|(number, _)| *number);

    // Slide runs come from separate shapes and text boxes; joined with a
    // space so titles and bullets don't fuse together.
    let segments = slides
        .into_iter()
        .filter_map(|(_, xml)| {
            let text = collect_runs(&PPTX_RUN, &xml, " ");
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        })
        .collect();

    Ok(segments)
}

fn open_archive(bytes: &[u8]) -> Result<zip::ZipArchive<Cursor<&[u8]>>> {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Extraction(format!("not a valid Office archive: {e}")))
}

fn read_zip_entry(bytes: &[u8], name: &str) -> Result<String> {
    let mut archive = open_archive(bytes)?;
    let mut entry = archive
        .by_name(name)
        .map_err(|e| Error::Extraction(format!("missing archive entry {name}: {e}")))?;

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| Error::Extraction(format!("archive entry {name} read error: {e}")))?;
    Ok(content)
}

/// Concatenate every text run captured by `pattern`.
fn collect_runs(pattern: &Regex, xml: &str, separator: &str) -> String {
    let runs: Vec<String> = pattern
        .captures_iter(xml)
        .map(|caps| unescape_xml(&caps[1]))
        .collect();
    runs.join(separator).trim().to_string()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let buf = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(buf);
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn decodes_data_url_payload() {
        let bytes = decode_base64_file("data:application/pdf;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn decodes_bare_base64() {
        assert_eq!(decode_base64_file("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn malformed_base64_is_a_bad_request() {
        let err = decode_base64_file("data:x;base64,???").unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn unsupported_mime_fails_before_parsing() {
        let err = extract_segments(b"anything", "text/csv").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(ref m) if m == "text/csv"));
    }

    #[test]
    fn docx_paragraphs_become_ordered_segments() {
        let xml = concat!(
            r#"<w:document><w:body>"#,
            r#"<w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t xml:space="preserve">Second </w:t></w:r>"#,
            r#"<w:r><w:t>half.</w:t></w:r></w:p>"#,
            r#"<w:p></w:p>"#,
            r#"</w:body></w:document>"#,
        );
        let bytes = build_archive(&[("word/document.xml", xml)]);

        let segments = extract_segments(&bytes, DOCX_MIME).unwrap();
        assert_eq!(segments, vec!["First paragraph.", "Second half."]);
    }

    #[test]
    fn docx_unescapes_entities() {
        let xml = r#"<w:p><w:r><w:t>Tom &amp; Jerry &lt;3</w:t></w:r></w:p>"#;
        let bytes = build_archive(&[("word/document.xml", xml)]);

        let segments = extract_segments(&bytes, DOCX_MIME).unwrap();
        assert_eq!(segments, vec!["Tom & Jerry <3"]);
    }

    #[test]
    fn pptx_slides_are_extracted_in_slide_order() {
        // Archive order is deliberately reversed; slide numbers win.
        let bytes = build_archive(&[
            (
                "ppt/slides/slide2.xml",
                r#"<p:sld><a:t>Second slide</a:t></p:sld>"#,
            ),
            (
                "ppt/slides/slide1.xml",
                r#"<p:sld><a:t>Title</a:t><a:t>slide</a:t></p:sld>"#,
            ),
            ("ppt/presentation.xml", "<p:presentation/>"),
        ]);

        let segments = extract_segments(&bytes, PPTX_MIME).unwrap();
        assert_eq!(segments, vec!["Title slide", "Second slide"]);
    }

    #[test]
    fn corrupt_archive_is_an_extraction_failure() {
        let err = extract_segments(b"not a zip", DOCX_MIME).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn corrupt_pdf_is_an_extraction_failure() {
        let err = extract_segments(b"not a pdf", PDF_MIME).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn flatten_joins_with_blank_lines() {
        let segments = vec!["one".to_string(), "two".to_string()];
        assert_eq!(flatten_segments(&segments), "one\n\ntwo");
    }
}
