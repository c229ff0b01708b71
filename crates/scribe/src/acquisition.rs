//! Turning user-supplied sources into raw text: uploaded documents, URLs and
//! keywords. Network access goes through the [`PageSource`] seam so callers
//! decide how pages are fetched.

use log::debug;
use std::path::Path;
use url::Url;

use crate::errors::{Result, ScribeError};
use crate::extractor::{extract_article_text, PageSource};
use crate::style::InputMode;

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Uploads above this size are refused before decoding.
pub const MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

/// What the user handed in for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    File {
        bytes: Vec<u8>,
        mime: Option<String>,
        file_name: Option<String>,
    },
    Url(String),
    Keywords(String),
    /// English article URL for translate-and-develop
    EnglishUrl(String),
}

impl SourceInput {
    pub fn mode(&self) -> InputMode {
        match self {
            SourceInput::File { .. } => InputMode::File,
            SourceInput::Url(_) => InputMode::Url,
            SourceInput::Keywords(_) => InputMode::Keywords,
            SourceInput::EnglishUrl(_) => InputMode::TranslateAndDevelop,
        }
    }

    /// Reads a file from disk, declaring its type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| ScribeError::ReadFailure(format!("{}: {}", path.display(), e)))?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(SourceInput::File {
            mime: file_name.as_deref().and_then(mime_from_name).map(str::to_string),
            bytes,
            file_name,
        })
    }
}

/// The document kinds the file mode understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
}

fn mime_from_name(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    if lower.ends_with(".txt") {
        Some(MIME_TEXT)
    } else if lower.ends_with(".pdf") {
        Some(MIME_PDF)
    } else if lower.ends_with(".docx") {
        Some(MIME_DOCX)
    } else {
        None
    }
}

/// Declared MIME type first, then file extension, then magic bytes.
pub fn detect_kind(bytes: &[u8], mime: Option<&str>, file_name: Option<&str>) -> Result<DocumentKind> {
    let declared = mime
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    let resolved = declared.or_else(|| file_name.and_then(mime_from_name).map(str::to_string));

    match resolved.as_deref() {
        Some(MIME_TEXT) => return Ok(DocumentKind::PlainText),
        Some(MIME_PDF) => return Ok(DocumentKind::Pdf),
        Some(MIME_DOCX) => return Ok(DocumentKind::Docx),
        Some(other) => return Err(ScribeError::UnsupportedFormat(other.to_string())),
        None => {}
    }

    if bytes.starts_with(b"%PDF-") {
        Ok(DocumentKind::Pdf)
    } else if bytes.starts_with(b"PK\x03\x04") {
        Ok(DocumentKind::Docx)
    } else if std::str::from_utf8(bytes).is_ok() {
        Ok(DocumentKind::PlainText)
    } else {
        Err(ScribeError::UnsupportedFormat(
            file_name.unwrap_or("unknown file").to_string(),
        ))
    }
}

/// Extracted text of an uploaded document.
pub fn extract_file_text(bytes: &[u8], mime: Option<&str>, file_name: Option<&str>) -> Result<String> {
    if bytes.len() > MAX_FILE_BYTES {
        return Err(ScribeError::ReadFailure(format!(
            "file is {} bytes, limit is {}",
            bytes.len(),
            MAX_FILE_BYTES
        )));
    }

    let kind = detect_kind(bytes, mime, file_name)?;
    debug!("Extracting {:?} ({} bytes)", kind, bytes.len());

    let text = match kind {
        DocumentKind::PlainText => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| ScribeError::ReadFailure(format!("file is not valid UTF-8: {}", e)))?;
            text.trim_start_matches('\u{feff}').to_string()
        }
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ScribeError::ReadFailure(format!("PDF parsing failed: {}", e)))?,
        DocumentKind::Docx => {
            let docx = docx_rs::read_docx(bytes)
                .map_err(|e| ScribeError::ReadFailure(format!("DOCX parsing failed: {}", e)))?;
            docx_text(&docx)
        }
    };

    if text.trim().is_empty() {
        return Err(ScribeError::EmptyExtraction);
    }

    Ok(text)
}

fn docx_text(docx: &docx_rs::Docx) -> String {
    let mut out = String::new();

    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                let line = paragraph_text(para);
                if !line.trim().is_empty() {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    if let docx_rs::TableChild::TableRow(row) = row {
                        let mut cells = Vec::new();
                        for cell in &row.cells {
                            if let docx_rs::TableRowChild::TableCell(cell) = cell {
                                let text = cell
                                    .children
                                    .iter()
                                    .filter_map(|content| match content {
                                        docx_rs::TableCellContent::Paragraph(para) => {
                                            Some(paragraph_text(para).trim().to_string())
                                        }
                                        _ => None,
                                    })
                                    .filter(|t| !t.is_empty())
                                    .collect::<Vec<_>>()
                                    .join(" ");
                                cells.push(text);
                            }
                        }
                        out.push_str(&cells.join("\t"));
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }

    out.trim().to_string()
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut line = String::new();
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => run_text(run, &mut line),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        run_text(run, &mut line);
                    }
                }
            }
            docx_rs::ParagraphChild::Insert(ins) => {
                for inner in &ins.children {
                    if let docx_rs::InsertChild::Run(run) = inner {
                        run_text(run, &mut line);
                    }
                }
            }
            _ => {}
        }
    }
    line
}

fn run_text(run: &docx_rs::Run, out: &mut String) {
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(t) => out.push_str(&t.text),
            docx_rs::RunChild::Tab(_) => out.push('\t'),
            docx_rs::RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

/// Rejects blank input with `NoInput`, naming what was missing.
pub fn require_text<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ScribeError::NoInput(what.to_string()));
    }
    Ok(trimmed)
}

/// Parses an http(s) URL or fails with `InvalidUrl`.
pub fn validate_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|e| ScribeError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ScribeError::InvalidUrl(format!(
                "unsupported scheme {} in {}",
                other, trimmed
            )))
        }
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(ScribeError::InvalidUrl(format!("{} has no host", trimmed)));
    }
    Ok(url)
}

/// Input-shape checks shared by every mode. Never touches the network.
pub fn validate(input: &SourceInput) -> Result<()> {
    match input {
        // A selected but empty file is left for extraction to report
        SourceInput::File { bytes, file_name, .. } => {
            if bytes.is_empty() && file_name.is_none() {
                return Err(ScribeError::NoInput(
                    "ဖိုင် အကြောင်းအရာ မရှိပါ သို့မဟုတ် ဖတ်မရပါ".to_string(),
                ));
            }
        }
        SourceInput::Url(url) => {
            require_text(url, "URL")?;
            validate_url(url)?;
        }
        SourceInput::EnglishUrl(url) => {
            require_text(url, "အင်္ဂလိပ် URL")?;
            validate_url(url)?;
        }
        SourceInput::Keywords(keywords) => {
            require_text(keywords, "သော့ချက်စာလုံး")?;
        }
    }
    Ok(())
}

/// Whether the text has any character in the Myanmar block (U+1000–U+109F).
pub fn contains_myanmar_script(text: &str) -> bool {
    text.chars().any(|c| ('\u{1000}'..='\u{109F}').contains(&c))
}

/// A fetched page reduced to plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArticle {
    pub url: String,
    pub text: String,
}

pub async fn fetch_article(pages: &dyn PageSource, url: &str) -> Result<FetchedArticle> {
    let parsed = validate_url(url)?;
    let html = pages.fetch_page(parsed.as_str()).await?;
    let text = extract_article_text(&html)?;
    debug!("Extracted {} characters from {}", text.chars().count(), parsed);
    Ok(FetchedArticle {
        url: url.trim().to_string(),
        text,
    })
}
