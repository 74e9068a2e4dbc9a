use lopdf::{Dictionary, Document as LoDocument, Object};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfEncryptedUnsupported,
    PdfEmptyOrNoPages,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfEncryptedUnsupported => "PDF_ENCRYPTED_UNSUPPORTED",
            PdfInspectErrorCode::PdfEmptyOrNoPages => "PDF_EMPTY_OR_NO_PAGES",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfInspectWarning {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    pub title: Option<String>,
    pub link_annotation_count: usize,
    // Links that jump inside the document rather than to a URI.
    pub internal_link_count: usize,
    pub outline_item_count: usize,
    pub warnings: Vec<PdfInspectWarning>,
}

impl PdfInspectReport {
    pub fn has_outline(&self) -> bool {
        self.outline_item_count > 0
    }
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfParseFailed,
        message: err.to_string(),
    })?;

    let mut warnings = Vec::new();
    let mut link_annotation_count = 0usize;
    let mut internal_link_count = 0usize;
    let pages = pdf.get_pages();
    for (number, page_id) in &pages {
        let Ok(page) = pdf.get_dictionary(*page_id) else {
            warnings.push(PdfInspectWarning {
                code: "PAGE_UNREADABLE".to_string(),
                message: format!("page {number} is not a dictionary"),
            });
            continue;
        };
        for annot in annotations(&pdf, page) {
            if annot.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Link".as_slice()) {
                continue;
            }
            link_annotation_count += 1;
            if annot.has(b"Dest") || is_goto_action(&pdf, annot) {
                internal_link_count += 1;
            }
        }
    }

    let outline_item_count = count_outline_items(&pdf);
    let title = document_title(&pdf);
    if pages.is_empty() {
        warnings.push(PdfInspectWarning {
            code: "NO_PAGES".to_string(),
            message: "document has no pages".to_string(),
        });
    }

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pages.len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        title,
        link_annotation_count,
        internal_link_count,
        outline_item_count,
        warnings,
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PdfInspectError> {
    let data = std::fs::read(path).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_pdf_bytes(&data)
}

// Problems that make the file unusable as a print interior.
pub fn print_compatibility_issues(report: &PdfInspectReport) -> Vec<PdfInspectErrorCode> {
    let mut issues = Vec::new();
    if report.encrypted {
        issues.push(PdfInspectErrorCode::PdfEncryptedUnsupported);
    }
    if report.page_count == 0 {
        issues.push(PdfInspectErrorCode::PdfEmptyOrNoPages);
    }
    issues
}

pub fn require_print_compatibility(report: &PdfInspectReport) -> Result<(), PdfInspectError> {
    match print_compatibility_issues(report).into_iter().next() {
        Some(PdfInspectErrorCode::PdfEncryptedUnsupported) => Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfEncryptedUnsupported,
            message: "encrypted pdf is not accepted for print".to_string(),
        }),
        Some(PdfInspectErrorCode::PdfEmptyOrNoPages) => Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfEmptyOrNoPages,
            message: "pdf has no pages".to_string(),
        }),
        _ => Ok(()),
    }
}

fn annotations<'a>(pdf: &'a LoDocument, page: &'a Dictionary) -> Vec<&'a Dictionary> {
    let Ok(annots) = page.get(b"Annots") else {
        return Vec::new();
    };
    let Ok((_, annots)) = pdf.dereference(annots) else {
        return Vec::new();
    };
    let Ok(items) = annots.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| pdf.dereference(item).ok())
        .filter_map(|(_, object)| object.as_dict().ok())
        .collect()
}

fn is_goto_action(pdf: &LoDocument, annot: &Dictionary) -> bool {
    let Ok(action) = annot.get(b"A") else {
        return false;
    };
    pdf.dereference(action)
        .ok()
        .and_then(|(_, object)| object.as_dict().ok())
        .and_then(|dict| dict.get(b"S").and_then(Object::as_name).ok())
        == Some(b"GoTo".as_slice())
}

fn count_outline_items(pdf: &LoDocument) -> usize {
    let Ok(catalog) = pdf.catalog() else {
        return 0;
    };
    let Some(root) = catalog
        .get(b"Outlines")
        .ok()
        .and_then(|obj| pdf.dereference(obj).ok())
        .and_then(|(_, obj)| obj.as_dict().ok())
    else {
        return 0;
    };

    // Top-level items only; the walk is bounded by the object count.
    let mut count = 0usize;
    let mut next = root.get(b"First").and_then(Object::as_reference).ok();
    while let Some(id) = next {
        if count > pdf.objects.len() {
            break;
        }
        count += 1;
        next = pdf
            .get_dictionary(id)
            .ok()
            .and_then(|item| item.get(b"Next").and_then(Object::as_reference).ok());
    }
    count
}

fn document_title(pdf: &LoDocument) -> Option<String> {
    let info = pdf.trailer.get(b"Info").ok()?;
    let (_, info) = pdf.dereference(info).ok()?;
    match info.as_dict().ok()?.get(b"Title").ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|b| char::from(*b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Object as LoObject, Stream as LoStream, dictionary};
    use std::io::Write;

    fn make_single_page_pdf_bytes(text: &str) -> Vec<u8> {
        let mut doc = LoDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = format!("BT /F1 18 Tf 72 720 Td ({}) Tj ET", text).into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 396.into(), 612.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, LoObject::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save");
        out
    }

    fn temp_name(prefix: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "{}_{}_{}",
            prefix,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ))
    }

    #[test]
    fn inspect_pdf_bytes_reads_version_and_page_count() {
        let bytes = make_single_page_pdf_bytes("HELLO");
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 1);
        assert!(!report.encrypted);
        assert_eq!(report.file_size_bytes, bytes.len());
        assert!(!report.pdf_version.is_empty());
        assert_eq!(report.link_annotation_count, 0);
        assert!(!report.has_outline());
        assert_eq!(report.title, None);
    }

    #[test]
    fn inspect_pdf_bytes_rejects_malformed_data() {
        let err = inspect_pdf_bytes(b"not a pdf").expect_err("invalid");
        assert_eq!(err.code, PdfInspectErrorCode::PdfParseFailed);
    }

    #[test]
    fn inspect_pdf_path_reports_io_error_for_missing_file() {
        let missing = temp_name("bookpress_pdfinspect_missing").with_extension("pdf");
        let err = inspect_pdf_path(&missing).expect_err("missing");
        assert_eq!(err.code, PdfInspectErrorCode::PdfIoError);
    }

    #[test]
    fn print_compatibility_rejects_encrypted_and_empty() {
        let mut report = PdfInspectReport {
            pdf_version: "1.7".to_string(),
            page_count: 1,
            encrypted: true,
            file_size_bytes: 0,
            title: None,
            link_annotation_count: 0,
            internal_link_count: 0,
            outline_item_count: 0,
            warnings: Vec::new(),
        };
        assert!(print_compatibility_issues(&report).contains(&PdfInspectErrorCode::PdfEncryptedUnsupported));
        let err = require_print_compatibility(&report).expect_err("encrypted");
        assert_eq!(err.code, PdfInspectErrorCode::PdfEncryptedUnsupported);

        report.encrypted = false;
        report.page_count = 0;
        assert_eq!(
            print_compatibility_issues(&report),
            vec![PdfInspectErrorCode::PdfEmptyOrNoPages]
        );
        report.page_count = 3;
        assert!(require_print_compatibility(&report).is_ok());
    }

    #[test]
    fn inspect_pdf_path_matches_bytes_report() {
        let bytes = make_single_page_pdf_bytes("PATH");
        let temp_dir = temp_name("bookpress_pdfinspect_path");
        std::fs::create_dir_all(&temp_dir).expect("mkdir");
        let path = temp_dir.join("one.pdf");
        let mut f = std::fs::File::create(&path).expect("create");
        f.write_all(&bytes).expect("write");

        let from_path = inspect_pdf_path(&path).expect("inspect path");
        let from_bytes = inspect_pdf_bytes(&bytes).expect("inspect bytes");
        assert_eq!(from_path, from_bytes);
        let _ = std::fs::remove_dir_all(temp_dir);
    }

    #[test]
    fn utf16_titles_decode() {
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0xC9, 0x00, 0x74]), "Ét");
        assert_eq!(decode_text_string(b"Plain"), "Plain");
    }
}
