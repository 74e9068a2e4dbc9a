use crate::BookPress;
use crate::assets::probe_image;
use crate::debug::warn;
use crate::error::BookPressError;
use crate::model::{BookInput, ChapterRecord, build_book};
use crate::pdfinspect::{PdfInspectReport, inspect_pdf_path, require_print_compatibility};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

pub const DEFAULT_BOOK_TITLE: &str = "The Architecture of You";
pub const FINAL_PDF_PATH_KEY: &str = "final_pdf_path";

const REQUIRED_FIELDS: [&str; 4] = [
    "order_id",
    "line_item_id",
    "chapters_data",
    "full_book_structure",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ChapterData {
    theme_title: Option<String>,
    chapter_text_path: Option<PathBuf>,
    image_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct BookStructure {
    title: Option<String>,
    preface: Option<String>,
    prologue: Option<String>,
    prologue_title: Option<String>,
    epilogue: Option<String>,
    epilogue_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChapterText {
    chapter_text: String,
}

// The PDF stage payload reduced to what composition needs.
#[derive(Debug, Clone)]
pub struct JobInput {
    pub order_id: String,
    pub line_item_id: String,
    pub book: BookInput,
    pub warnings: Vec<String>,
}

impl JobInput {
    // `<out_dir>/<order_id>/<line_item_id>/<line_item_id>.pdf`
    pub fn output_path(&self, out_dir: &Path) -> PathBuf {
        out_dir
            .join(&self.order_id)
            .join(&self.line_item_id)
            .join(format!("{}.pdf", self.line_item_id))
    }
}

// Step payloads sometimes arrive wrapped in a `Payload` object.
pub fn unwrap_payload(event: Value) -> Value {
    match event {
        Value::Object(mut map) if matches!(map.get("Payload"), Some(Value::Object(_))) => {
            map.remove("Payload").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

// Ids become path components, so they must be a single plain segment.
fn identifier(payload: &Value, key: &str) -> Result<String, BookPressError> {
    let id = match payload.get(key) {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => {
            return Err(BookPressError::Validation(format!(
                "payload field {key} must be a string or number"
            )));
        }
    };
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(BookPressError::Validation(format!(
            "payload field {key} is not a usable identifier: {id:?}"
        )));
    }
    Ok(id)
}

fn read_chapter_text(path: &Path) -> Result<String, BookPressError> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        BookPressError::Asset(format!("cannot read chapter text {}: {err}", path.display()))
    })?;
    let parsed: ChapterText = serde_json::from_str(&raw).map_err(|err| {
        BookPressError::Asset(format!("chapter text {} is not valid JSON: {err}", path.display()))
    })?;
    Ok(parsed.chapter_text)
}

pub fn job_input_from_payload(payload: &Value) -> Result<JobInput, BookPressError> {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|key| payload.get(*key).is_none_or(is_blank))
        .collect();
    if !missing.is_empty() {
        return Err(BookPressError::Validation(format!(
            "payload is missing {}",
            missing.join(", ")
        )));
    }

    let order_id = identifier(payload, "order_id")?;
    let line_item_id = identifier(payload, "line_item_id")?;
    let chapters: Vec<ChapterData> =
        serde_json::from_value(payload["chapters_data"].clone()).map_err(|err| {
            BookPressError::Validation(format!("chapters_data is malformed: {err}"))
        })?;
    let structure: BookStructure = serde_json::from_value(payload["full_book_structure"].clone())
        .map_err(|err| {
            BookPressError::Validation(format!("full_book_structure is malformed: {err}"))
        })?;

    let mut warnings = Vec::new();
    let mut records = Vec::with_capacity(chapters.len());
    for (idx, chapter) in chapters.into_iter().enumerate() {
        let idx = idx + 1;
        let Some(text_path) = chapter.chapter_text_path else {
            warnings.push(format!(
                "chapter_text_path missing for chapter index {idx}, skipping"
            ));
            continue;
        };
        let content = read_chapter_text(&text_path)?;
        let image = match chapter.image_path {
            Some(path) => match probe_image(&path) {
                Ok(_) => Some(path),
                Err(err) => {
                    warnings.push(format!("dropping image for chapter {idx}: {err}"));
                    None
                }
            },
            None => None,
        };
        let heading = chapter
            .theme_title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| format!("Chapter {idx}"));
        records.push(ChapterRecord {
            heading: Some(heading),
            content: Some(content),
            image,
        });
    }

    let title = structure
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BOOK_TITLE.to_string());
    Ok(JobInput {
        order_id,
        line_item_id,
        book: BookInput {
            title,
            preface: structure.preface,
            prologue: structure.prologue,
            prologue_title: structure.prologue_title,
            epilogue: structure.epilogue,
            epilogue_title: structure.epilogue_title,
            chapters: records,
            cover_image: None,
            print_date: None,
        },
        warnings,
    })
}

// The written interior must reopen as an unencrypted PDF with pages.
pub(crate) fn verify_interior(path: &Path) -> Result<PdfInspectReport, BookPressError> {
    let report = inspect_pdf_path(path)
        .map_err(|err| BookPressError::Asset(format!("{}: {err}", path.display())))?;
    require_print_compatibility(&report)
        .map_err(|err| BookPressError::Asset(format!("{}: {err}", path.display())))?;
    Ok(report)
}

// Runs the PDF stage: payload in, payload plus `final_pdf_path` out.
pub(crate) fn run_job(press: &BookPress, event: Value, out_dir: &Path) -> Result<Value, BookPressError> {
    let mut payload = unwrap_payload(event);
    let job = job_input_from_payload(&payload)?;
    for message in &job.warnings {
        warn("job", message);
        if let Some(logger) = press.debug() {
            logger.log_event(
                "job.warning",
                json!({
                    "order_id": job.order_id,
                    "line_item_id": job.line_item_id,
                    "message": message,
                }),
            );
            logger.increment("job.warning", 1);
        }
    }

    let book = build_book(&job.book)?;
    let output = job.output_path(out_dir);
    let report = press.compose_with_report(&book, &output)?;
    let interior = verify_interior(&report.output)
        .map_err(|err| BookPressError::composition("verify", err))?;
    if let Some(logger) = press.debug() {
        logger.log_event(
            "job.verified",
            json!({
                "order_id": job.order_id,
                "line_item_id": job.line_item_id,
                "pages": interior.page_count,
                "links": interior.internal_link_count,
                "outline_items": interior.outline_item_count,
            }),
        );
    }
    if let Value::Object(map) = &mut payload {
        map.insert(
            FINAL_PDF_PATH_KEY.to_string(),
            Value::String(report.output.to_string_lossy().into_owned()),
        );
    }
    Ok(payload)
}
