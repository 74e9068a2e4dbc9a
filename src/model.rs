use crate::error::BookPressError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PARAGRAPH_DELIMITER: &str = "\n\n";

// Raw chapter record as produced upstream; heading and content are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterRecord {
    pub heading: Option<String>,
    pub content: Option<String>,
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookInput {
    pub title: String,
    pub preface: Option<String>,
    pub prologue: Option<String>,
    pub prologue_title: Option<String>,
    pub epilogue: Option<String>,
    pub epilogue_title: Option<String>,
    pub chapters: Vec<ChapterRecord>,
    pub cover_image: Option<PathBuf>,
    pub print_date: Option<NaiveDate>,
}

impl BookInput {
    pub fn from_json(raw: &str) -> Result<Self, BookPressError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    title: Option<String>,
    paragraphs: Vec<String>,
}

impl TextBlock {
    fn from_raw(raw: Option<&str>, title: Option<&str>) -> Option<Self> {
        let text = normalize(raw?);
        if text.trim().is_empty() {
            return None;
        }
        Some(Self {
            title: title
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            paragraphs: split_paragraphs(&text),
        })
    }

    // Custom title, if one was supplied.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn text(&self) -> String {
        self.paragraphs.join(PARAGRAPH_DELIMITER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    heading: String,
    paragraphs: Vec<String>,
    image: Option<PathBuf>,
}

impl Chapter {
    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn text(&self) -> String {
        self.paragraphs.join(PARAGRAPH_DELIMITER)
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    title: String,
    preface: Option<TextBlock>,
    prologue: Option<TextBlock>,
    epilogue: Option<TextBlock>,
    chapters: Vec<Chapter>,
    cover_image: Option<PathBuf>,
    print_date: NaiveDate,
}

impl Book {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn preface(&self) -> Option<&TextBlock> {
        self.preface.as_ref()
    }

    pub fn prologue(&self) -> Option<&TextBlock> {
        self.prologue.as_ref()
    }

    pub fn epilogue(&self) -> Option<&TextBlock> {
        self.epilogue.as_ref()
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn cover_image(&self) -> Option<&Path> {
        self.cover_image.as_deref()
    }

    pub fn print_date(&self) -> NaiveDate {
        self.print_date
    }

    pub(crate) fn image_paths(&self) -> impl Iterator<Item = &Path> {
        self.cover_image()
            .into_iter()
            .chain(self.chapters.iter().filter_map(Chapter::image))
    }
}

fn normalize(raw: &str) -> String {
    raw.replace("\r\n", "\n")
}

// Splits on the exact blank-line delimiter; joining the parts with it gives the
// input back unchanged.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split(PARAGRAPH_DELIMITER).map(str::to_string).collect()
}

fn required<'a>(value: Option<&'a str>, index: usize, field: &str) -> Result<&'a str, BookPressError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BookPressError::Validation(format!(
            "chapter {index} is missing its {field}"
        ))),
    }
}

pub fn build_book(input: &BookInput) -> Result<Book, BookPressError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(BookPressError::Validation("book title is blank".to_string()));
    }

    let mut chapters = Vec::with_capacity(input.chapters.len());
    for (idx, record) in input.chapters.iter().enumerate() {
        let index = idx + 1;
        let heading = required(record.heading.as_deref(), index, "heading")?;
        let content = required(record.content.as_deref(), index, "content")?;
        chapters.push(Chapter {
            heading: heading.trim().to_string(),
            paragraphs: split_paragraphs(&normalize(content)),
            image: record.image.clone(),
        });
    }

    let preface = TextBlock::from_raw(input.preface.as_deref(), None);
    let prologue = TextBlock::from_raw(input.prologue.as_deref(), input.prologue_title.as_deref());
    let epilogue = TextBlock::from_raw(input.epilogue.as_deref(), input.epilogue_title.as_deref());

    if chapters.is_empty() && preface.is_none() && prologue.is_none() && epilogue.is_none() {
        return Err(BookPressError::Validation(
            "book has no chapters and no preface, prologue or epilogue".to_string(),
        ));
    }

    Ok(Book {
        title: title.to_string(),
        preface,
        prologue,
        epilogue,
        chapters,
        cover_image: input.cover_image.clone(),
        print_date: input
            .print_date
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(heading: &str, content: &str) -> ChapterRecord {
        ChapterRecord {
            heading: Some(heading.to_string()),
            content: Some(content.to_string()),
            image: None,
        }
    }

    fn input() -> BookInput {
        BookInput {
            title: "Sample".to_string(),
            chapters: vec![chapter("Beginnings", "Para one.\n\nPara two.")],
            print_date: NaiveDate::from_ymd_opt(2024, 3, 9),
            ..BookInput::default()
        }
    }

    #[test]
    fn paragraphs_split_on_blank_lines_and_rejoin_exactly() {
        let text = "First line\nstill first.\n\nSecond.\n\n\nThird with leading newline.";
        let parts = split_paragraphs(text);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], "\nThird with leading newline.");
        assert_eq!(parts.join(PARAGRAPH_DELIMITER), text);
    }

    #[test]
    fn crlf_is_normalized_before_splitting() {
        let mut raw = input();
        raw.chapters[0].content = Some("One.\r\n\r\nTwo.".to_string());
        let book = build_book(&raw).expect("build");
        assert_eq!(book.chapters()[0].paragraphs(), &["One.", "Two."]);
        assert_eq!(book.chapters()[0].text(), "One.\n\nTwo.");
    }

    #[test]
    fn chapters_require_heading_and_content() {
        let mut raw = input();
        raw.chapters.push(ChapterRecord {
            heading: Some("Second".to_string()),
            content: Some("   ".to_string()),
            image: None,
        });
        let err = build_book(&raw).expect_err("blank content");
        assert!(matches!(err, BookPressError::Validation(ref msg) if msg.contains("chapter 2")));

        let mut raw = input();
        raw.chapters[0].heading = None;
        assert!(matches!(build_book(&raw), Err(BookPressError::Validation(_))));
    }

    #[test]
    fn whitespace_blocks_are_absent_and_custom_titles_kept() {
        let mut raw = input();
        raw.epilogue = Some("  \n\n ".to_string());
        raw.prologue = Some("Before it all.".to_string());
        raw.prologue_title = Some(" Overture ".to_string());
        let book = build_book(&raw).expect("build");
        assert!(book.epilogue().is_none());
        assert_eq!(book.prologue().and_then(TextBlock::title), Some("Overture"));
        assert_eq!(book.print_date(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap_or_default());
    }

    #[test]
    fn empty_books_are_rejected() {
        let raw = BookInput {
            title: "Nothing".to_string(),
            ..BookInput::default()
        };
        assert!(matches!(build_book(&raw), Err(BookPressError::Validation(_))));

        let mut raw = input();
        raw.title = " ".to_string();
        assert!(matches!(build_book(&raw), Err(BookPressError::Validation(_))));
    }

    #[test]
    fn input_parses_from_json() {
        let raw = BookInput::from_json(
            r#"{"title":"T","chapters":[{"heading":"H","content":"C","image":"a.png"}],"print_date":"2025-01-31"}"#,
        )
        .expect("json");
        let book = build_book(&raw).expect("build");
        assert_eq!(book.chapters()[0].image(), Some(Path::new("a.png")));
        assert_eq!(book.image_paths().count(), 1);
        assert_eq!(book.print_date().to_string(), "2025-01-31");
    }
}
