use crate::model::Book;
use crate::style::Labels;
use serde::Serialize;

pub const PREFACE_ANCHOR: &str = "preface";
pub const PROLOGUE_ANCHOR: &str = "prologue";
pub const EPILOGUE_ANCHOR: &str = "epilogue";

pub fn chapter_anchor(number: usize) -> String {
    format!("chapter-{number}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub title: String,
    pub anchor: String,
}

impl TocEntry {
    fn new(title: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            anchor: anchor.into(),
        }
    }
}

pub fn toc_entries(book: &Book) -> Vec<TocEntry> {
    toc_entries_with_labels(book, &Labels::default())
}

// Entries in print order. Anchors derive from the section role, never the title.
pub fn toc_entries_with_labels(book: &Book, labels: &Labels) -> Vec<TocEntry> {
    let mut entries = Vec::with_capacity(book.chapters().len() + 3);
    if book.preface().is_some() {
        entries.push(TocEntry::new(labels.preface.clone(), PREFACE_ANCHOR));
    }
    if let Some(prologue) = book.prologue() {
        let title = prologue.title().unwrap_or(&labels.prologue);
        entries.push(TocEntry::new(title, PROLOGUE_ANCHOR));
    }
    for (idx, chapter) in book.chapters().iter().enumerate() {
        entries.push(TocEntry::new(chapter.heading(), chapter_anchor(idx + 1)));
    }
    if let Some(epilogue) = book.epilogue() {
        let title = epilogue.title().unwrap_or(&labels.epilogue);
        entries.push(TocEntry::new(title, EPILOGUE_ANCHOR));
    }
    entries
}
