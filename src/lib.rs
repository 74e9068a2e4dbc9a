mod assets;
mod canvas;
mod compose;
mod debug;
mod doc_context;
mod doc_template;
mod error;
mod flowable;
mod font;
mod frame;
mod job;
mod layout;
mod metrics;
mod model;
mod page_template;
mod pdf;
mod pdfinspect;
mod perf;
mod resolve;
mod style;
mod toc;
mod types;

pub use canvas::{Canvas, Command, Document, Page};
pub use compose::ComposeReport;
use debug::DebugLogger;
pub use doc_context::DocContext;
pub use doc_template::{DocTemplate, Section};
pub use error::BookPressError;
pub use flowable::{
    AnchorMarker, BreakInside, CenteredBlock, DropCap, Flowable, ImageFlowable, Ornament,
    Pagination, Paragraph, Spacer, TextAlign, TextStyle, TocRow,
};
use font::FontRegistry;
pub use font::{BASE14_BOLD, BASE14_ITALIC, BASE14_REGULAR};
pub use frame::{AddResult, Frame};
pub use job::{DEFAULT_BOOK_TITLE, FINAL_PDF_PATH_KEY, JobInput, job_input_from_payload, unwrap_payload};
use layout::Faces;
pub use layout::RenderedDocument;
pub use metrics::{DocumentMetrics, PageMetrics};
pub use model::{
    Book, BookInput, Chapter, ChapterRecord, PARAGRAPH_DELIMITER, TextBlock, build_book,
    split_paragraphs,
};
pub use page_template::{FrameSpec, OnPageCallback, PageTemplate};
use pdf::PdfOptions;
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, PdfInspectWarning,
    inspect_pdf_bytes, inspect_pdf_path, print_compatibility_issues, require_print_compatibility,
};
use perf::PerfLogger;
pub use resolve::PageMap;
pub use style::{FontFace, FontFiles, Labels, MarginsMm, StyleConfig, TextRule, TextRules};
pub use toc::{
    EPILOGUE_ANCHOR, PREFACE_ANCHOR, PROLOGUE_ANCHOR, TocEntry, chapter_anchor, toc_entries,
    toc_entries_with_labels,
};
pub use types::{Color, Margins, Pt, Rect, Size, mm};

use compose::Composer;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Composition engine configured once and shared across books. Holds no
// per-book state, so one instance can compose many books concurrently.
pub struct BookPress {
    style: StyleConfig,
    font_registry: Arc<FontRegistry>,
    faces: Faces,
    pdf_options: PdfOptions,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
}

pub struct BookPressBuilder {
    style: StyleConfig,
    fonts: Option<FontFiles>,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
    pdf_options: PdfOptions,
}

impl BookPress {
    pub fn builder() -> BookPressBuilder {
        BookPressBuilder::new()
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub(crate) fn debug(&self) -> Option<&DebugLogger> {
        self.debug.as_deref()
    }

    fn composer(&self, doc_id: Option<usize>) -> Composer<'_> {
        Composer::new(&self.style, &self.font_registry, &self.faces, &self.pdf_options).with_logs(
            self.debug.as_deref(),
            self.perf.as_deref(),
            doc_id,
        )
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
        if let Some(perf) = self.perf.as_deref() {
            perf.flush();
        }
    }

    // Contents entries for `book`, titled with the configured labels.
    pub fn toc(&self, book: &Book) -> Vec<TocEntry> {
        toc_entries_with_labels(book, &self.style.labels)
    }

    // Single render. `None` is a probe: the contents column is left blank.
    pub fn render(
        &self,
        book: &Book,
        page_map: Option<&PageMap>,
    ) -> Result<RenderedDocument, BookPressError> {
        let rendered = layout::BookRenderer::new(
            &self.style,
            Arc::clone(&self.font_registry),
            &self.faces,
        )
        .with_debug(self.debug.as_deref(), None)
        .render(book, page_map);
        self.emit_debug_summary("render");
        rendered
    }

    // Probe render, then anchor -> page number from the first body page.
    pub fn resolve(&self, book: &Book) -> Result<PageMap, BookPressError> {
        let map = self.composer(None).resolve(book);
        self.emit_debug_summary("resolve");
        map
    }

    pub fn compose(
        &self,
        book: &Book,
        output: impl AsRef<Path>,
    ) -> Result<PathBuf, BookPressError> {
        self.compose_with_report(book, output)
            .map(|report| report.output)
    }

    pub fn compose_with_report(
        &self,
        book: &Book,
        output: impl AsRef<Path>,
    ) -> Result<ComposeReport, BookPressError> {
        let report = self.composer(None).compose(book, output.as_ref());
        self.emit_debug_summary("compose");
        report
    }

    pub fn compose_to_bytes(&self, book: &Book) -> Result<Vec<u8>, BookPressError> {
        let composed = self.composer(None).compose_to_bytes(book);
        self.emit_debug_summary("compose");
        composed.map(|pdf| pdf.bytes)
    }

    // Independent books composed in parallel; results keep the input order.
    pub fn compose_many(
        &self,
        jobs: &[(Book, PathBuf)],
    ) -> Vec<Result<ComposeReport, BookPressError>> {
        use rayon::prelude::*;

        let mut results: Vec<(usize, Result<ComposeReport, BookPressError>)> = jobs
            .par_iter()
            .enumerate()
            .map(|(idx, (book, output))| (idx, self.composer(Some(idx)).compose(book, output)))
            .collect();
        results.sort_by_key(|(idx, _)| *idx);
        self.emit_debug_summary("compose_many");
        results.into_iter().map(|(_, res)| res).collect()
    }

    // PDF stage of the order pipeline: stage payload in, payload with
    // `final_pdf_path` out.
    pub fn run_job(
        &self,
        event: serde_json::Value,
        out_dir: impl AsRef<Path>,
    ) -> Result<serde_json::Value, BookPressError> {
        job::run_job(self, event, out_dir.as_ref())
    }
}

impl Default for BookPressBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BookPressBuilder {
    pub fn new() -> Self {
        Self {
            style: StyleConfig::default(),
            fonts: None,
            debug_path: None,
            perf_path: None,
            pdf_options: PdfOptions::default(),
        }
    }

    pub fn style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }

    // Overrides the font files named by the style.
    pub fn fonts(mut self, fonts: FontFiles) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn signature_pages(mut self, pages: Option<usize>) -> Self {
        self.style.signature_pages = pages;
        self
    }

    pub fn max_layout_passes(mut self, passes: usize) -> Self {
        self.style.max_layout_passes = passes;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    // PDF /Title; defaults to the book title.
    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.pdf_options.title = Some(title.into());
        self
    }

    pub fn outline(mut self, enabled: bool) -> Self {
        self.pdf_options.outline = enabled;
        self
    }

    pub fn compress(mut self, enabled: bool) -> Self {
        self.pdf_options.compress = enabled;
        self
    }

    pub fn build(self) -> Result<BookPress, BookPressError> {
        let mut style = self.style;
        if let Some(fonts) = self.fonts {
            style.fonts = fonts;
        }
        style.validate()?;
        if matches!(&self.pdf_options.title, Some(title) if title.trim().is_empty()) {
            return Err(BookPressError::InvalidConfiguration(
                "document_title must not be blank".to_string(),
            ));
        }

        let mut registry = FontRegistry::new();
        let faces = Faces::load(&mut registry, &style.fonts)?;
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        let perf = if let Some(path) = self.perf_path {
            Some(Arc::new(PerfLogger::new(path)?))
        } else {
            None
        };
        Ok(BookPress {
            style,
            font_registry: Arc::new(registry),
            faces,
            pdf_options: self.pdf_options,
            debug,
            perf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "bookpress_lib_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn sample(title: &str, chapters: usize) -> Book {
        build_book(&BookInput {
            title: title.to_string(),
            chapters: (1..=chapters)
                .map(|n| ChapterRecord {
                    heading: Some(format!("Heading {n}")),
                    content: Some(format!("Chapter {n} opens.\n\nAnd it closes.")),
                    image: None,
                })
                .collect(),
            print_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            ..BookInput::default()
        })
        .expect("book")
    }

    #[test]
    fn builder_rejects_invalid_style() {
        let err = BookPress::builder().max_layout_passes(0).build().err();
        assert!(matches!(err, Some(BookPressError::InvalidConfiguration(_))));
        let err = BookPress::builder().signature_pages(Some(6)).build().err();
        assert!(matches!(err, Some(BookPressError::InvalidConfiguration(_))));
        let err = BookPress::builder().document_title("  ").build().err();
        assert!(matches!(err, Some(BookPressError::InvalidConfiguration(_))));
    }

    #[test]
    fn missing_font_file_fails_the_build() {
        let err = BookPress::builder()
            .fonts(FontFiles {
                regular: Some(PathBuf::from("/nonexistent/bookpress/regular.ttf")),
                ..FontFiles::default()
            })
            .build()
            .err();
        assert!(err.is_some());
    }

    #[test]
    fn resolve_and_render_agree_with_compose() {
        let press = BookPress::builder().build().expect("press");
        let book = sample("Agree", 2);
        let map = press.resolve(&book).expect("resolve");
        assert_eq!(press.toc(&book).len(), 2);
        let rendered = press.render(&book, Some(&map)).expect("render");
        assert!(rendered.missing_page_numbers().is_empty());
        let bytes = press.compose_to_bytes(&book).expect("bytes");
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, rendered.page_count());
    }

    #[test]
    fn document_title_overrides_book_title() {
        let press = BookPress::builder()
            .document_title("Interior")
            .outline(false)
            .build()
            .expect("press");
        let bytes = press.compose_to_bytes(&sample("Ignored", 1)).expect("bytes");
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.title.as_deref(), Some("Interior"));
        assert!(!report.has_outline());
    }

    #[test]
    fn compose_many_keeps_input_order() {
        let debug = temp_path("debug.jsonl");
        let press = BookPress::builder()
            .debug_log(&debug)
            .build()
            .expect("press");
        let dir = temp_path("many");
        let jobs: Vec<(Book, PathBuf)> = (1..=3)
            .map(|n| (sample(&format!("Book {n}"), n), dir.join(format!("book{n}.pdf"))))
            .collect();
        let results = press.compose_many(&jobs);
        assert_eq!(results.len(), 3);
        for (n, result) in results.iter().enumerate() {
            let report = result.as_ref().expect("composed");
            assert_eq!(report.output, jobs[n].1);
            assert_eq!(report.page_map.len(), n + 1);
        }
        let log = std::fs::read_to_string(&debug).expect("debug log");
        assert!(log.contains("\"compose.pass\""));
        assert!(log.contains("\"debug.summary\""));
        let _ = std::fs::remove_dir_all(dir);
        let _ = std::fs::remove_file(debug);
    }

    #[test]
    fn compose_returns_the_output_path() {
        let press = BookPress::builder().build().expect("press");
        let output = temp_path("single.pdf");
        let path = press.compose(&sample("Path", 1), &output).expect("compose");
        assert_eq!(path, output);
        assert!(output.exists());
        let _ = std::fs::remove_file(output);
    }
}
