use crate::debug::{DebugLogger, warn};
use crate::error::BookPressError;
use crate::font::FontRegistry;
use crate::layout::{BookRenderer, Faces, RenderedDocument};
use crate::model::Book;
use crate::pdf::{PdfOptions, write_pdf};
use crate::perf::{PerfLogger, timed};
use crate::resolve::{PageMap, page_map_from_document};
use crate::style::StyleConfig;
use crate::toc::toc_entries_with_labels;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static WRITE_NONCE: AtomicU64 = AtomicU64::new(0);

// What a finished composition produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeReport {
    pub output: PathBuf,
    pub page_count: usize,
    pub page_map: PageMap,
    // Contents anchors that never appeared in the body.
    pub missing_anchors: Vec<String>,
    // Render passes, probe included.
    pub passes: usize,
    pub sha256: String,
    pub bytes: usize,
}

// A composed book held in memory, before it is persisted.
pub(crate) struct ComposedPdf {
    pub(crate) bytes: Vec<u8>,
    pub(crate) page_count: usize,
    pub(crate) page_map: PageMap,
    pub(crate) missing_anchors: Vec<String>,
    pub(crate) passes: usize,
}

impl ComposedPdf {
    fn into_report(self, output: PathBuf) -> ComposeReport {
        ComposeReport {
            output,
            page_count: self.page_count,
            page_map: self.page_map,
            missing_anchors: self.missing_anchors,
            passes: self.passes,
            sha256: sha256_hex(&self.bytes),
            bytes: self.bytes.len(),
        }
    }
}

pub(crate) struct Composer<'a> {
    style: &'a StyleConfig,
    fonts: &'a Arc<FontRegistry>,
    faces: &'a Faces,
    pdf_options: &'a PdfOptions,
    debug: Option<&'a DebugLogger>,
    perf: Option<&'a PerfLogger>,
    doc_id: Option<usize>,
}

impl<'a> Composer<'a> {
    pub(crate) fn new(
        style: &'a StyleConfig,
        fonts: &'a Arc<FontRegistry>,
        faces: &'a Faces,
        pdf_options: &'a PdfOptions,
    ) -> Self {
        Self {
            style,
            fonts,
            faces,
            pdf_options,
            debug: None,
            perf: None,
            doc_id: None,
        }
    }

    pub(crate) fn with_logs(
        mut self,
        debug: Option<&'a DebugLogger>,
        perf: Option<&'a PerfLogger>,
        doc_id: Option<usize>,
    ) -> Self {
        self.debug = debug;
        self.perf = perf;
        self.doc_id = doc_id;
        self
    }

    fn renderer(&self) -> BookRenderer<'a> {
        BookRenderer::new(self.style, Arc::clone(self.fonts), self.faces)
            .with_debug(self.debug, self.doc_id)
    }

    fn log_pass(&self, mode: &str, pass: usize, pages: usize, stable: bool) {
        if let Some(logger) = self.debug {
            logger.log_event(
                "compose.pass",
                json!({
                    "doc_id": self.doc_id,
                    "mode": mode,
                    "pass": pass,
                    "pages": pages,
                    "stable": stable,
                }),
            );
            logger.increment("compose.pass", 1);
        }
    }

    // Probe render with an empty contents column. The probe document is
    // dropped before this returns.
    pub(crate) fn resolve(&self, book: &Book) -> Result<PageMap, BookPressError> {
        let entries = toc_entries_with_labels(book, &self.style.labels);
        let probe = timed(self.perf, "compose.probe", self.doc_id, || {
            self.renderer().render(book, None)
        })?;
        self.log_pass("probe", 1, probe.page_count(), true);
        page_map_from_document(probe.document(), &entries)
    }

    // Final render, repeated with the re-derived map until the numbers printed
    // in the contents agree with where the anchors landed.
    pub(crate) fn render_final(
        &self,
        book: &Book,
        mut page_map: PageMap,
    ) -> Result<(RenderedDocument, PageMap, usize), BookPressError> {
        let entries = toc_entries_with_labels(book, &self.style.labels);
        let limit = self.style.max_layout_passes.max(1);
        for pass in 1..=limit {
            let rendered = timed(self.perf, "compose.final", self.doc_id, || {
                self.renderer().render(book, Some(&page_map))
            })?;
            let derived = page_map_from_document(rendered.document(), &entries)?;
            let stable = derived == page_map;
            self.log_pass("final", pass + 1, rendered.page_count(), stable);
            if stable {
                return Ok((rendered, page_map, pass + 1));
            }
            page_map = derived;
        }
        Err(BookPressError::LayoutResolution(format!(
            "page numbers did not stabilize after {} final passes",
            limit
        )))
    }

    pub(crate) fn compose_to_bytes(&self, book: &Book) -> Result<ComposedPdf, BookPressError> {
        let page_map = self
            .resolve(book)
            .map_err(|err| BookPressError::composition("probe", err))?;
        self.compose_with_map(book, page_map)
    }

    // Final render and PDF write starting from an already resolved map.
    fn compose_with_map(&self, book: &Book, page_map: PageMap) -> Result<ComposedPdf, BookPressError> {
        let (rendered, page_map, passes) = self
            .render_final(book, page_map)
            .map_err(|err| BookPressError::composition("final", err))?;

        let mut options = self.pdf_options.clone();
        if options.title.is_none() {
            options.title = Some(book.title().to_string());
        }
        let (bytes, stats) = timed(self.perf, "pdf.write", self.doc_id, || {
            write_pdf(&rendered, self.fonts, &options)
        });
        if let Some(perf) = self.perf {
            perf.log_counts(
                "pdf.write",
                self.doc_id,
                &[
                    ("pages", stats.pages as u64),
                    ("objects", stats.objects as u64),
                    ("fonts", stats.fonts as u64),
                    ("images", stats.images as u64),
                    ("links", stats.links as u64),
                    ("outline_items", stats.outline_items as u64),
                    ("bytes", bytes.len() as u64),
                ],
            );
        }
        if stats.dangling_links > 0 {
            warn(
                "pdf",
                &format!("{} contents links point at no page", stats.dangling_links),
            );
        }
        if stats.replaced_chars > 0 {
            warn(
                "font",
                &format!(
                    "{} characters outside WinAnsi were replaced",
                    stats.replaced_chars
                ),
            );
            if let Some(logger) = self.debug {
                logger.increment("pdf.replaced_chars", stats.replaced_chars as u64);
            }
        }

        Ok(ComposedPdf {
            bytes,
            page_count: rendered.page_count(),
            missing_anchors: rendered.missing_page_numbers().to_vec(),
            page_map,
            passes,
        })
    }

    pub(crate) fn compose(&self, book: &Book, output: &Path) -> Result<ComposeReport, BookPressError> {
        let composed = self.compose_to_bytes(book)?;
        persist_atomically(&composed.bytes, output)
            .map_err(|err| BookPressError::composition("write", err))?;
        Ok(composed.into_report(output.to_path_buf()))
    }
}

// Writes next to the destination, then renames over it. Nothing is left at
// `output` when any step fails.
fn persist_atomically(bytes: &[u8], output: &Path) -> Result<(), BookPressError> {
    let file_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            BookPressError::InvalidConfiguration(format!(
                "output path has no file name: {}",
                output.display()
            ))
        })?;
    let parent = output
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let nonce = WRITE_NONCE.fetch_add(1, Ordering::Relaxed);
    let tmp = parent.join(format!(
        ".{}.tmp-{}-{}",
        file_name,
        std::process::id(),
        nonce
    ));

    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, output)
    })();
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::layout::{TEMPLATE_CONTENT, content_frame};
    use crate::model::{BookInput, ChapterRecord, build_book};
    use crate::pdfinspect::inspect_pdf_path;
    use crate::toc::chapter_anchor;
    use crate::types::Pt;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "bookpress_compose_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn record(heading: &str, content: &str, image: Option<PathBuf>) -> ChapterRecord {
        ChapterRecord {
            heading: Some(heading.to_string()),
            content: Some(content.to_string()),
            image,
        }
    }

    fn book(input: BookInput) -> Book {
        build_book(&BookInput {
            print_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            ..input
        })
        .expect("book")
    }

    struct Fixture {
        style: StyleConfig,
        fonts: Arc<FontRegistry>,
        faces: Faces,
        options: PdfOptions,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                style: StyleConfig::default(),
                fonts: Arc::new(FontRegistry::new()),
                faces: Faces::base14(),
                options: PdfOptions::default(),
            }
        }

        fn composer(&self) -> Composer<'_> {
            Composer::new(&self.style, &self.fonts, &self.faces, &self.options)
        }
    }

    fn three_chapters(first_image: Option<PathBuf>) -> Book {
        book(BookInput {
            title: "Three".to_string(),
            chapters: vec![
                record("One", "First chapter.", first_image),
                record("Two", "Second chapter.", None),
                record("Three", "Third chapter.", None),
            ],
            ..BookInput::default()
        })
    }

    #[test]
    fn single_chapter_lands_on_page_one() {
        let fixture = Fixture::new();
        let book = book(BookInput {
            title: "Sample".to_string(),
            chapters: vec![record("Beginnings", "Para one.\n\nPara two.", None)],
            ..BookInput::default()
        });
        let composer = fixture.composer();
        let page_map = composer.resolve(&book).expect("resolve");
        assert_eq!(page_map.len(), 1);
        assert_eq!(page_map.get(&chapter_anchor(1)), Some(1));

        let (rendered, final_map, passes) = composer.render_final(&book, page_map).expect("final");
        assert_eq!(final_map.get("chapter-1"), Some(1));
        assert_eq!(passes, 2);
        let content = &rendered.pages()[9];
        assert_eq!(content.template_name(), Some(TEMPLATE_CONTENT));
        let words: Vec<&str> = content
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(words.contains(&"two."));

        let style = &fixture.style;
        let frame = content_frame(style);
        let body = &style.text.body;
        let mut size = Pt::ZERO;
        let mut drop_cap = None;
        let mut indented = None;
        for cmd in &content.commands {
            match cmd {
                Command::SetFontSize(current) => size = *current,
                Command::DrawString { x, text, .. } if text == "P" && drop_cap.is_none() => {
                    drop_cap = Some((*x, size));
                }
                Command::DrawString { x, text, .. } if text == "Para" => indented = Some(*x),
                _ => {}
            }
        }
        assert_eq!(drop_cap, Some((frame.x, body.em(style.drop_cap_scale))));
        assert_eq!(indented, Some(frame.x + body.em(style.paragraph_indent_em)));
        let contents_page = rendered
            .pages()
            .iter()
            .find(|page| page.template_name() == Some("contents"))
            .expect("contents page");
        let numbers = contents_page.commands.iter().any(|cmd| {
            matches!(cmd, Command::DrawString { text, .. } if text == "1")
        });
        assert!(numbers);
    }

    fn preface_and_chapter() -> Book {
        book(BookInput {
            title: "Settling".to_string(),
            preface: Some("A preface.".to_string()),
            chapters: vec![record("One", "Body.", None)],
            ..BookInput::default()
        })
    }

    fn unsettled_map() -> PageMap {
        [("preface".to_string(), 7), ("chapter-1".to_string(), 9)]
            .into_iter()
            .collect()
    }

    #[test]
    fn wrong_map_settles_on_the_next_final_pass() {
        let fixture = Fixture::new();
        let book = preface_and_chapter();
        let Ok((_, map, passes)) = fixture.composer().render_final(&book, unsettled_map()) else {
            panic!("expected the map to settle");
        };
        assert_eq!(passes, 3);
        assert_eq!(map.get("preface"), Some(1));
        assert_eq!(map.get("chapter-1"), Some(3));
        assert_eq!(map, fixture.composer().resolve(&book).expect("resolve"));
    }

    #[test]
    fn pass_limit_rejects_a_map_that_never_settles() {
        let mut fixture = Fixture::new();
        fixture.style.max_layout_passes = 1;
        let book = preface_and_chapter();

        let Err(err) = fixture.composer().render_final(&book, unsettled_map()) else {
            panic!("expected the pass limit to trip");
        };
        assert!(matches!(err, BookPressError::LayoutResolution(_)));

        let Err(err) = fixture.composer().compose_with_map(&book, unsettled_map()) else {
            panic!("expected composition to fail");
        };
        assert!(matches!(err, BookPressError::Composition { stage: "final", .. }));
        assert!(matches!(err.root_cause(), BookPressError::LayoutResolution(_)));
    }

    #[test]
    fn temp_names_differ_between_writes() {
        let dir = temp_path("nonce");
        let output = dir.join("same.pdf");
        persist_atomically(b"%PDF-first", &output).expect("first");
        persist_atomically(b"%PDF-second", &output).expect("second");
        assert_eq!(fs::read(&output).expect("read"), b"%PDF-second");
        assert!(WRITE_NONCE.load(Ordering::Relaxed) >= 2);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn composition_is_deterministic() {
        let fixture = Fixture::new();
        let book = three_chapters(None);
        let first = fixture.composer().compose_to_bytes(&book).expect("first");
        let second = fixture.composer().compose_to_bytes(&book).expect("second");
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(sha256_hex(&first.bytes), sha256_hex(&second.bytes));
        assert_eq!(first.page_map, second.page_map);
    }

    #[test]
    fn page_numbers_follow_reading_order() {
        let fixture = Fixture::new();
        let book = book(BookInput {
            title: "Ordered".to_string(),
            preface: Some("A preface.".to_string()),
            prologue: Some("A prologue.".to_string()),
            epilogue: Some("An epilogue.".to_string()),
            chapters: vec![record("One", "Body.", None), record("Two", "Body.", None)],
            ..BookInput::default()
        });
        let composed = fixture.composer().compose_to_bytes(&book).expect("compose");
        let order = ["preface", "prologue", "chapter-1", "chapter-2", "epilogue"];
        let numbers: Vec<usize> = order
            .iter()
            .map(|anchor| composed.page_map.get(anchor).expect("numbered"))
            .collect();
        assert_eq!(numbers[0], 1);
        assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(composed.missing_anchors.is_empty());
    }

    #[test]
    fn blank_epilogue_is_left_out_of_the_contents() {
        let fixture = Fixture::new();
        let book = book(BookInput {
            title: "Quiet".to_string(),
            epilogue: Some("  \n\n ".to_string()),
            chapters: vec![record("Only", "Body.", None)],
            ..BookInput::default()
        });
        let composed = fixture.composer().compose_to_bytes(&book).expect("compose");
        assert_eq!(composed.page_map.len(), 1);
        assert_eq!(composed.page_map.get("epilogue"), None);
        assert!(composed.missing_anchors.is_empty());
    }

    #[test]
    fn illustration_shifts_later_chapters_by_one_page() {
        let fixture = Fixture::new();
        let image = temp_path("plate.png");
        crate::assets::write_test_png(&image, 12, 8, 255);

        let plain = fixture.composer().compose_to_bytes(&three_chapters(None)).expect("plain");
        let illustrated = fixture
            .composer()
            .compose_to_bytes(&three_chapters(Some(image.clone())))
            .expect("illustrated");
        assert_eq!(plain.page_map.get("chapter-1"), illustrated.page_map.get("chapter-1"));
        for anchor in ["chapter-2", "chapter-3"] {
            let before = plain.page_map.get(anchor).expect("plain number");
            let after = illustrated.page_map.get(anchor).expect("illustrated number");
            assert_eq!(after, before + 1);
        }
        assert_eq!(illustrated.page_count, plain.page_count + 1);
        let _ = fs::remove_file(image);
    }

    #[test]
    fn compose_writes_a_linked_pdf_and_reports_it() {
        let fixture = Fixture::new();
        let dir = temp_path("out");
        let output = dir.join("book.pdf");
        let report = fixture
            .composer()
            .compose(&three_chapters(None), &output)
            .expect("compose");
        assert_eq!(report.output, output);
        assert_eq!(report.sha256.len(), 64);
        assert_eq!(report.bytes, fs::metadata(&output).expect("meta").len() as usize);

        let inspected = inspect_pdf_path(&output).expect("inspect");
        assert_eq!(inspected.page_count, report.page_count);
        assert_eq!(inspected.internal_link_count, 3);
        assert_eq!(inspected.outline_item_count, 3);
        assert_eq!(inspected.title.as_deref(), Some("Three"));

        let leftovers: Vec<_> = fs::read_dir(&dir)
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn failed_render_leaves_no_output() {
        let fixture = Fixture::new();
        let output = temp_path("never.pdf");
        let book = three_chapters(Some(PathBuf::from("/nonexistent/bookpress/plate.png")));
        let err = fixture.composer().compose(&book, &output).expect_err("asset");
        assert!(matches!(err, BookPressError::Composition { stage: "probe", .. }));
        assert!(matches!(err.root_cause(), BookPressError::Asset(_)));
        assert!(!output.exists());
    }

    #[test]
    fn output_path_without_file_name_is_rejected() {
        let err = persist_atomically(b"%PDF", Path::new("/")).expect_err("no name");
        assert!(matches!(err, BookPressError::InvalidConfiguration(_)));
    }
}
