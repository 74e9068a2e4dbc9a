use crate::assets::{ImageStore, source_key};
use crate::canvas::{Canvas, Document, Page};
use crate::debug::{DebugLogger, warn};
use crate::doc_context::DocContext;
use crate::doc_template::{DocTemplate, Section};
use crate::error::BookPressError;
use crate::flowable::{
    AnchorMarker, CenteredBlock, DropCap, Flowable, ImageFlowable, Ornament, Pagination,
    Paragraph, Spacer, TextAlign, TextStyle, TocRow,
};
use crate::font::{BASE14_BOLD, BASE14_ITALIC, BASE14_REGULAR, FontRegistry};
use crate::metrics::DocumentMetrics;
use crate::model::{Book, TextBlock};
use crate::page_template::PageTemplate;
use crate::resolve::PageMap;
use crate::style::{FontFace, FontFiles, StyleConfig, TextRule};
use crate::toc::{
    EPILOGUE_ANCHOR, PREFACE_ANCHOR, PROLOGUE_ANCHOR, TocEntry, chapter_anchor,
    toc_entries_with_labels,
};
use crate::types::{Pt, Rect};
use serde_json::json;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

pub(crate) const TEMPLATE_FILLER: &str = "filler";
pub(crate) const TEMPLATE_COVER: &str = "cover";
pub(crate) const TEMPLATE_TITLE: &str = "title";
pub(crate) const TEMPLATE_PRINT_DATE: &str = "print-date";
pub(crate) const TEMPLATE_CONTENTS: &str = "contents";
pub(crate) const TEMPLATE_BODY_FILLER: &str = "body-filler";
pub(crate) const TEMPLATE_CHAPTER_TITLE: &str = "chapter-title";
pub(crate) const TEMPLATE_IMAGE: &str = "image";
pub(crate) const TEMPLATE_CONTENT: &str = "content";
pub(crate) const TEMPLATE_PADDING: &str = "padding";

// Widest page number the contents column is sized for.
const NUMBER_COLUMN_SAMPLE: &str = "0000";

// Registered font names for the three faces the layout uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Faces {
    regular: String,
    italic: String,
    bold: String,
}

impl Faces {
    pub(crate) fn base14() -> Self {
        Self {
            regular: BASE14_REGULAR.to_string(),
            italic: BASE14_ITALIC.to_string(),
            bold: BASE14_BOLD.to_string(),
        }
    }

    // Registers the configured font files; faces without a file stay base-14.
    pub(crate) fn load(fonts: &mut FontRegistry, files: &FontFiles) -> Result<Self, BookPressError> {
        let mut faces = Self::base14();
        let slots = [
            (&files.regular, &mut faces.regular),
            (&files.italic, &mut faces.italic),
            (&files.bold, &mut faces.bold),
        ];
        for (path, slot) in slots {
            if let Some(path) = path {
                *slot = fonts.register_file(path)?;
            }
        }
        Ok(faces)
    }

    pub(crate) fn name(&self, face: FontFace) -> &str {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Italic => &self.italic,
            FontFace::Bold => &self.bold,
        }
    }
}

// Output of one renderer invocation: the physical pages plus what the PDF
// writer needs to turn them into bytes.
pub struct RenderedDocument {
    pub(crate) document: Document,
    pub(crate) images: ImageStore,
    pub(crate) metrics: DocumentMetrics,
    pub(crate) outline: Vec<TocEntry>,
    missing_page_numbers: Vec<String>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    pub fn pages(&self) -> &[Page] {
        &self.document.pages
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn metrics(&self) -> &DocumentMetrics {
        &self.metrics
    }

    // Anchors that begin on the page at `index`.
    pub fn anchors_on_page(&self, index: usize) -> Vec<&str> {
        self.document
            .pages
            .get(index)
            .map(|page| page.anchors().collect())
            .unwrap_or_default()
    }

    // Contents anchors printed without a page number.
    pub fn missing_page_numbers(&self) -> &[String] {
        &self.missing_page_numbers
    }
}

pub(crate) struct BookRenderer<'a> {
    style: &'a StyleConfig,
    fonts: Arc<FontRegistry>,
    faces: &'a Faces,
    debug: Option<&'a DebugLogger>,
    doc_id: Option<usize>,
}

impl<'a> BookRenderer<'a> {
    pub(crate) fn new(style: &'a StyleConfig, fonts: Arc<FontRegistry>, faces: &'a Faces) -> Self {
        Self {
            style,
            fonts,
            faces,
            debug: None,
            doc_id: None,
        }
    }

    pub(crate) fn with_debug(mut self, debug: Option<&'a DebugLogger>, doc_id: Option<usize>) -> Self {
        self.debug = debug;
        self.doc_id = doc_id;
        self
    }

    // Probe mode when `page_map` is None: the contents column stays empty.
    pub(crate) fn render(
        &self,
        book: &Book,
        page_map: Option<&PageMap>,
    ) -> Result<RenderedDocument, BookPressError> {
        let entries = toc_entries_with_labels(book, &self.style.labels);
        let mut images = ImageStore::new();

        let mut doc = DocTemplate::new(self.page_templates())
            .with_debug(self.debug.cloned(), self.doc_id);
        if let Some(pages) = self.style.signature_pages {
            doc = doc.with_page_padding(TEMPLATE_PADDING, pages);
        }

        self.front_matter(&mut doc, book, &entries, page_map, &mut images)?;
        self.body(&mut doc, book, &mut images)?;

        let (document, metrics) = doc.build_with_metrics()?;

        let missing_page_numbers: Vec<String> = match page_map {
            Some(map) => map.missing(&entries).into_iter().map(str::to_string).collect(),
            None => Vec::new(),
        };
        for anchor in &missing_page_numbers {
            if let Some(logger) = self.debug {
                logger.log_event(
                    "toc.missing_page_number",
                    json!({ "doc_id": self.doc_id, "anchor": anchor }),
                );
                logger.increment("toc.missing_page_number", 1);
            }
        }

        Ok(RenderedDocument {
            document,
            images,
            metrics,
            outline: entries,
            missing_page_numbers,
        })
    }

    fn page_templates(&self) -> Vec<PageTemplate> {
        let size = self.style.page_size();
        let margins = self.style.margins();
        let frame = margins.content_rect(size);
        let page = |name: &str, numbered: bool| {
            PageTemplate::new(name, size)
                .with_frame(frame)
                .numbered(numbered)
        };

        let footer = self.style.text.footer.clone();
        let font_name = self.faces.name(footer.face).to_string();
        let fonts = Arc::clone(&self.fonts);
        let footer_band = margins.bottom;
        let draw_footer = move |canvas: &mut Canvas, ctx: &DocContext| {
            let Some(number) = ctx.page_number else {
                return;
            };
            let text = number.to_string();
            let size = footer.font_size();
            let width = fonts.measure_text_width(&font_name, size, &text);
            let page = canvas.page_size();
            let x = (page.width - width) / 2;
            let y = page.height - footer_band / 2 - size / 2;
            canvas.save_state();
            canvas.set_fill_color(footer.color());
            canvas.set_font_name(&font_name);
            canvas.set_font_size(size);
            canvas.draw_string(x, y, text);
            canvas.restore_state();
        };

        vec![
            page(TEMPLATE_FILLER, false),
            page(TEMPLATE_COVER, false),
            page(TEMPLATE_TITLE, false),
            page(TEMPLATE_PRINT_DATE, false),
            page(TEMPLATE_CONTENTS, false),
            page(TEMPLATE_BODY_FILLER, true),
            page(TEMPLATE_CHAPTER_TITLE, true).set_on_page(draw_footer.clone()),
            page(TEMPLATE_IMAGE, true).set_on_page(draw_footer.clone()),
            page(TEMPLATE_CONTENT, true).set_on_page(draw_footer),
            page(TEMPLATE_PADDING, false),
        ]
    }

    fn front_matter(
        &self,
        doc: &mut DocTemplate,
        book: &Book,
        entries: &[TocEntry],
        page_map: Option<&PageMap>,
        images: &mut ImageStore,
    ) -> Result<(), BookPressError> {
        let text = &self.style.text;
        let labels = &self.style.labels;

        doc.add_section(Section::new(TEMPLATE_FILLER));
        doc.add_section(Section::new(TEMPLATE_FILLER));

        if let Some(cover) = book.cover_image() {
            let image = self.image(cover, images)?;
            doc.add_section(Section::new(TEMPLATE_COVER).with(image));
        }

        let ornament_gap = || Box::new(Spacer::new_pt(text.ornament.em(1.0))) as Box<dyn Flowable>;
        let title_block = CenteredBlock::new(vec![
            Box::new(Ornament::new(text.ornament.font_size(), text.ornament.color(), false)),
            ornament_gap(),
            Box::new(self.paragraph(book.title(), &text.title).with_align(TextAlign::Center)),
            ornament_gap(),
            Box::new(Ornament::new(text.ornament.font_size(), text.ornament.color(), true)),
            Box::new(Spacer::new_pt(text.subtitle.em(1.0))),
            Box::new(self.paragraph(&labels.subtitle, &text.subtitle).with_align(TextAlign::Center)),
        ]);
        doc.add_section(Section::new(TEMPLATE_TITLE).with(title_block));

        let mut date = String::new();
        if write!(date, "{}", book.print_date().format(&labels.print_date_format)).is_err() {
            date = book.print_date().to_string();
        }
        let date_block = CenteredBlock::new(vec![
            Box::new(
                self.paragraph(&labels.print_date_prefix, &text.print_date)
                    .with_align(TextAlign::Center),
            ),
            Box::new(self.paragraph(&date, &text.print_date).with_align(TextAlign::Center)),
        ]);
        doc.add_section(Section::new(TEMPLATE_PRINT_DATE).with(date_block));

        doc.add_section(Section::new(TEMPLATE_FILLER));
        doc.add_section(Section::new(TEMPLATE_FILLER));

        doc.add_section(self.contents(entries, page_map));
        doc.add_section(Section::new(TEMPLATE_FILLER));
        Ok(())
    }

    fn contents(&self, entries: &[TocEntry], page_map: Option<&PageMap>) -> Section {
        let heading_rule = &self.style.text.contents_heading;
        let entry_rule = &self.style.text.contents_entry;
        let entry_font = self.faces.name(entry_rule.face);
        let number_column =
            self.fonts
                .measure_text_width(entry_font, entry_rule.font_size(), NUMBER_COLUMN_SAMPLE);
        let gap = entry_rule.em(0.7);

        let mut section = Section::new(TEMPLATE_CONTENTS)
            .with(Spacer::new_pt(heading_rule.em(2.0)))
            .with(
                self.paragraph(&self.style.labels.contents_heading, heading_rule)
                    .with_align(TextAlign::Center),
            )
            .with(Spacer::new_pt(heading_rule.em(1.2)));

        for entry in entries {
            let title = self.paragraph(&entry.title, entry_rule);
            let row = TocRow::new(title, entry.anchor.clone(), number_column, gap)
                .with_number(page_map.and_then(|map| map.get(&entry.anchor)))
                .with_width_ratio(i32::from(self.style.contents_width_percent), 100);
            section.push(Box::new(row));
            section.push(Box::new(Spacer::new_pt(gap)));
        }
        section
    }

    fn body(
        &self,
        doc: &mut DocTemplate,
        book: &Book,
        images: &mut ImageStore,
    ) -> Result<(), BookPressError> {
        let labels = &self.style.labels;

        if let Some(preface) = book.preface() {
            doc.add_section(self.text_block(preface, PREFACE_ANCHOR, &labels.preface));
            doc.add_section(Section::new(TEMPLATE_BODY_FILLER));
        }
        if let Some(prologue) = book.prologue() {
            let title = prologue.title().unwrap_or(&labels.prologue);
            doc.add_section(self.text_block(prologue, PROLOGUE_ANCHOR, title));
            doc.add_section(Section::new(TEMPLATE_BODY_FILLER));
        }

        let number_rule = &self.style.text.chapter_number;
        let heading_rule = &self.style.text.chapter_heading;
        for (idx, chapter) in book.chapters().iter().enumerate() {
            let number = idx + 1;
            let label = format!("{} {}", labels.chapter_number_prefix, number);
            let title_block = CenteredBlock::new(vec![
                Box::new(self.paragraph(&label, number_rule).with_align(TextAlign::Center)),
                Box::new(Spacer::new_pt(number_rule.em(1.5))),
                Box::new(
                    self.paragraph(chapter.heading(), heading_rule)
                        .with_align(TextAlign::Center),
                ),
            ]);
            doc.add_section(
                Section::new(TEMPLATE_CHAPTER_TITLE)
                    .with(AnchorMarker::new(chapter_anchor(number)))
                    .with(title_block),
            );

            if let Some(path) = chapter.image() {
                let image = self.image(path, images)?;
                doc.add_section(Section::new(TEMPLATE_IMAGE).with(image));
            }

            let mut content = Section::new(TEMPLATE_CONTENT);
            self.prose(&mut content, chapter.paragraphs());
            doc.add_section(content);
        }

        if let Some(epilogue) = book.epilogue() {
            let title = epilogue.title().unwrap_or(&labels.epilogue);
            doc.add_section(Section::new(TEMPLATE_BODY_FILLER));
            doc.add_section(self.text_block(epilogue, EPILOGUE_ANCHOR, title));
        }
        Ok(())
    }

    fn text_block(&self, block: &TextBlock, anchor: &str, title: &str) -> Section {
        let rule = &self.style.text.section_heading;
        let mut section = Section::new(TEMPLATE_CONTENT)
            .with(AnchorMarker::new(anchor))
            .with(
                self.paragraph(title, rule)
                    .with_align(TextAlign::Center)
                    .with_pagination(Pagination::avoid()),
            )
            .with(Spacer::new_pt(rule.em(2.5)));
        self.prose(&mut section, block.paragraphs());
        section
    }

    // Justified paragraphs: the first opens with a drop cap and no indent, the
    // rest are indented and separated by a gap.
    fn prose(&self, section: &mut Section, paragraphs: &[String]) {
        let rule = &self.style.text.body;
        let mut first = true;
        for text in paragraphs {
            if text.trim().is_empty() {
                continue;
            }
            let paragraph = self.paragraph(text, rule).with_align(TextAlign::Justify);
            if first {
                let drop_cap = DropCap {
                    font_name: Arc::from(self.faces.name(FontFace::Bold)),
                    font_size: rule.em(self.style.drop_cap_scale),
                };
                section.push(Box::new(paragraph.with_drop_cap(Some(drop_cap))));
                first = false;
            } else {
                section.push(Box::new(Spacer::new_pt(rule.em(self.style.paragraph_gap_em))));
                section.push(Box::new(
                    paragraph.with_first_line_indent(rule.em(self.style.paragraph_indent_em)),
                ));
            }
        }
    }

    fn paragraph(&self, text: &str, rule: &TextRule) -> Paragraph {
        let style = TextStyle::new(self.faces.name(rule.face), rule.font_size(), rule.leading())
            .with_color(rule.color())
            .with_letter_spacing(rule.em(rule.letter_spacing));
        Paragraph::new(&rule.apply_case(text), style, Arc::clone(&self.fonts))
    }

    fn image(&self, path: &Path, images: &mut ImageStore) -> Result<ImageFlowable, BookPressError> {
        let data = images.load_path(path).map_err(|err| {
            warn("layout", &format!("image {} unusable: {err}", path.display()));
            err
        })?;
        Ok(ImageFlowable::new(source_key(path), data.width, data.height))
    }
}

// Content frame shared by every page template.
pub(crate) fn content_frame(style: &StyleConfig) -> Rect {
    style.margins().content_rect(style.page_size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::model::{BookInput, ChapterRecord, build_book};
    use crate::resolve::page_map_from_document;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn record(heading: &str, content: &str, image: Option<PathBuf>) -> ChapterRecord {
        ChapterRecord {
            heading: Some(heading.to_string()),
            content: Some(content.to_string()),
            image,
        }
    }

    fn sample_book(chapters: Vec<ChapterRecord>) -> Book {
        build_book(&BookInput {
            title: "Sample".to_string(),
            chapters,
            print_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            ..BookInput::default()
        })
        .expect("book")
    }

    fn render(book: &Book, map: Option<&PageMap>) -> RenderedDocument {
        let style = StyleConfig::default();
        let faces = Faces::base14();
        BookRenderer::new(&style, Arc::new(FontRegistry::new()), &faces)
            .render(book, map)
            .expect("render")
    }

    fn templates(doc: &RenderedDocument) -> Vec<&str> {
        doc.pages()
            .iter()
            .map(|page| page.template_name().unwrap_or(""))
            .collect()
    }

    fn strings(page: &Page) -> Vec<&str> {
        page.commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn single_chapter_book_follows_page_flow() {
        let book = sample_book(vec![record("Beginnings", "Para one.\n\nPara two.", None)]);
        let doc = render(&book, None);
        assert_eq!(
            templates(&doc),
            vec![
                TEMPLATE_FILLER,
                TEMPLATE_FILLER,
                TEMPLATE_TITLE,
                TEMPLATE_PRINT_DATE,
                TEMPLATE_FILLER,
                TEMPLATE_FILLER,
                TEMPLATE_CONTENTS,
                TEMPLATE_FILLER,
                TEMPLATE_CHAPTER_TITLE,
                TEMPLATE_CONTENT,
            ]
        );
        assert_eq!(doc.anchors_on_page(8), vec!["chapter-1"]);
        assert_eq!(doc.pages()[8].page_number(), Some(1));
        assert_eq!(doc.pages()[9].page_number(), Some(2));
        assert!(doc.pages()[0].is_blank());
        assert!(doc.missing_page_numbers().is_empty());

        let title_strings = strings(&doc.pages()[2]);
        assert!(title_strings.contains(&"Sample"));
        assert!(title_strings.contains(&"PERSONAL"));
        let date_strings = strings(&doc.pages()[3]).join(" ");
        assert!(date_strings.contains("May 01, 2024"));
        let chapter_strings = strings(&doc.pages()[8]);
        assert!(chapter_strings.contains(&"CHAPTER"));
        assert!(chapter_strings.contains(&"Beginnings"));
    }

    #[test]
    fn contents_numbers_appear_only_in_final_mode() {
        let book = sample_book(vec![record("Beginnings", "Body.", None)]);
        let probe = render(&book, None);
        let contents = &probe.pages()[6];
        assert_eq!(contents.links().count(), 1);
        assert!(!strings(contents).contains(&"1"));

        let mut map = PageMap::new();
        map.insert("chapter-1", 1);
        let fin = render(&book, Some(&map));
        assert!(strings(&fin.pages()[6]).contains(&"1"));
        assert_eq!(probe.page_count(), fin.page_count());
        let probe_links: Vec<_> = probe.pages()[6].links().map(|(rect, _)| rect).collect();
        let final_links: Vec<_> = fin.pages()[6].links().map(|(rect, _)| rect).collect();
        assert_eq!(probe_links, final_links);
    }

    #[test]
    fn missing_page_numbers_are_reported() {
        let book = sample_book(vec![record("One", "Body.", None), record("Two", "Body.", None)]);
        let mut map = PageMap::new();
        map.insert("chapter-1", 1);
        let doc = render(&book, Some(&map));
        assert_eq!(doc.missing_page_numbers(), &["chapter-2".to_string()]);
    }

    #[test]
    fn front_and_back_matter_use_fillers_between_sections() {
        let book = build_book(&BookInput {
            title: "Full".to_string(),
            preface: Some("Opening words.".to_string()),
            prologue: Some("Before.".to_string()),
            epilogue: Some("After.".to_string()),
            chapters: vec![record("Only", "Text.", None)],
            ..BookInput::default()
        })
        .expect("book");
        let doc = render(&book, None);
        let body: Vec<&str> = templates(&doc)[8..].to_vec();
        assert_eq!(
            body,
            vec![
                TEMPLATE_CONTENT,
                TEMPLATE_BODY_FILLER,
                TEMPLATE_CONTENT,
                TEMPLATE_BODY_FILLER,
                TEMPLATE_CHAPTER_TITLE,
                TEMPLATE_CONTENT,
                TEMPLATE_BODY_FILLER,
                TEMPLATE_CONTENT,
            ]
        );
        assert_eq!(doc.anchors_on_page(8), vec!["preface"]);
        assert_eq!(doc.anchors_on_page(10), vec!["prologue"]);
        assert_eq!(doc.anchors_on_page(15), vec!["epilogue"]);
        assert!(strings(&doc.pages()[8]).contains(&"PREFACE"));
        // Body fillers count but print no folio.
        assert_eq!(doc.pages()[9].page_number(), Some(2));
        assert!(strings(&doc.pages()[9]).is_empty());
    }

    #[test]
    fn illustrated_chapter_gets_an_image_page() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "bookpress_layout_{}_{}.png",
            std::process::id(),
            nanos
        ));
        crate::assets::write_test_png(&path, 30, 20, 255);
        let book = sample_book(vec![record("Seen", "Text.", Some(path.clone()))]);
        let doc = render(&book, None);
        assert_eq!(templates(&doc)[9], TEMPLATE_IMAGE);
        assert_eq!(doc.images.len(), 1);
        let frame = content_frame(&StyleConfig::default());
        let drawn = doc.pages()[9].commands.iter().find_map(|cmd| match cmd {
            Command::DrawImage { width, y, .. } => Some((*width, *y)),
            _ => None,
        });
        assert_eq!(drawn, Some((frame.width, frame.y)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn cover_page_leaves_body_numbering_alone() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "bookpress_layout_cover_{}_{}.png",
            std::process::id(),
            nanos
        ));
        crate::assets::write_test_png(&path, 20, 30, 255);
        let book = |cover: Option<PathBuf>| {
            build_book(&BookInput {
                title: "Covered".to_string(),
                preface: Some("Before.".to_string()),
                chapters: vec![record("One", "Body.", None)],
                cover_image: cover,
                print_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
                ..BookInput::default()
            })
            .expect("book")
        };
        let plain_book = book(None);
        let plain = render(&plain_book, None);
        let covered = render(&book(Some(path.clone())), None);

        assert_eq!(templates(&covered)[2], TEMPLATE_COVER);
        assert_eq!(covered.page_count(), plain.page_count() + 1);
        let entries = toc_entries_with_labels(&plain_book, &StyleConfig::default().labels);
        let plain_map = page_map_from_document(plain.document(), &entries).expect("plain map");
        let covered_map =
            page_map_from_document(covered.document(), &entries).expect("covered map");
        assert_eq!(plain_map.get("preface"), Some(1));
        assert_eq!(covered_map, plain_map);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unreadable_image_fails_the_render() {
        let book = sample_book(vec![record(
            "Lost",
            "Text.",
            Some(PathBuf::from("/nonexistent/bookpress/lost.png")),
        )]);
        let style = StyleConfig::default();
        let faces = Faces::base14();
        let result = BookRenderer::new(&style, Arc::new(FontRegistry::new()), &faces).render(&book, None);
        assert!(matches!(result, Err(BookPressError::Asset(_))));
    }

    #[test]
    fn signature_padding_rounds_up_with_blank_pages() {
        let book = sample_book(vec![record("Beginnings", "Body.", None)]);
        let style = StyleConfig {
            signature_pages: Some(16),
            ..StyleConfig::default()
        };
        let faces = Faces::base14();
        let doc = BookRenderer::new(&style, Arc::new(FontRegistry::new()), &faces)
            .render(&book, None)
            .expect("render");
        assert_eq!(doc.page_count(), 16);
        assert_eq!(doc.pages()[15].template_name(), Some(TEMPLATE_PADDING));
        assert_eq!(doc.pages()[15].page_number(), None);
    }
}
