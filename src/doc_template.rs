use crate::canvas::{Canvas, Document, META_PAGE_NUMBER_KEY, META_PAGE_TEMPLATE_KEY};
use crate::debug::DebugLogger;
use crate::doc_context::DocContext;
use crate::error::BookPressError;
use crate::flowable::Flowable;
use crate::frame::{AddResult, Frame};
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::page_template::PageTemplate;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Instant;

// A run of flowables that starts on a fresh page laid out with `template`.
// Overflowing content continues on further pages of the same template; a
// section without flowables still produces one (blank) page.
pub struct Section {
    pub template: String,
    pub flowables: Vec<Box<dyn Flowable>>,
}

impl Section {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            flowables: Vec::new(),
        }
    }

    pub fn with(mut self, flowable: impl Flowable + 'static) -> Self {
        self.flowables.push(Box::new(flowable));
        self
    }

    pub fn push(&mut self, flowable: Box<dyn Flowable>) {
        self.flowables.push(flowable);
    }
}

struct Padding {
    template: String,
    multiple: usize,
}

pub struct DocTemplate {
    page_templates: Vec<PageTemplate>,
    sections: Vec<Section>,
    padding: Option<Padding>,
    debug: Option<DebugLogger>,
    debug_doc_id: Option<usize>,
}

struct PageCursor {
    canvas: Canvas,
    frames: Vec<Frame>,
    frame_index: usize,
    page_index: usize,
    page_number: Option<usize>,
    template_name: String,
    counter: usize,
    page_flowables: usize,
    page_start: Instant,
    metrics: DocumentMetrics,
}

impl PageCursor {
    fn start_page(&mut self, template: &PageTemplate) {
        self.page_number = if template.numbered {
            self.counter += 1;
            Some(self.counter)
        } else {
            None
        };
        self.template_name = template.name.clone();
        self.frames = template.instantiate_frames();
        self.frame_index = 0;
        self.page_flowables = 0;
        self.page_start = Instant::now();
        self.canvas
            .meta(META_PAGE_TEMPLATE_KEY, template.name.clone());
        if let Some(number) = self.page_number {
            self.canvas.meta(META_PAGE_NUMBER_KEY, number.to_string());
        }
        if let Some(callback) = template.on_page() {
            let ctx = DocContext::new(self.page_index, self.page_number, &template.name);
            callback(&mut self.canvas, &ctx);
        }
    }

    fn finish_page(&mut self) {
        let elapsed = self.page_start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.total_render_ms += elapsed;
        self.metrics.pages.push(PageMetrics {
            page_index: self.page_index,
            page_number: self.page_number,
            template: self.template_name.clone(),
            render_ms: elapsed,
            command_count: self.canvas.current_command_count(),
            flowable_count: self.page_flowables,
        });
        self.canvas.show_page();
        self.page_index += 1;
    }
}

impl DocTemplate {
    pub fn new(page_templates: Vec<PageTemplate>) -> Self {
        Self {
            page_templates,
            sections: Vec::new(),
            padding: None,
            debug: None,
            debug_doc_id: None,
        }
    }

    pub(crate) fn with_debug(mut self, debug: Option<DebugLogger>, doc_id: Option<usize>) -> Self {
        self.debug = debug;
        self.debug_doc_id = doc_id;
        self
    }

    // Appends pages of `template` until the page count is a multiple of `multiple`.
    pub fn with_page_padding(mut self, template: impl Into<String>, multiple: usize) -> Self {
        if multiple > 1 {
            self.padding = Some(Padding {
                template: template.into(),
                multiple,
            });
        }
        self
    }

    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn build(self) -> Result<Document, BookPressError> {
        Ok(self.build_with_metrics()?.0)
    }

    pub fn build_with_metrics(self) -> Result<(Document, DocumentMetrics), BookPressError> {
        let Some(first) = self.page_templates.first() else {
            return Err(BookPressError::InvalidConfiguration(
                "no page templates configured".to_string(),
            ));
        };

        let find_template = |name: &str| -> Result<&PageTemplate, BookPressError> {
            self.page_templates
                .iter()
                .find(|template| template.name == name)
                .ok_or_else(|| {
                    BookPressError::InvalidConfiguration(format!("unknown page template '{name}'"))
                })
        };

        let log_page_break = |page_index: usize, reason: &str, flowable: Option<&str>| {
            let Some(logger) = self.debug.as_ref() else {
                return;
            };
            logger.log_event(
                "layout.page_break",
                json!({
                    "doc_id": self.debug_doc_id,
                    "reason": reason,
                    "from_page": page_index,
                    "to_page": page_index + 1,
                    "flowable": flowable,
                }),
            );
            logger.increment(&format!("layout.page_break.{reason}"), 1);
        };

        let mut cursor = PageCursor {
            canvas: Canvas::new(first.page_size),
            frames: Vec::new(),
            frame_index: 0,
            page_index: 0,
            page_number: None,
            template_name: String::new(),
            counter: 0,
            page_flowables: 0,
            page_start: Instant::now(),
            metrics: DocumentMetrics::default(),
        };

        for (section_index, section) in self.sections.into_iter().enumerate() {
            let template = find_template(&section.template)?;
            if section_index > 0 {
                log_page_break(cursor.page_index, "section_start", None);
                cursor.finish_page();
            }
            cursor.start_page(template);

            let mut story: VecDeque<Box<dyn Flowable>> = section.flowables.into();
            let mut placed_on_page = false;
            while let Some(flowable) = story.pop_front() {
                let mut current = flowable;
                loop {
                    if cursor.frame_index >= cursor.frames.len() {
                        if cursor.frames.is_empty() {
                            return Err(BookPressError::InvalidConfiguration(format!(
                                "page template '{}' has no frames",
                                template.name
                            )));
                        }
                        log_page_break(
                            cursor.page_index,
                            "frame_exhausted",
                            Some(current.debug_name()),
                        );
                        cursor.finish_page();
                        cursor.start_page(template);
                        placed_on_page = false;
                    }

                    let is_last_frame = cursor.frame_index + 1 >= cursor.frames.len();
                    let name = current.debug_name();
                    let frame_index = cursor.frame_index;
                    match cursor.frames[frame_index].add(current, &mut cursor.canvas) {
                        AddResult::Placed => {
                            placed_on_page = true;
                            cursor.page_flowables += 1;
                            break;
                        }
                        AddResult::Split(remaining) => {
                            placed_on_page = true;
                            cursor.page_flowables += 1;
                            log_page_break(cursor.page_index, "flowable_split", Some(name));
                            current = remaining;
                            cursor.frame_index += 1;
                        }
                        AddResult::Overflow(remaining) => {
                            if !placed_on_page && is_last_frame {
                                let rect = cursor.frames[frame_index].rect();
                                return Err(BookPressError::UnplaceableFlowable(format!(
                                    "{} frame={}x{}pt template={}",
                                    name,
                                    rect.width.to_f32(),
                                    rect.height.to_f32(),
                                    template.name
                                )));
                            }
                            log_page_break(cursor.page_index, "frame_overflow", Some(name));
                            current = remaining;
                            cursor.frame_index += 1;
                        }
                    }
                }
            }
        }

        if cursor.template_name.is_empty() {
            cursor.start_page(first);
        }
        cursor.finish_page();

        if let Some(padding) = &self.padding {
            let template = find_template(&padding.template)?;
            while cursor.page_index % padding.multiple != 0 {
                cursor.start_page(template);
                cursor.finish_page();
            }
        }

        if let Some(logger) = self.debug.as_ref() {
            logger.increment("layout.pages", cursor.page_index as u64);
        }
        Ok((cursor.canvas.finish_without_show(), cursor.metrics))
    }
}
