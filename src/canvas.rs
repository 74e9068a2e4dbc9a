use crate::types::{Color, Pt, Rect, Size};

pub(crate) const META_PAGE_TEMPLATE_KEY: &str = "__bp_page_template";
pub(crate) const META_PAGE_NUMBER_KEY: &str = "__bp_page_number";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    // Non-rendered metadata used for page-aware reporting. Ignored by the PDF writer.
    Meta {
        key: String,
        value: String,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    SetLineCap(u8),
    SetDash {
        pattern: Vec<Pt>,
        phase: Pt,
    },
    SetFontName(String),
    SetFontSize(Pt),
    SetCharSpacing(Pt),
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    CurveTo {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
        x: Pt,
        y: Pt,
    },
    ClosePath,
    Fill,
    Stroke,
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
    DrawRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
    // Named destination; the page carrying it is where the anchor "begins".
    Anchor {
        name: String,
        y: Pt,
    },
    // Clickable area jumping to the page that carries `target`.
    Link {
        rect: Rect,
        target: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn anchors(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::Anchor { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn anchor_y(&self, anchor: &str) -> Option<Pt> {
        self.commands.iter().find_map(|cmd| match cmd {
            Command::Anchor { name, y } if name == anchor => Some(*y),
            _ => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = (Rect, &str)> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::Link { rect, target } => Some((*rect, target.as_str())),
            _ => None,
        })
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.commands.iter().find_map(|cmd| match cmd {
            Command::Meta { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn template_name(&self) -> Option<&str> {
        self.meta(META_PAGE_TEMPLATE_KEY)
    }

    // Visible folio printed in the footer, if the page is numbered.
    pub fn page_number(&self) -> Option<usize> {
        self.meta(META_PAGE_NUMBER_KEY)
            .and_then(|value| value.parse().ok())
    }

    // True when nothing but metadata was recorded.
    pub fn is_blank(&self) -> bool {
        self.commands
            .iter()
            .all(|cmd| matches!(cmd, Command::Meta { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    // Index of the first page exposing `anchor`.
    pub fn find_anchor(&self, anchor: &str) -> Option<usize> {
        self.pages
            .iter()
            .position(|page| page.anchors().any(|name| name == anchor))
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    line_cap: u8,
    font_size: Pt,
    font_name: String,
    char_spacing: Pt,
}

impl GraphicsState {
    fn initial() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: Pt::from_f32(1.0),
            line_cap: 0,
            font_size: Pt::from_f32(12.0),
            font_name: "Times-Roman".to_string(),
            char_spacing: Pt::ZERO,
        }
    }
}

pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Page,
    state_stack: Vec<GraphicsState>,
    current_state: GraphicsState,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::new(),
            state_stack: Vec::new(),
            current_state: GraphicsState::initial(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn save_state(&mut self) {
        self.state_stack.push(self.current_state.clone());
        self.current.commands.push(Command::SaveState);
    }

    pub fn restore_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.current_state = state;
            self.current.commands.push(Command::RestoreState);
        }
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current.commands.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.current_state.stroke_color == color {
            return;
        }
        self.current_state.stroke_color = color;
        self.current.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = if width < Pt::ZERO { Pt::ZERO } else { width };
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.current.commands.push(Command::SetLineWidth(width));
    }

    pub fn set_line_cap(&mut self, cap: u8) {
        if self.current_state.line_cap == cap {
            return;
        }
        self.current_state.line_cap = cap;
        self.current.commands.push(Command::SetLineCap(cap));
    }

    pub fn set_dash(&mut self, pattern: Vec<Pt>, phase: Pt) {
        self.current
            .commands
            .push(Command::SetDash { pattern, phase });
    }

    pub fn set_font_name(&mut self, name: &str) {
        if self.current_state.font_name == name {
            return;
        }
        self.current_state.font_name = name.to_string();
        self.current
            .commands
            .push(Command::SetFontName(self.current_state.font_name.clone()));
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_state.font_size == size {
            return;
        }
        self.current_state.font_size = size;
        self.current.commands.push(Command::SetFontSize(size));
    }

    pub fn set_char_spacing(&mut self, spacing: Pt) {
        if self.current_state.char_spacing == spacing {
            return;
        }
        self.current_state.char_spacing = spacing;
        self.current.commands.push(Command::SetCharSpacing(spacing));
    }

    pub fn move_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::LineTo { x, y });
    }

    pub fn curve_to(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt, x: Pt, y: Pt) {
        self.current.commands.push(Command::CurveTo {
            x1,
            y1,
            x2,
            y2,
            x,
            y,
        });
    }

    pub fn close_path(&mut self) {
        self.current.commands.push(Command::ClosePath);
    }

    pub fn fill(&mut self) {
        self.current.commands.push(Command::Fill);
    }

    pub fn stroke(&mut self) {
        self.current.commands.push(Command::Stroke);
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
        });
    }

    pub fn draw_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::DrawRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn draw_image(
        &mut self,
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: impl Into<String>,
    ) {
        self.current.commands.push(Command::DrawImage {
            x,
            y,
            width,
            height,
            resource_id: resource_id.into(),
        });
    }

    pub fn anchor(&mut self, name: impl Into<String>, y: Pt) {
        self.current.commands.push(Command::Anchor {
            name: name.into(),
            y,
        });
    }

    pub fn link(&mut self, rect: Rect, target: impl Into<String>) {
        self.current.commands.push(Command::Link {
            rect,
            target: target.into(),
        });
    }

    pub fn show_page(&mut self) {
        let current = std::mem::replace(&mut self.current, Page::new());
        self.pages.push(current);
        self.state_stack.clear();
        self.current_state = GraphicsState::initial();
    }

    pub fn current_command_count(&self) -> usize {
        self.current.commands.len()
    }

    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            self.show_page();
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }

    pub fn finish_without_show(self) -> Document {
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_state_changes_are_elided() {
        let mut canvas = Canvas::new(Size::digest());
        canvas.set_font_size(Pt::from_f32(11.0));
        canvas.set_font_size(Pt::from_f32(11.0));
        canvas.set_fill_color(Color::BLACK);
        assert_eq!(canvas.current_command_count(), 1);
    }

    #[test]
    fn pages_expose_anchors_links_and_template() {
        let mut canvas = Canvas::new(Size::digest());
        canvas.meta(META_PAGE_TEMPLATE_KEY, "blank");
        canvas.show_page();
        canvas.meta(META_PAGE_TEMPLATE_KEY, "content");
        canvas.meta(META_PAGE_NUMBER_KEY, "3");
        canvas.anchor("chapter-1", Pt::from_f32(72.0));
        canvas.link(
            Rect {
                x: Pt::ZERO,
                y: Pt::ZERO,
                width: Pt::from_f32(10.0),
                height: Pt::from_f32(10.0),
            },
            "chapter-1",
        );
        let doc = canvas.finish();

        assert_eq!(doc.page_count(), 2);
        assert!(doc.pages[0].is_blank());
        assert_eq!(doc.pages[0].template_name(), Some("blank"));
        assert_eq!(doc.pages[1].page_number(), Some(3));
        assert_eq!(doc.pages[1].anchors().collect::<Vec<_>>(), vec!["chapter-1"]);
        assert_eq!(doc.pages[1].anchor_y("chapter-1"), Some(Pt::from_f32(72.0)));
        assert_eq!(doc.pages[1].links().count(), 1);
        assert_eq!(doc.find_anchor("chapter-1"), Some(1));
        assert_eq!(doc.find_anchor("epilogue"), None);
    }

    #[test]
    fn finish_always_yields_a_page() {
        let doc = Canvas::new(Size::digest()).finish();
        assert_eq!(doc.page_count(), 1);
    }
}
