use crate::canvas::Canvas;
use crate::font::FontRegistry;
use crate::types::{Color, Pt, Rect, Size};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakInside {
    Auto,
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub break_inside: BreakInside,
    pub orphans: usize,
    pub widows: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            break_inside: BreakInside::Auto,
            orphans: 2,
            widows: 2,
        }
    }
}

impl Pagination {
    pub fn avoid() -> Self {
        Self {
            break_inside: BreakInside::Avoid,
            ..Self::default()
        }
    }

    fn resolved_orphans(self) -> usize {
        self.orphans.max(1)
    }

    fn resolved_widows(self) -> usize {
        self.widows.max(1)
    }
}

pub trait Flowable: FlowableClone + Send + Sync {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size;
    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)>;
    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt);

    fn pagination(&self) -> Pagination {
        Pagination::default()
    }

    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub trait FlowableClone {
    fn clone_box(&self) -> Box<dyn Flowable>;
}

impl<T> FlowableClone for T
where
    T: 'static + Flowable + Clone,
{
    fn clone_box(&self) -> Box<dyn Flowable> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Flowable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font_name: Arc<str>,
    pub font_size: Pt,
    pub line_height: Pt,
    pub color: Color,
    pub letter_spacing: Pt,
}

impl TextStyle {
    pub fn new(font_name: impl Into<Arc<str>>, font_size: Pt, line_height: Pt) -> Self {
        Self {
            font_name: font_name.into(),
            font_size,
            line_height,
            color: Color::BLACK,
            letter_spacing: Pt::ZERO,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_letter_spacing(mut self, spacing: Pt) -> Self {
        self.letter_spacing = spacing;
        self
    }

    fn half_leading(&self) -> Pt {
        (self.line_height - self.font_size).max(Pt::ZERO) / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

// Enlarged opening letter of a paragraph, sharing the first line's baseline.
#[derive(Debug, Clone)]
pub struct DropCap {
    pub font_name: Arc<str>,
    pub font_size: Pt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LineLayout {
    start: usize,
    end: usize,
    width: Pt,
    height: Pt,
}

type LayoutCache = Arc<Mutex<Option<(i64, Arc<Vec<LineLayout>>)>>>;

// Word-wrapped block of text. Continuations produced by `split` carry the
// remaining words and drop the first-line indent and drop cap.
#[derive(Clone)]
pub struct Paragraph {
    words: Arc<Vec<String>>,
    start: usize,
    end: usize,
    // Whether the last laid-out line is also the last line of the source paragraph.
    is_tail: bool,
    style: TextStyle,
    align: TextAlign,
    first_line_indent: Pt,
    drop_cap: Option<DropCap>,
    pagination: Pagination,
    fonts: Arc<FontRegistry>,
    layout_cache: LayoutCache,
}

impl Paragraph {
    pub(crate) fn new(text: &str, style: TextStyle, fonts: Arc<FontRegistry>) -> Self {
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let end = words.len();
        Self {
            words: Arc::new(words),
            start: 0,
            end,
            is_tail: true,
            style,
            align: TextAlign::Left,
            first_line_indent: Pt::ZERO,
            drop_cap: None,
            pagination: Pagination::default(),
            fonts,
            layout_cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_first_line_indent(mut self, indent: Pt) -> Self {
        self.first_line_indent = indent.max(Pt::ZERO);
        self
    }

    pub fn with_drop_cap(mut self, drop_cap: Option<DropCap>) -> Self {
        self.drop_cap = drop_cap;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn text(&self) -> String {
        self.words[self.start..self.end].join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn first_line_indent(&self) -> Pt {
        self.first_line_indent
    }

    pub fn has_drop_cap(&self) -> bool {
        self.drop_cap.is_some()
    }

    fn measure(&self, font_name: &str, font_size: Pt, text: &str) -> Pt {
        let spacing = self.style.letter_spacing * (text.chars().count() as i32);
        self.fonts.measure_text_width(font_name, font_size, text) + spacing
    }

    fn space_width(&self) -> Pt {
        self.measure(&self.style.font_name, self.style.font_size, " ")
    }

    // (drop cap glyph width, remainder width) for the word at `index`.
    fn word_parts(&self, index: usize) -> (Pt, Pt) {
        let word = &self.words[index];
        if index == self.start {
            if let Some(cap) = &self.drop_cap {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    let first = first.to_string();
                    let cap_width = self.measure(&cap.font_name, cap.font_size, &first);
                    let rest = self.measure(&self.style.font_name, self.style.font_size, chars.as_str());
                    return (cap_width, rest);
                }
            }
        }
        (
            Pt::ZERO,
            self.measure(&self.style.font_name, self.style.font_size, word),
        )
    }

    fn word_width(&self, index: usize) -> Pt {
        let (cap, rest) = self.word_parts(index);
        cap + rest
    }

    fn first_line_height(&self) -> Pt {
        match &self.drop_cap {
            Some(cap) => {
                let grown = cap.font_size + self.style.line_height - self.style.font_size;
                grown.max(self.style.line_height)
            }
            None => self.style.line_height,
        }
    }

    fn layout_lines(&self, avail_width: Pt) -> Arc<Vec<LineLayout>> {
        let key = avail_width.to_milli_i64();
        if let Ok(cache) = self.layout_cache.lock() {
            if let Some((cached_key, lines)) = cache.as_ref() {
                if *cached_key == key {
                    return lines.clone();
                }
            }
        }

        let space = self.space_width();
        let mut lines = Vec::new();
        let mut index = self.start;
        while index < self.end {
            let first = lines.is_empty();
            let limit = if first {
                avail_width - self.first_line_indent
            } else {
                avail_width
            };
            let line_start = index;
            let mut width = self.word_width(index);
            index += 1;
            while index < self.end {
                let next = width + space + self.word_width(index);
                if next > limit {
                    break;
                }
                width = next;
                index += 1;
            }
            let height = if first {
                self.first_line_height()
            } else {
                self.style.line_height
            };
            lines.push(LineLayout {
                start: line_start,
                end: index,
                width,
                height,
            });
        }

        let lines = Arc::new(lines);
        if let Ok(mut cache) = self.layout_cache.lock() {
            *cache = Some((key, lines.clone()));
        }
        lines
    }

    fn fragment(&self, start: usize, end: usize, is_tail: bool, continuation: bool) -> Paragraph {
        Paragraph {
            words: self.words.clone(),
            start,
            end,
            is_tail,
            style: self.style.clone(),
            align: self.align,
            first_line_indent: if continuation {
                Pt::ZERO
            } else {
                self.first_line_indent
            },
            drop_cap: if continuation {
                None
            } else {
                self.drop_cap.clone()
            },
            pagination: self.pagination,
            fonts: self.fonts.clone(),
            layout_cache: Arc::new(Mutex::new(None)),
        }
    }

    fn draw_line(
        &self,
        canvas: &mut Canvas,
        line: &LineLayout,
        x: Pt,
        top: Pt,
        avail_width: Pt,
        is_first: bool,
        is_last: bool,
    ) {
        let indent = if is_first {
            self.first_line_indent
        } else {
            Pt::ZERO
        };
        let line_box = (avail_width - indent).max(Pt::ZERO);
        let slack = (line_box - line.width).max(Pt::ZERO);
        let gaps = (line.end - line.start).saturating_sub(1);
        let (offset, extra_gap) = match self.align {
            TextAlign::Left => (Pt::ZERO, Pt::ZERO),
            TextAlign::Center => (slack / 2, Pt::ZERO),
            TextAlign::Right => (slack, Pt::ZERO),
            TextAlign::Justify if is_last || gaps == 0 => (Pt::ZERO, Pt::ZERO),
            TextAlign::Justify => (Pt::ZERO, slack / (gaps as i32)),
        };

        let half_leading = self.style.half_leading();
        let cap = if is_first { self.drop_cap.as_ref() } else { None };
        let baseline = match cap {
            Some(cap) => top + half_leading + cap.font_size,
            None => top + half_leading + self.style.font_size,
        };
        let space = self.space_width();
        let mut cursor_x = x + indent + offset;

        if self.style.letter_spacing != Pt::ZERO {
            canvas.set_char_spacing(self.style.letter_spacing);
        }
        for index in line.start..line.end {
            let word = &self.words[index];
            let (cap_width, rest_width) = self.word_parts(index);
            match cap {
                Some(cap) if index == line.start && cap_width > Pt::ZERO => {
                    let mut chars = word.chars();
                    let first = chars.next().map(|c| c.to_string()).unwrap_or_default();
                    canvas.set_font_name(&cap.font_name);
                    canvas.set_font_size(cap.font_size);
                    canvas.draw_string(cursor_x, baseline - cap.font_size, first);
                    canvas.set_font_name(&self.style.font_name);
                    canvas.set_font_size(self.style.font_size);
                    if !chars.as_str().is_empty() {
                        canvas.draw_string(
                            cursor_x + cap_width,
                            baseline - self.style.font_size,
                            chars.as_str(),
                        );
                    }
                }
                _ => {
                    canvas.set_font_name(&self.style.font_name);
                    canvas.set_font_size(self.style.font_size);
                    canvas.draw_string(cursor_x, baseline - self.style.font_size, word.as_str());
                }
            }
            cursor_x = cursor_x + cap_width + rest_width + space + extra_gap;
        }
        if self.style.letter_spacing != Pt::ZERO {
            canvas.set_char_spacing(Pt::ZERO);
        }
    }
}

impl std::fmt::Debug for Paragraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paragraph")
            .field("text", &self.text())
            .field("align", &self.align)
            .field("first_line_indent", &self.first_line_indent)
            .field("drop_cap", &self.drop_cap.is_some())
            .finish()
    }
}

impl Flowable for Paragraph {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let lines = self.layout_lines(avail_width);
        let height = lines.iter().map(|line| line.height).sum();
        Size {
            width: avail_width,
            height,
        }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        if matches!(self.pagination.break_inside, BreakInside::Avoid) {
            return None;
        }
        let lines = self.layout_lines(avail_width);
        let total_lines = lines.len();
        let mut used = Pt::ZERO;
        let mut max_lines = 0usize;
        for line in lines.iter() {
            if used + line.height > avail_height {
                break;
            }
            used = used + line.height;
            max_lines += 1;
        }
        if max_lines == 0 || max_lines >= total_lines {
            return None;
        }

        let orphans = self.pagination.resolved_orphans();
        let widows = self.pagination.resolved_widows();
        let mut split_at = max_lines;
        if total_lines - split_at < widows {
            split_at = total_lines.saturating_sub(widows);
        }
        if split_at < orphans {
            // Too few lines would stay behind; move the whole paragraph instead.
            return None;
        }

        let boundary = lines[split_at].start;
        let first = self.fragment(self.start, boundary, false, false);
        let second = self.fragment(boundary, self.end, self.is_tail, true);
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let lines = self.layout_lines(avail_width);
        canvas.set_fill_color(self.style.color);
        let mut cursor_y = y;
        let count = lines.len();
        for (idx, line) in lines.iter().enumerate() {
            let is_last = idx + 1 == count && self.is_tail;
            self.draw_line(canvas, line, x, cursor_y, avail_width, idx == 0, is_last);
            cursor_y = cursor_y + line.height;
        }
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }

    fn debug_name(&self) -> &'static str {
        "Paragraph"
    }
}

#[derive(Debug, Clone)]
pub struct Spacer {
    height: Pt,
}

impl Spacer {
    pub fn new(height: f32) -> Self {
        Self::new_pt(Pt::from_f32(height))
    }

    pub fn new_pt(height: Pt) -> Self {
        Self { height }
    }
}

impl Flowable for Spacer {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.height.max(Pt::ZERO),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, _canvas: &mut Canvas, _x: Pt, _y: Pt, _avail_width: Pt, _avail_height: Pt) {}

    fn debug_name(&self) -> &'static str {
        "Spacer"
    }
}

// Zero-height marker recording where a section begins.
#[derive(Debug, Clone)]
pub struct AnchorMarker {
    name: String,
}

impl AnchorMarker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Flowable for AnchorMarker {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: Pt::ZERO,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, _x: Pt, y: Pt, _avail_width: Pt, _avail_height: Pt) {
        canvas.anchor(self.name.clone(), y);
    }

    fn debug_name(&self) -> &'static str {
        "AnchorMarker"
    }
}

// Raster image scaled to fit the available box (object-fit: contain), centered horizontally.
#[derive(Debug, Clone)]
pub struct ImageFlowable {
    resource_id: String,
    pixel_width: u32,
    pixel_height: u32,
}

impl ImageFlowable {
    pub fn new(resource_id: impl Into<String>, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            resource_id: resource_id.into(),
            pixel_width: pixel_width.max(1),
            pixel_height: pixel_height.max(1),
        }
    }

    fn fitted(&self, avail_width: Pt, avail_height: Pt) -> Size {
        let w = self.pixel_width as i64;
        let h = self.pixel_height as i64;
        // Compare aspect ratios in integer space to stay deterministic.
        let by_width = avail_width.to_milli_i64() * h;
        let by_height = avail_height.to_milli_i64() * w;
        if by_width <= by_height {
            let height = Pt::from_milli_i64(div_round(avail_width.to_milli_i64() * h, w));
            Size {
                width: avail_width,
                height,
            }
        } else {
            let width = Pt::from_milli_i64(div_round(avail_height.to_milli_i64() * w, h));
            Size {
                width,
                height: avail_height,
            }
        }
    }
}

fn div_round(num: i64, den: i64) -> i64 {
    if den == 0 {
        return 0;
    }
    (num + den / 2) / den
}

impl Flowable for ImageFlowable {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size {
        let fitted = self.fitted(avail_width, avail_height);
        Size {
            width: avail_width,
            height: fitted.height,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt) {
        let fitted = self.fitted(avail_width, avail_height);
        let offset = (avail_width - fitted.width).max(Pt::ZERO) / 2;
        canvas.draw_image(
            x + offset,
            y,
            fitted.width,
            fitted.height,
            self.resource_id.clone(),
        );
    }

    fn pagination(&self) -> Pagination {
        Pagination::avoid()
    }

    fn debug_name(&self) -> &'static str {
        "ImageFlowable"
    }
}

// Four-pointed star drawn as a vector path, outlined or filled.
#[derive(Debug, Clone)]
pub struct Ornament {
    size: Pt,
    color: Color,
    filled: bool,
}

impl Ornament {
    pub fn new(size: Pt, color: Color, filled: bool) -> Self {
        Self {
            size,
            color,
            filled,
        }
    }
}

impl Flowable for Ornament {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.size,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let cx = x + avail_width / 2;
        let cy = y + self.size / 2;
        let r = self.size.mul_ratio(2, 5);
        let pinch = self.size.mul_ratio(1, 12);

        canvas.save_state();
        canvas.move_to(cx, cy - r);
        canvas.curve_to(cx + pinch, cy - pinch, cx + pinch, cy - pinch, cx + r, cy);
        canvas.curve_to(cx + pinch, cy + pinch, cx + pinch, cy + pinch, cx, cy + r);
        canvas.curve_to(cx - pinch, cy + pinch, cx - pinch, cy + pinch, cx - r, cy);
        canvas.curve_to(cx - pinch, cy - pinch, cx - pinch, cy - pinch, cx, cy - r);
        canvas.close_path();
        if self.filled {
            canvas.set_fill_color(self.color);
            canvas.fill();
        } else {
            canvas.set_stroke_color(self.color);
            canvas.set_line_width(self.size.mul_ratio(1, 30));
            canvas.stroke();
        }
        canvas.restore_state();
    }

    fn debug_name(&self) -> &'static str {
        "Ornament"
    }
}

// Stacks its children and centers the stack vertically in the space it is given.
#[derive(Clone)]
pub struct CenteredBlock {
    children: Vec<Box<dyn Flowable>>,
}

impl CenteredBlock {
    pub fn new(children: Vec<Box<dyn Flowable>>) -> Self {
        Self { children }
    }

    fn content_height(&self, avail_width: Pt, avail_height: Pt) -> Pt {
        self.children
            .iter()
            .map(|child| child.wrap(avail_width, avail_height).height)
            .sum()
    }
}

impl Flowable for CenteredBlock {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.content_height(avail_width, avail_height).max(avail_height),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt) {
        let content = self.content_height(avail_width, avail_height);
        let mut cursor_y = y + (avail_height - content).max(Pt::ZERO) / 2;
        for child in &self.children {
            let size = child.wrap(avail_width, avail_height);
            child.draw(canvas, x, cursor_y, avail_width, size.height);
            cursor_y = cursor_y + size.height;
        }
    }

    fn pagination(&self) -> Pagination {
        Pagination::avoid()
    }

    fn debug_name(&self) -> &'static str {
        "CenteredBlock"
    }
}

// One contents line: linked title, dotted leader, right-aligned page number in a
// fixed-width column. The column is reserved even when the number is unknown.
#[derive(Clone)]
pub struct TocRow {
    title: Paragraph,
    target: String,
    number: Option<String>,
    number_column: Pt,
    gap: Pt,
    width_ratio: (i32, i32),
    leader_color: Color,
}

impl TocRow {
    pub fn new(title: Paragraph, target: impl Into<String>, number_column: Pt, gap: Pt) -> Self {
        Self {
            title,
            target: target.into(),
            number: None,
            number_column,
            gap,
            width_ratio: (1, 1),
            leader_color: Color::gray(0.5),
        }
    }

    pub fn with_number(mut self, number: Option<usize>) -> Self {
        self.number = number.map(|n| n.to_string());
        self
    }

    // Share of the frame width the row occupies, centered (e.g. 85 / 100).
    pub fn with_width_ratio(mut self, num: i32, den: i32) -> Self {
        if num > 0 && den > 0 && num <= den {
            self.width_ratio = (num, den);
        }
        self
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn row_width(&self, avail_width: Pt) -> Pt {
        avail_width.mul_ratio(self.width_ratio.0, self.width_ratio.1)
    }

    fn title_width(&self, avail_width: Pt) -> Pt {
        (self.row_width(avail_width) - self.number_column - self.gap * 2).max(Pt::from_f32(1.0))
    }
}

impl Flowable for TocRow {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size {
        let title = self.title.wrap(self.title_width(avail_width), avail_height);
        Size {
            width: avail_width,
            height: title.height,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt) {
        let row_width = self.row_width(avail_width);
        let row_x = x + (avail_width - row_width).max(Pt::ZERO) / 2;
        let title_width = self.title_width(avail_width);
        let lines = self.title.layout_lines(title_width);
        let height: Pt = lines.iter().map(|line| line.height).sum();
        self.title
            .draw(canvas, row_x, y, title_width, avail_height);

        let style = self.title.style();
        let baseline = y + height - style.half_leading();
        let last_width = lines.last().map(|line| line.width).unwrap_or(Pt::ZERO);
        let number_x = row_x + row_width - self.number_column;
        let leader_start = row_x + last_width + self.gap;
        let leader_end = number_x - self.gap;
        if leader_end > leader_start {
            canvas.save_state();
            canvas.set_stroke_color(self.leader_color);
            canvas.set_line_width(Pt::from_f32(0.75));
            canvas.set_line_cap(1);
            canvas.set_dash(vec![Pt::ZERO, Pt::from_f32(2.5)], Pt::ZERO);
            canvas.move_to(leader_start, baseline);
            canvas.line_to(leader_end, baseline);
            canvas.stroke();
            canvas.restore_state();
        }

        if let Some(number) = &self.number {
            let number_width =
                self.title
                    .fonts
                    .measure_text_width(&style.font_name, style.font_size, number);
            canvas.set_fill_color(style.color);
            canvas.set_font_name(&style.font_name);
            canvas.set_font_size(style.font_size);
            canvas.draw_string(
                number_x + (self.number_column - number_width).max(Pt::ZERO),
                baseline - style.font_size,
                number.clone(),
            );
        }

        canvas.link(
            Rect {
                x: row_x,
                y,
                width: row_width,
                height,
            },
            self.target.clone(),
        );
    }

    fn pagination(&self) -> Pagination {
        Pagination::avoid()
    }

    fn debug_name(&self) -> &'static str {
        "TocRow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::font::{BASE14_BOLD, BASE14_REGULAR};

    fn registry() -> Arc<FontRegistry> {
        Arc::new(FontRegistry::new())
    }

    fn body_style() -> TextStyle {
        TextStyle::new(BASE14_REGULAR, Pt::from_f32(10.0), Pt::from_f32(17.0))
    }

    fn long_text(words: usize) -> String {
        (0..words)
            .map(|i| format!("word{}", i % 7))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn strings(canvas: Canvas) -> Vec<(Pt, Pt, String)> {
        canvas
            .finish()
            .pages
            .remove(0)
            .commands
            .into_iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { x, y, text } => Some((x, y, text)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn paragraph_wraps_into_multiple_lines() {
        let para = Paragraph::new(&long_text(60), body_style(), registry());
        let size = para.wrap(Pt::from_f32(200.0), Pt::from_f32(1000.0));
        assert!(size.height > Pt::from_f32(17.0));
        assert_eq!(size.height.to_milli_i64() % 17_000, 0);
    }

    #[test]
    fn justified_lines_fill_the_measure_except_the_last() {
        let width = Pt::from_f32(200.0);
        let para = Paragraph::new(&long_text(40), body_style(), registry())
            .with_align(TextAlign::Justify);
        let lines = para.layout_lines(width);
        assert!(lines.len() >= 3);

        let mut canvas = Canvas::new(Size::digest());
        para.draw(&mut canvas, Pt::ZERO, Pt::ZERO, width, Pt::from_f32(1000.0));
        let drawn = strings(canvas);
        let first_line = &lines[0];
        let last_word = &drawn[first_line.end - 1];
        let last_word_width = para.word_width(first_line.end - 1);
        // Right edge of the first line lands on the measure.
        let right = last_word.0 + last_word_width;
        assert!((right - width).abs() <= Pt::from_f32(0.01));

        let tail = lines[lines.len() - 1];
        let tail_last = &drawn[tail.end - 1];
        assert!(tail_last.0 + para.word_width(tail.end - 1) < width);
    }

    #[test]
    fn first_line_indent_shifts_only_the_first_line() {
        let para = Paragraph::new(&long_text(40), body_style(), registry())
            .with_first_line_indent(Pt::from_f32(20.0));
        let lines = para.layout_lines(Pt::from_f32(200.0));
        let mut canvas = Canvas::new(Size::digest());
        para.draw(&mut canvas, Pt::ZERO, Pt::ZERO, Pt::from_f32(200.0), Pt::from_f32(1000.0));
        let drawn = strings(canvas);
        assert_eq!(drawn[0].0, Pt::from_f32(20.0));
        assert_eq!(drawn[lines[1].start].0, Pt::ZERO);
    }

    #[test]
    fn drop_cap_enlarges_the_first_letter_and_grows_the_first_line() {
        let cap = DropCap {
            font_name: Arc::from(BASE14_BOLD),
            font_size: Pt::from_f32(35.0),
        };
        let para = Paragraph::new("Once upon a time", body_style(), registry())
            .with_drop_cap(Some(cap));
        let size = para.wrap(Pt::from_f32(300.0), Pt::from_f32(1000.0));
        assert_eq!(size.height, Pt::from_f32(42.0));

        let mut canvas = Canvas::new(Size::digest());
        para.draw(&mut canvas, Pt::ZERO, Pt::ZERO, Pt::from_f32(300.0), size.height);
        let doc = canvas.finish();
        let commands = &doc.pages[0].commands;
        assert!(commands.contains(&Command::SetFontSize(Pt::from_f32(35.0))));
        assert!(commands.contains(&Command::SetFontName(BASE14_BOLD.to_string())));
        let texts: Vec<&str> = commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts[0], "O");
        assert_eq!(texts[1], "nce");
    }

    #[test]
    fn split_honors_orphans_and_widows_and_keeps_words() {
        let para = Paragraph::new(&long_text(80), body_style(), registry())
            .with_align(TextAlign::Justify)
            .with_first_line_indent(Pt::from_f32(20.0));
        let width = Pt::from_f32(200.0);
        let total = para.layout_lines(width).len();
        assert!(total > 5);

        // Room for exactly three lines.
        let (first, second) = para
            .split(width, Pt::from_f32(51.0))
            .expect("split");
        assert_eq!(first.wrap(width, Pt::from_f32(51.0)).height, Pt::from_f32(51.0));
        let rest = second.wrap(width, Pt::from_f32(10_000.0)).height;
        assert_eq!(rest, Pt::from_f32(17.0) * ((total - 3) as i32));

        // One line would be an orphan.
        assert!(para.split(width, Pt::from_f32(20.0)).is_none());
    }

    #[test]
    fn split_continuation_drops_indent_and_drop_cap() {
        let cap = DropCap {
            font_name: Arc::from(BASE14_BOLD),
            font_size: Pt::from_f32(35.0),
        };
        let para = Paragraph::new(&long_text(80), body_style(), registry())
            .with_first_line_indent(Pt::from_f32(20.0))
            .with_drop_cap(Some(cap));
        let first = para.fragment(0, 10, false, false);
        let second = para.fragment(10, para.end, true, true);
        assert!(first.has_drop_cap());
        assert_eq!(first.first_line_indent(), Pt::from_f32(20.0));
        assert!(!second.has_drop_cap());
        assert_eq!(second.first_line_indent(), Pt::ZERO);
        assert_eq!(
            format!("{} {}", first.text(), second.text()),
            para.text()
        );
    }

    #[test]
    fn image_fits_inside_the_box_keeping_aspect() {
        let image = ImageFlowable::new("img", 400, 200);
        let size = image.fitted(Pt::from_f32(300.0), Pt::from_f32(500.0));
        assert_eq!(size.width, Pt::from_f32(300.0));
        assert_eq!(size.height, Pt::from_f32(150.0));

        let tall = ImageFlowable::new("img", 100, 400);
        let size = tall.fitted(Pt::from_f32(300.0), Pt::from_f32(200.0));
        assert_eq!(size.height, Pt::from_f32(200.0));
        assert_eq!(size.width, Pt::from_f32(50.0));
    }

    #[test]
    fn centered_block_claims_the_whole_frame() {
        let block = CenteredBlock::new(vec![Box::new(Spacer::new(40.0))]);
        let size = block.wrap(Pt::from_f32(100.0), Pt::from_f32(300.0));
        assert_eq!(size.height, Pt::from_f32(300.0));
    }

    #[test]
    fn toc_row_reserves_number_column_and_links_target() {
        let style = TextStyle::new(BASE14_REGULAR, Pt::from_f32(8.0), Pt::from_f32(10.0));
        let title = Paragraph::new("Beginnings", style, registry());
        let probe = TocRow::new(title.clone(), "chapter-1", Pt::from_f32(20.0), Pt::from_f32(5.6));
        let final_row = probe.clone().with_number(Some(12));
        let width = Pt::from_f32(250.0);
        assert_eq!(
            probe.wrap(width, Pt::from_f32(100.0)),
            final_row.wrap(width, Pt::from_f32(100.0))
        );

        let mut canvas = Canvas::new(Size::digest());
        final_row.draw(&mut canvas, Pt::ZERO, Pt::ZERO, width, Pt::from_f32(100.0));
        let doc = canvas.finish();
        let page = &doc.pages[0];
        assert_eq!(page.links().map(|(_, t)| t).collect::<Vec<_>>(), vec!["chapter-1"]);
        assert!(page.commands.iter().any(
            |cmd| matches!(cmd, Command::DrawString { text, .. } if text == "12")
        ));
        assert_eq!(final_row.number(), Some("12"));
    }
}
