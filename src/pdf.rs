use crate::assets::{ImageData, flate_compress};
use crate::canvas::{Command, Document, Page};
use crate::font::{BASE14_REGULAR, FontProgramKind, FontRegistry, RegisteredFont, is_base14_font};
use crate::layout::RenderedDocument;
use crate::types::{Color, Pt, Rect};
use fixed::types::I32F32;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

const PDF_HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";
const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const PDF_INFO_ID: usize = 4;
const PRODUCER: &str = "bookpress";

#[derive(Debug, Clone)]
pub(crate) struct PdfOptions {
    pub(crate) title: Option<String>,
    // Emit a bookmark tree from the contents entries.
    pub(crate) outline: bool,
    pub(crate) compress: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            title: None,
            outline: true,
            compress: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PdfStats {
    pub(crate) pages: usize,
    pub(crate) objects: usize,
    pub(crate) fonts: usize,
    pub(crate) images: usize,
    pub(crate) links: usize,
    pub(crate) dangling_links: usize,
    pub(crate) outline_items: usize,
    pub(crate) replaced_chars: usize,
}

struct FontResource {
    resource: String,
    kerned: bool,
}

// Object bodies indexed by id - 1. Ids are reserved up front so pages, link
// annotations and outline items can point at each other.
struct ObjectTable {
    bodies: Vec<Vec<u8>>,
}

impl ObjectTable {
    fn new() -> Self {
        // Catalog, page tree, shared resources and info come first.
        Self {
            bodies: vec![Vec::new(); PDF_INFO_ID],
        }
    }

    fn reserve(&mut self) -> usize {
        self.bodies.push(Vec::new());
        self.bodies.len()
    }

    fn set(&mut self, id: usize, body: impl Into<Vec<u8>>) {
        if let Some(slot) = id.checked_sub(1).and_then(|idx| self.bodies.get_mut(idx)) {
            *slot = body.into();
        }
    }

    fn push(&mut self, body: impl Into<Vec<u8>>) -> usize {
        let id = self.reserve();
        self.set(id, body);
        id
    }
}

pub(crate) fn write_pdf(
    rendered: &RenderedDocument,
    fonts: &FontRegistry,
    options: &PdfOptions,
) -> (Vec<u8>, PdfStats) {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let stats = write_pdf_to(rendered, fonts, options, &mut out).unwrap_or_default();
    (out, stats)
}

pub(crate) fn write_pdf_to<W: Write>(
    rendered: &RenderedDocument,
    fonts: &FontRegistry,
    options: &PdfOptions,
    writer: &mut W,
) -> io::Result<PdfStats> {
    let document = &rendered.document;
    let page_height = document.page_size.height;
    let mut table = ObjectTable::new();
    let mut stats = PdfStats {
        pages: document.page_count(),
        ..PdfStats::default()
    };

    let mut font_map: BTreeMap<String, FontResource> = BTreeMap::new();
    let mut font_entries = Vec::new();
    for (index, name) in collect_font_names(document).into_iter().enumerate() {
        let resource = format!("F{}", index + 1);
        let (font_id, kerned) = match fonts.resolve(&name) {
            Some(font) => (
                build_truetype_font_objects(&mut table, font, options.compress),
                !font.metrics.kerning.is_empty(),
            ),
            None => {
                let base = if is_base14_font(&name) {
                    name.as_str()
                } else {
                    BASE14_REGULAR
                };
                (table.push(base14_font_object(base)), false)
            }
        };
        font_entries.push((resource.clone(), font_id));
        font_map.insert(name, FontResource { resource, kerned });
    }
    stats.fonts = font_entries.len();

    let mut image_map: BTreeMap<&str, String> = BTreeMap::new();
    let mut image_entries = Vec::with_capacity(rendered.images.len());
    for (index, (source, image)) in rendered.images.iter().enumerate() {
        let smask_id = image
            .alpha
            .as_ref()
            .map(|alpha| table.push(image_smask_object(image, alpha)));
        let image_id = table.push(image_object(image, smask_id));
        let name = format!("Im{}", index + 1);
        image_entries.push((name.clone(), image_id));
        image_map.insert(source, name);
    }
    stats.images = image_entries.len();

    table.set(
        PDF_RESOURCES_ID,
        format!(
            "<< /Font {} /XObject {} >>",
            resource_dict(&font_entries),
            resource_dict(&image_entries)
        ),
    );

    let page_ids: Vec<usize> = document.pages.iter().map(|_| table.reserve()).collect();

    for (index, page) in document.pages.iter().enumerate() {
        let (content, replaced) = render_page(page, page_height, &font_map, &image_map, fonts);
        stats.replaced_chars += replaced;
        let content_id = table.push(stream_object(content.as_bytes(), options.compress));

        let mut annots = Vec::new();
        for (rect, target) in page.links() {
            let Some(dest) = destination(document, &page_ids, target) else {
                stats.dangling_links += 1;
                continue;
            };
            annots.push(table.push(link_annotation(rect, page_height, &dest)));
        }
        stats.links += annots.len();

        let annots = if annots.is_empty() {
            String::new()
        } else {
            format!(" /Annots [{}]", object_refs(&annots))
        };
        table.set(
            page_ids[index],
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R{} >>",
                PDF_PAGES_ID,
                fmt_pt(document.page_size.width),
                fmt_pt(page_height),
                PDF_RESOURCES_ID,
                content_id,
                annots
            ),
        );
    }

    table.set(
        PDF_PAGES_ID,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            object_refs(&page_ids),
            page_ids.len()
        ),
    );

    let outline_id = if options.outline {
        build_outline(&mut table, rendered, &page_ids, &mut stats)
    } else {
        None
    };
    let catalog = match outline_id {
        Some(id) => format!(
            "<< /Type /Catalog /Pages {} 0 R /Outlines {} 0 R /PageMode /UseOutlines >>",
            PDF_PAGES_ID, id
        ),
        None => format!("<< /Type /Catalog /Pages {} 0 R >>", PDF_PAGES_ID),
    };
    table.set(PDF_CATALOG_ID, catalog);
    table.set(PDF_INFO_ID, info_object(options.title.as_deref()));

    stats.objects = table.bodies.len();
    write_objects(writer, &table)?;
    Ok(stats)
}

fn collect_font_names(document: &Document) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for page in &document.pages {
        let mut current = BASE14_REGULAR;
        for cmd in &page.commands {
            match cmd {
                Command::SetFontName(name) => current = name.as_str(),
                Command::DrawString { .. } => {
                    names.insert(current.to_string());
                }
                _ => {}
            }
        }
    }
    names
}

fn destination(document: &Document, page_ids: &[usize], target: &str) -> Option<String> {
    let index = document.find_anchor(target)?;
    let page_id = page_ids.get(index)?;
    let y = document.pages[index].anchor_y(target).unwrap_or(Pt::ZERO);
    let top = (document.page_size.height - y).max(Pt::ZERO);
    Some(format!("[{} 0 R /XYZ 0 {} 0]", page_id, fmt_pt(top)))
}

fn build_outline(
    table: &mut ObjectTable,
    rendered: &RenderedDocument,
    page_ids: &[usize],
    stats: &mut PdfStats,
) -> Option<usize> {
    let items: Vec<(&str, String)> = rendered
        .outline
        .iter()
        .filter_map(|entry| {
            destination(&rendered.document, page_ids, &entry.anchor)
                .map(|dest| (entry.title.as_str(), dest))
        })
        .collect();
    if items.is_empty() {
        return None;
    }

    let root_id = table.reserve();
    let item_ids: Vec<usize> = items.iter().map(|_| table.reserve()).collect();
    for (index, (title, dest)) in items.iter().enumerate() {
        let mut body = format!(
            "<< /Title {} /Parent {} 0 R /Dest {}",
            pdf_text_string(title),
            root_id,
            dest
        );
        if index > 0 {
            body.push_str(&format!(" /Prev {} 0 R", item_ids[index - 1]));
        }
        if let Some(next) = item_ids.get(index + 1) {
            body.push_str(&format!(" /Next {} 0 R", next));
        }
        body.push_str(" >>");
        table.set(item_ids[index], body);
    }
    let first = item_ids[0];
    let last = item_ids[item_ids.len() - 1];
    table.set(
        root_id,
        format!(
            "<< /Type /Outlines /First {} 0 R /Last {} 0 R /Count {} >>",
            first,
            last,
            item_ids.len()
        ),
    );
    stats.outline_items = item_ids.len();
    Some(root_id)
}

fn build_truetype_font_objects(
    table: &mut ObjectTable,
    font: &RegisteredFont,
    compress: bool,
) -> usize {
    let file_id = table.push(font_file_object(&font.data, font.program_kind, compress));
    let descriptor_id = table.push(font_descriptor_object(font, file_id));
    table.push(truetype_font_object(font, descriptor_id))
}

fn render_page(
    page: &Page,
    page_height: Pt,
    font_map: &BTreeMap<String, FontResource>,
    image_map: &BTreeMap<&str, String>,
    fonts: &FontRegistry,
) -> (String, usize) {
    let mut out = String::new();
    let mut replaced = 0usize;
    let mut current_font_name = BASE14_REGULAR.to_string();
    let mut current_font_size = Pt::from_f32(12.0);
    // Font selection is text state; mirror q/Q so it survives restores.
    let mut font_stack: Vec<(String, Pt)> = Vec::new();

    for cmd in &page.commands {
        match cmd {
            Command::SaveState => {
                font_stack.push((current_font_name.clone(), current_font_size));
                out.push_str("q\n");
            }
            Command::RestoreState => {
                if let Some((name, size)) = font_stack.pop() {
                    current_font_name = name;
                    current_font_size = size;
                }
                out.push_str("Q\n");
            }
            Command::Meta { .. } | Command::Anchor { .. } | Command::Link { .. } => {}
            Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
            Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", fmt_pt(*width)));
            }
            Command::SetLineCap(cap) => {
                out.push_str(&format!("{} J\n", cap));
            }
            Command::SetDash { pattern, phase } => {
                let items = pattern
                    .iter()
                    .map(|v| fmt_pt(*v))
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&format!("[{}] {} d\n", items, fmt_pt(*phase)));
            }
            Command::SetFontName(name) => current_font_name = name.clone(),
            Command::SetFontSize(size) => current_font_size = *size,
            Command::SetCharSpacing(spacing) => {
                out.push_str(&format!("{} Tc\n", fmt_pt(*spacing)));
            }
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} {} {} c\n",
                    fmt_pt(*x1),
                    fmt_pt(page_height - *y1),
                    fmt_pt(*x2),
                    fmt_pt(page_height - *y2),
                    fmt_pt(*x),
                    fmt_pt(page_height - *y),
                ));
            }
            Command::ClosePath => out.push_str("h\n"),
            Command::Fill => out.push_str("f\n"),
            Command::Stroke => out.push_str("S\n"),
            Command::DrawString { x, y, text } => {
                let font = font_map.get(&current_font_name);
                let resource = font.map(|f| f.resource.as_str()).unwrap_or("F1");
                out.push_str("BT\n");
                out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(current_font_size)));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - current_font_size)
                ));
                let kerning = match font {
                    Some(f) if f.kerned => fonts.kerning(&current_font_name, text),
                    _ => Vec::new(),
                };
                if kerning.iter().any(|k| *k != 0) {
                    let (tj, count) = kerned_tj(text, &kerning);
                    replaced += count;
                    out.push_str(&tj);
                } else {
                    let encoded = encode_winansi_pdf_string(text);
                    replaced += encoded.replaced;
                    out.push_str(&format!("({}) Tj\n", encoded.text));
                }
                out.push_str("ET\n");
            }
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nf\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                if let Some(name) = image_map.get(resource_id.as_str()) {
                    out.push_str("q\n");
                    out.push_str(&format!(
                        "{} 0 0 {} {} {} cm\n",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - *height)
                    ));
                    out.push_str(&format!("/{} Do\n", name));
                    out.push_str("Q\n");
                }
            }
        }
    }

    (out, replaced)
}

// TJ array with kerning offsets between the affected characters.
fn kerned_tj(text: &str, kerning: &[i16]) -> (String, usize) {
    let mut parts = Vec::new();
    let mut segment = String::new();
    let mut replaced = 0usize;
    for (ch, adjust) in text.chars().zip(kerning.iter().copied()) {
        if adjust != 0 && !segment.is_empty() {
            let encoded = encode_winansi_pdf_string(&std::mem::take(&mut segment));
            replaced += encoded.replaced;
            parts.push(format!("({})", encoded.text));
            parts.push((-i32::from(adjust)).to_string());
        }
        segment.push(ch);
    }
    if !segment.is_empty() {
        let encoded = encode_winansi_pdf_string(&segment);
        replaced += encoded.replaced;
        parts.push(format!("({})", encoded.text));
    }
    (format!("[{}] TJ\n", parts.join(" ")), replaced)
}

fn link_annotation(rect: Rect, page_height: Pt, dest: &str) -> String {
    format!(
        "<< /Type /Annot /Subtype /Link /Rect [{} {} {} {}] /Border [0 0 0] /Dest {} >>",
        fmt_pt(rect.x),
        fmt_pt(page_height - rect.bottom()),
        fmt_pt(rect.right()),
        fmt_pt(page_height - rect.y),
        dest
    )
}

fn write_objects<W: Write>(writer: &mut W, table: &ObjectTable) -> io::Result<()> {
    let mut offset = 0usize;
    let mut offsets = vec![0usize; table.bodies.len() + 1];
    write_bytes(writer, PDF_HEADER, &mut offset)?;
    for (index, body) in table.bodies.iter().enumerate() {
        write_pdf_object(writer, &mut offset, &mut offsets, index + 1, body)?;
    }

    let xref_start = offset;
    write_str(
        writer,
        &format!("xref\n0 {}\n0000000000 65535 f \n", table.bodies.len() + 1),
        &mut offset,
    )?;
    for entry in offsets.iter().skip(1) {
        write_str(writer, &format!("{:010} 00000 n \n", entry), &mut offset)?;
    }
    write_str(
        writer,
        &format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            table.bodies.len() + 1,
            PDF_CATALOG_ID,
            PDF_INFO_ID,
            xref_start
        ),
        &mut offset,
    )?;
    writer.flush()
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &[u8],
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body, offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

fn stream_with_dict(dict: &str, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(dict.len() + data.len() + 32);
    out.extend_from_slice(dict.as_bytes());
    out.extend_from_slice(b"\nstream\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream");
    out
}

fn stream_object(content: &[u8], compress: bool) -> Vec<u8> {
    if compress {
        let data = flate_compress(content);
        stream_with_dict(
            &format!("<< /Length {} /Filter /FlateDecode >>", data.len()),
            &data,
        )
    } else {
        stream_with_dict(&format!("<< /Length {} >>", content.len()), content)
    }
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> Vec<u8> {
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    let dict = format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent 8 /Length {} /Filter {}{} >>",
        image.width,
        image.height,
        image.color_space,
        image.data.len(),
        image.filter,
        smask
    );
    stream_with_dict(&dict, &image.data)
}

fn image_smask_object(image: &ImageData, alpha: &[u8]) -> Vec<u8> {
    let dict = format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter /FlateDecode >>",
        image.width,
        image.height,
        alpha.len()
    );
    stream_with_dict(&dict, alpha)
}

fn base14_font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        sanitize_font_name(name)
    )
}

fn truetype_font_object(font: &RegisteredFont, descriptor_id: usize) -> String {
    let base = sanitize_font_name(&font.name);
    let metrics = &font.metrics;
    let subtype = match font.program_kind {
        FontProgramKind::OpenTypeCff => "Type1",
        FontProgramKind::TrueType => "TrueType",
    };
    let widths = metrics
        .widths
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let encoding = if metrics.is_symbolic() {
        ""
    } else {
        " /Encoding /WinAnsiEncoding"
    };
    format!(
        "<< /Type /Font /Subtype /{} /BaseFont /{} /FirstChar {} /LastChar {} /Widths [{}] /FontDescriptor {} 0 R{} >>",
        subtype, base, metrics.first_char, metrics.last_char, widths, descriptor_id, encoding
    )
}

fn font_descriptor_object(font: &RegisteredFont, font_file_id: usize) -> String {
    let metrics = &font.metrics;
    let mut flags = if metrics.is_symbolic() { 4 } else { 32 };
    if metrics.is_fixed_pitch {
        flags |= 1;
    }
    let font_file_entry = match font.program_kind {
        FontProgramKind::OpenTypeCff => "FontFile3",
        FontProgramKind::TrueType => "FontFile2",
    };
    format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags {} /FontBBox [{} {} {} {}] /ItalicAngle {} /Ascent {} /Descent {} /CapHeight {} /StemV {} /MissingWidth {} /{} {} 0 R >>",
        sanitize_font_name(&font.name),
        flags,
        metrics.bbox.0,
        metrics.bbox.1,
        metrics.bbox.2,
        metrics.bbox.3,
        metrics.italic_angle,
        metrics.ascent,
        metrics.descent,
        metrics.cap_height,
        metrics.stem_v,
        metrics.missing_width,
        font_file_entry,
        font_file_id
    )
}

fn font_file_object(data: &[u8], kind: FontProgramKind, compress: bool) -> Vec<u8> {
    let subtype = match kind {
        FontProgramKind::OpenTypeCff => " /Subtype /OpenType",
        FontProgramKind::TrueType => "",
    };
    if compress {
        let packed = flate_compress(data);
        let dict = format!(
            "<< /Length {} /Length1 {} /Filter /FlateDecode{} >>",
            packed.len(),
            data.len(),
            subtype
        );
        stream_with_dict(&dict, &packed)
    } else {
        let dict = format!(
            "<< /Length {} /Length1 {}{} >>",
            data.len(),
            data.len(),
            subtype
        );
        stream_with_dict(&dict, data)
    }
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = Vec::new();
    if let Some(title) = title {
        entries.push(format!("/Title {}", pdf_text_string(title)));
    }
    entries.push(format!("/Producer ({})", PRODUCER));
    format!("<< {} >>", entries.join(" "))
}

fn resource_dict(entries: &[(String, usize)]) -> String {
    let items = entries
        .iter()
        .map(|(name, id)| format!("/{} {} 0 R", name, id))
        .collect::<Vec<_>>()
        .join(" ");
    format!("<< {} >>", items)
}

fn object_refs(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    if out.is_empty() {
        BASE14_REGULAR.to_string()
    } else {
        out
    }
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

// Text string for metadata and bookmarks: literal when ASCII, UTF-16BE otherwise.
fn pdf_text_string(input: &str) -> String {
    if input.is_ascii() {
        return format!("({})", escape_pdf_string(input));
    }
    let mut out = String::from("<FEFF");
    for unit in input.encode_utf16() {
        out.push_str(&format!("{:04X}", unit));
    }
    out.push('>');
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => {
                replaced += 1;
                b'?'
            }
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b if b < 0x20 || b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }
    WinAnsiEncoded {
        text: out,
        replaced,
    }
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn color_to_pdf_fill(color: Color) -> String {
    format!(
        "{} {} {} rg\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!(
        "{} {} {} RG\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}
