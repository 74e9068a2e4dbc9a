use crate::error::BookPressError;
use crate::types::{Color, Margins, Pt, Size, mm};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFace {
    Regular,
    Italic,
    Bold,
}

// One text rule: size in points, line height as a multiple of the size,
// letter spacing in em.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRule {
    pub size: f32,
    pub line_height: f32,
    pub face: FontFace,
    pub color: String,
    pub letter_spacing: f32,
    pub uppercase: bool,
}

impl Default for TextRule {
    fn default() -> Self {
        Self::new(11.0, 1.6, FontFace::Regular)
    }
}

impl TextRule {
    pub fn new(size: f32, line_height: f32, face: FontFace) -> Self {
        Self {
            size,
            line_height,
            face,
            color: "#000000".to_string(),
            letter_spacing: 0.0,
            uppercase: false,
        }
    }

    fn colored(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    fn spaced(mut self, letter_spacing: f32) -> Self {
        self.letter_spacing = letter_spacing;
        self
    }

    fn upper(mut self) -> Self {
        self.uppercase = true;
        self
    }

    pub fn font_size(&self) -> Pt {
        Pt::from_f32(self.size)
    }

    pub fn leading(&self) -> Pt {
        Pt::from_f32(self.size * self.line_height)
    }

    // `factor` em of this rule's size.
    pub fn em(&self, factor: f32) -> Pt {
        Pt::from_f32(self.size * factor)
    }

    pub fn color(&self) -> Color {
        Color::from_hex(&self.color).unwrap_or(Color::BLACK)
    }

    pub fn apply_case(&self, text: &str) -> String {
        if self.uppercase {
            text.to_uppercase()
        } else {
            text.to_string()
        }
    }

    fn validate(&self, name: &str) -> Result<(), BookPressError> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(BookPressError::InvalidConfiguration(format!(
                "text.{name}.size must be positive"
            )));
        }
        if !(self.line_height.is_finite() && self.line_height >= 1.0) {
            return Err(BookPressError::InvalidConfiguration(format!(
                "text.{name}.line_height must be at least 1.0"
            )));
        }
        if Color::from_hex(&self.color).is_none() {
            return Err(BookPressError::InvalidConfiguration(format!(
                "text.{name}.color '{}' is not a #rgb or #rrggbb color",
                self.color
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRules {
    pub title: TextRule,
    pub subtitle: TextRule,
    pub ornament: TextRule,
    pub print_date: TextRule,
    pub contents_heading: TextRule,
    pub contents_entry: TextRule,
    pub chapter_number: TextRule,
    pub chapter_heading: TextRule,
    pub section_heading: TextRule,
    pub body: TextRule,
    pub footer: TextRule,
}

impl Default for TextRules {
    fn default() -> Self {
        Self {
            title: TextRule::new(38.0, 1.2, FontFace::Bold),
            subtitle: TextRule::new(14.0, 1.6, FontFace::Regular).spaced(0.2).upper(),
            ornament: TextRule::new(24.0, 1.0, FontFace::Regular).colored("#555555"),
            print_date: TextRule::new(10.0, 1.6, FontFace::Italic),
            contents_heading: TextRule::new(24.0, 1.6, FontFace::Bold),
            contents_entry: TextRule::new(8.0, 1.25, FontFace::Regular),
            chapter_number: TextRule::new(16.0, 1.6, FontFace::Italic)
                .colored("#666666")
                .upper(),
            chapter_heading: TextRule::new(30.0, 1.2, FontFace::Bold),
            section_heading: TextRule::new(20.0, 1.6, FontFace::Bold)
                .spaced(0.1)
                .upper(),
            body: TextRule::new(11.0, 1.7, FontFace::Regular),
            footer: TextRule::new(9.0, 1.0, FontFace::Regular),
        }
    }
}

impl TextRules {
    fn validate(&self) -> Result<(), BookPressError> {
        for (name, rule) in [
            ("title", &self.title),
            ("subtitle", &self.subtitle),
            ("ornament", &self.ornament),
            ("print_date", &self.print_date),
            ("contents_heading", &self.contents_heading),
            ("contents_entry", &self.contents_entry),
            ("chapter_number", &self.chapter_number),
            ("chapter_heading", &self.chapter_heading),
            ("section_heading", &self.section_heading),
            ("body", &self.body),
            ("footer", &self.footer),
        ] {
            rule.validate(name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub subtitle: String,
    pub print_date_prefix: String,
    // chrono strftime pattern for the print date line.
    pub print_date_format: String,
    pub contents_heading: String,
    pub chapter_number_prefix: String,
    pub preface: String,
    pub prologue: String,
    pub epilogue: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            subtitle: "A Personal Interpretation".to_string(),
            print_date_prefix: "A personalized edition created on".to_string(),
            print_date_format: "%B %d, %Y".to_string(),
            contents_heading: "Contents".to_string(),
            chapter_number_prefix: "Chapter".to_string(),
            preface: "Preface".to_string(),
            prologue: "Prologue".to_string(),
            epilogue: "Epilogue".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontFiles {
    pub regular: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginsMm {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for MarginsMm {
    fn default() -> Self {
        Self {
            top: 25.0,
            right: 25.0,
            bottom: 25.0,
            left: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub trim_width_mm: f32,
    pub trim_height_mm: f32,
    pub margins_mm: MarginsMm,
    pub fonts: FontFiles,
    pub text: TextRules,
    pub labels: Labels,
    // Share of the content width used by the contents list, in percent.
    pub contents_width_percent: u8,
    pub paragraph_indent_em: f32,
    pub paragraph_gap_em: f32,
    pub drop_cap_scale: f32,
    pub signature_pages: Option<usize>,
    pub max_layout_passes: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            trim_width_mm: 140.0,
            trim_height_mm: 216.0,
            margins_mm: MarginsMm::default(),
            fonts: FontFiles::default(),
            text: TextRules::default(),
            labels: Labels::default(),
            contents_width_percent: 85,
            paragraph_indent_em: 2.0,
            paragraph_gap_em: 1.0,
            drop_cap_scale: 3.5,
            signature_pages: None,
            max_layout_passes: 3,
        }
    }
}

impl StyleConfig {
    pub fn from_json(raw: &str) -> Result<Self, BookPressError> {
        let config: StyleConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BookPressError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            BookPressError::InvalidConfiguration(format!(
                "cannot read style {}: {err}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn page_size(&self) -> Size {
        Size::from_mm(self.trim_width_mm, self.trim_height_mm)
    }

    pub fn margins(&self) -> Margins {
        Margins {
            top: mm(self.margins_mm.top),
            right: mm(self.margins_mm.right),
            bottom: mm(self.margins_mm.bottom),
            left: mm(self.margins_mm.left),
        }
    }

    pub fn validate(&self) -> Result<(), BookPressError> {
        let invalid = |msg: &str| Err(BookPressError::InvalidConfiguration(msg.to_string()));
        if !(self.trim_width_mm.is_finite() && self.trim_width_mm > 0.0)
            || !(self.trim_height_mm.is_finite() && self.trim_height_mm > 0.0)
        {
            return invalid("trim size must be positive");
        }
        let m = &self.margins_mm;
        if [m.top, m.right, m.bottom, m.left]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return invalid("margins must be non-negative");
        }
        if m.left + m.right >= self.trim_width_mm || m.top + m.bottom >= self.trim_height_mm {
            return invalid("margins leave no room for content");
        }
        if self.contents_width_percent == 0 || self.contents_width_percent > 100 {
            return invalid("contents_width_percent must be within 1..=100");
        }
        if !(self.drop_cap_scale.is_finite() && self.drop_cap_scale >= 1.0) {
            return invalid("drop_cap_scale must be at least 1.0");
        }
        if !(self.paragraph_indent_em.is_finite() && self.paragraph_indent_em >= 0.0)
            || !(self.paragraph_gap_em.is_finite() && self.paragraph_gap_em >= 0.0)
        {
            return invalid("paragraph spacing must be non-negative");
        }
        if let Some(pages) = self.signature_pages {
            if pages == 0 || pages % 4 != 0 {
                return invalid("signature_pages must be a positive multiple of 4");
            }
        }
        if self.max_layout_passes == 0 {
            return invalid("max_layout_passes must be at least 1");
        }
        if chrono::format::StrftimeItems::new(&self.labels.print_date_format)
            .any(|item| matches!(item, chrono::format::Item::Error))
        {
            return invalid("labels.print_date_format is not a valid strftime pattern");
        }
        self.text.validate()
    }
}
