//! Page layout onto abstract, fixed-size pages.
//!
//! Every placement call takes a [`PageCursor`] and returns the advanced
//! cursor; the engine itself holds no position. Coordinates are points,
//! `y` measured down from the top edge of the page.

use crate::error::{Error, Result};
use crate::fonts::TextMeasure;
use crate::model::{Alignment, Block, Document, Footer, ImageBlock, Page, Rule, TextBlock};

const AT_TOP_TOLERANCE: f32 = 0.5;
const BULLET: &str = "\u{2022}";
const LEADER: char = '.';
const ELLIPSIS: char = '\u{2026}';

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub title_size: f32,
    pub heading_size: f32,
    pub body_size: f32,
    pub footer_size: f32,
    /// Line height as a multiple of the font size.
    pub line_height_factor: f32,
    pub heading_space_before: f32,
    pub paragraph_spacing: f32,
    pub bullet_indent: f32,
    /// Distance from the bottom edge of the page to the top of the footer line.
    pub footer_offset: f32,
    pub accent_color: [u8; 3],
    pub muted_color: [u8; 3],
}

impl Default for LayoutConfig {
    /// A4 portrait.
    fn default() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin_top: 72.0,
            margin_bottom: 72.0,
            margin_left: 56.7,
            margin_right: 56.7,
            title_size: 24.0,
            heading_size: 16.0,
            body_size: 11.0,
            footer_size: 8.0,
            line_height_factor: 1.4,
            heading_space_before: 12.0,
            paragraph_spacing: 6.0,
            bullet_indent: 14.0,
            footer_offset: 36.0,
            accent_color: [0x1e, 0x3a, 0x8a],
            muted_color: [0x6b, 0x72, 0x80],
        }
    }
}

impl LayoutConfig {
    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_height_factor
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right
    }

    /// Lowest y a placed line's bottom may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.page_height - self.margin_bottom
    }

    /// Reject geometry where an empty page cannot hold a heading followed by
    /// one body line, or a single title line.
    pub fn validate(&self) -> Result<()> {
        if self.page_width <= 0.0 || self.page_height <= 0.0 {
            return Err(Error::InvalidConfig("page size must be positive".into()));
        }
        if self.content_width() <= self.bullet_indent {
            return Err(Error::InvalidConfig(format!(
                "content width {:.1}pt leaves no room for text",
                self.content_width()
            )));
        }
        let sizes = [self.title_size, self.heading_size, self.body_size, self.footer_size];
        if sizes.iter().any(|&s| s <= 0.0) || self.line_height_factor < 1.0 {
            return Err(Error::InvalidConfig(
                "font sizes must be positive and line height factor at least 1.0".into(),
            ));
        }
        let room = self.bottom_limit() - self.margin_top;
        let heading_block = self.line_height(self.heading_size) + self.line_height(self.body_size);
        if room < heading_block || room < self.line_height(self.title_size) {
            return Err(Error::InvalidConfig(format!(
                "content height {room:.1}pt cannot hold a heading and one body line"
            )));
        }
        if self.footer_offset <= 0.0 || self.footer_offset > self.margin_bottom {
            return Err(Error::InvalidConfig(
                "footer must sit inside the bottom margin".into(),
            ));
        }
        Ok(())
    }
}

/// Current page index and vertical offset of the next line's top edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageCursor {
    pub page: usize,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub bold: bool,
    pub color: Option<[u8; 3]>,
    pub align: Alignment,
}

impl TextStyle {
    pub fn body(config: &LayoutConfig) -> Self {
        Self {
            font_size: config.body_size,
            bold: false,
            color: None,
            align: Alignment::Left,
        }
    }

    pub fn heading(config: &LayoutConfig) -> Self {
        Self {
            font_size: config.heading_size,
            bold: true,
            color: Some(config.accent_color),
            align: Alignment::Left,
        }
    }

    pub fn title(config: &LayoutConfig) -> Self {
        Self {
            font_size: config.title_size,
            bold: true,
            color: Some(config.accent_color),
            align: Alignment::Center,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn colored(mut self, color: [u8; 3]) -> Self {
        self.color = Some(color);
        self
    }

    pub fn aligned(mut self, align: Alignment) -> Self {
        self.align = align;
        self
    }
}

/// Greedy word wrap. A word wider than `max_width` gets a line to itself.
pub fn wrap_text(
    measure: &dyn TextMeasure,
    text: &str,
    font_size: f32,
    bold: bool,
    max_width: f32,
) -> Vec<String> {
    let space_w = measure.text_width(" ", font_size, bold);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_x: f32 = 0.0;

    for word in text.split_whitespace() {
        let ww = measure.text_width(word, font_size, bold);
        if !current.is_empty() && current_x + space_w + ww > max_width {
            lines.push(std::mem::take(&mut current));
            current_x = 0.0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_x += space_w;
        }
        current.push_str(word);
        current_x += ww;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Shorten `line` until it fits `max_width` with a trailing ellipsis. With
/// `force` the ellipsis is added even when the line already fits.
fn fit_with_ellipsis(
    measure: &dyn TextMeasure,
    line: &str,
    font_size: f32,
    bold: bool,
    max_width: f32,
    force: bool,
) -> String {
    if !force && measure.text_width(line, font_size, bold) <= max_width {
        return line.to_string();
    }
    let mut kept: String = line.to_string();
    loop {
        let candidate = format!("{}{ELLIPSIS}", kept.trim_end());
        if kept.is_empty() || measure.text_width(&candidate, font_size, bold) <= max_width {
            return candidate;
        }
        kept.pop();
    }
}

/// Word wrap limited to `max_lines`. Cut text and over-wide words end in an
/// ellipsis; every returned line fits `max_width`.
pub fn clamp_lines(
    measure: &dyn TextMeasure,
    text: &str,
    font_size: f32,
    bold: bool,
    max_width: f32,
    max_lines: usize,
) -> Vec<String> {
    let mut lines = wrap_text(measure, text, font_size, bold, max_width);
    let cut = lines.len() > max_lines;
    lines.truncate(max_lines);
    let last = lines.len().saturating_sub(1);
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            fit_with_ellipsis(measure, line, font_size, bold, max_width, cut && i == last)
        })
        .collect()
}

pub struct LayoutEngine<'a> {
    config: &'a LayoutConfig,
    measure: &'a dyn TextMeasure,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(config: &'a LayoutConfig, measure: &'a dyn TextMeasure) -> Self {
        Self { config, measure }
    }

    pub fn config(&self) -> &LayoutConfig {
        self.config
    }

    /// An empty document with one blank page.
    pub fn start_document(&self) -> (Document, PageCursor) {
        let mut doc = Document::new(self.config.page_width, self.config.page_height);
        let cursor = self.new_page(&mut doc);
        (doc, cursor)
    }

    pub fn new_page(&self, doc: &mut Document) -> PageCursor {
        doc.pages.push(Page::default());
        PageCursor {
            page: doc.pages.len() - 1,
            y: self.config.margin_top,
        }
    }

    pub fn at_page_top(&self, cursor: PageCursor) -> bool {
        (cursor.y - self.config.margin_top).abs() < AT_TOP_TOLERANCE
    }

    /// Start a fresh page unless the cursor already sits on an untouched one.
    pub fn page_break(&self, doc: &mut Document, cursor: PageCursor) -> PageCursor {
        let untouched = doc.pages.get(cursor.page).is_some_and(Page::is_empty);
        if untouched && self.at_page_top(cursor) {
            cursor
        } else {
            self.new_page(doc)
        }
    }

    /// Break before placing something `needed` points tall that would cross
    /// the bottom margin.
    fn ensure_room(&self, doc: &mut Document, cursor: PageCursor, needed: f32) -> PageCursor {
        if cursor.y + needed > self.config.bottom_limit() && !self.at_page_top(cursor) {
            self.new_page(doc)
        } else {
            cursor
        }
    }

    pub fn skip(&self, cursor: PageCursor, dy: f32) -> PageCursor {
        PageCursor {
            page: cursor.page,
            y: cursor.y + dy,
        }
    }

    fn push(&self, doc: &mut Document, cursor: PageCursor, block: Block) {
        if let Some(page) = doc.pages.get_mut(cursor.page) {
            page.blocks.push(block);
        }
    }

    fn text_block(&self, text: &str, x: f32, y: f32, style: &TextStyle) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            x,
            y,
            width: self.measure.text_width(text, style.font_size, style.bold),
            font_size: style.font_size,
            line_height: self.config.line_height(style.font_size),
            bold: style.bold,
            color: style.color,
        }
    }

    /// Place one already-wrapped line inside the horizontal band
    /// `[left, left + avail]`.
    fn place_line(
        &self,
        doc: &mut Document,
        cursor: PageCursor,
        text: &str,
        style: &TextStyle,
        left: f32,
        avail: f32,
    ) -> PageCursor {
        let line_h = self.config.line_height(style.font_size);
        let cursor = self.ensure_room(doc, cursor, line_h);
        let mut block = self.text_block(text, left, cursor.y, style);
        block.x = match style.align {
            Alignment::Left => left,
            Alignment::Center => left + (avail - block.width) / 2.0,
            Alignment::Right => left + avail - block.width,
        };
        self.push(doc, cursor, Block::Text(block));
        self.skip(cursor, line_h)
    }

    /// Wrapped text. Blank lines separate paragraphs; paragraph spacing follows
    /// each one.
    pub fn paragraph(
        &self,
        doc: &mut Document,
        mut cursor: PageCursor,
        text: &str,
        style: &TextStyle,
    ) -> PageCursor {
        let left = self.config.margin_left;
        let avail = self.config.content_width();
        for para in text.split("\n\n") {
            let lines = wrap_text(self.measure, para, style.font_size, style.bold, avail);
            if lines.is_empty() {
                continue;
            }
            for line in &lines {
                cursor = self.place_line(doc, cursor, line, style, left, avail);
            }
            cursor = self.skip(cursor, self.config.paragraph_spacing);
        }
        cursor
    }

    /// At most `max_lines` lines of `text`, shortened with an ellipsis when
    /// cut. Used where the block must stay a fixed size.
    pub fn clamped_paragraph(
        &self,
        doc: &mut Document,
        mut cursor: PageCursor,
        text: &str,
        style: &TextStyle,
        max_lines: usize,
    ) -> PageCursor {
        let left = self.config.margin_left;
        let avail = self.config.content_width();
        let lines = clamp_lines(self.measure, text, style.font_size, style.bold, avail, max_lines);
        if lines.is_empty() {
            return cursor;
        }
        for line in &lines {
            cursor = self.place_line(doc, cursor, line, style, left, avail);
        }
        self.skip(cursor, self.config.paragraph_spacing)
    }

    /// A heading never ends a page: it moves to the next page unless one body
    /// line fits beneath it.
    pub fn heading(
        &self,
        doc: &mut Document,
        cursor: PageCursor,
        text: &str,
        style: &TextStyle,
    ) -> PageCursor {
        let avail = self.config.content_width();
        let lines = wrap_text(self.measure, text, style.font_size, style.bold, avail);
        if lines.is_empty() {
            return cursor;
        }
        let space_before = if self.at_page_top(cursor) {
            0.0
        } else {
            self.config.heading_space_before
        };
        let needed = space_before
            + lines.len() as f32 * self.config.line_height(style.font_size)
            + self.config.line_height(self.config.body_size);

        let mut cursor = if cursor.y + needed > self.config.bottom_limit() {
            self.page_break(doc, cursor)
        } else {
            self.skip(cursor, space_before)
        };
        for line in &lines {
            cursor = self.place_line(doc, cursor, line, style, self.config.margin_left, avail);
        }
        cursor
    }

    /// Bulleted items; every wrapped line advances by the same line height and
    /// is checked on its own.
    pub fn bullets(
        &self,
        doc: &mut Document,
        mut cursor: PageCursor,
        items: &[String],
        style: &TextStyle,
    ) -> PageCursor {
        let indent = self.config.bullet_indent;
        let bullet_x = self.config.margin_left + indent / 3.0;
        let text_x = self.config.margin_left + indent;
        let avail = self.config.content_width() - indent;
        let line_h = self.config.line_height(style.font_size);
        let left_style = style.aligned(Alignment::Left);

        for item in items {
            let lines = wrap_text(self.measure, item, style.font_size, style.bold, avail);
            for (i, line) in lines.iter().enumerate() {
                cursor = self.ensure_room(doc, cursor, line_h);
                if i == 0 {
                    let bullet = self.text_block(BULLET, bullet_x, cursor.y, &left_style);
                    self.push(doc, cursor, Block::Text(bullet));
                }
                cursor = self.place_line(doc, cursor, line, &left_style, text_x, avail);
            }
        }
        cursor
    }

    /// One line with `left` flush left, `right` flush right, and dot leaders
    /// filling the gap.
    pub fn leader_line(
        &self,
        doc: &mut Document,
        cursor: PageCursor,
        left: &str,
        right: &str,
        style: &TextStyle,
    ) -> PageCursor {
        let line_h = self.config.line_height(style.font_size);
        let cursor = self.ensure_room(doc, cursor, line_h);
        let x0 = self.config.margin_left;
        let x1 = x0 + self.config.content_width();

        let left_block = self.text_block(left, x0, cursor.y, style);
        let mut right_block = self.text_block(right, x0, cursor.y, style);
        right_block.x = x1 - right_block.width;

        let leader_w = self
            .measure
            .text_width(&LEADER.to_string(), style.font_size, style.bold);
        let gap_start = x0 + left_block.width;
        let gap = right_block.x - gap_start;
        if leader_w > 0.0 && gap > leader_w * 3.0 {
            let count = ((gap - leader_w * 2.0) / leader_w).floor() as usize;
            if count > 0 {
                let leaders: String = std::iter::repeat_n(LEADER, count).collect();
                let lead_style = TextStyle {
                    bold: false,
                    color: Some(self.config.muted_color),
                    ..*style
                };
                let mut block = self.text_block(&leaders, x0, cursor.y, &lead_style);
                block.x = right_block.x - leader_w - block.width;
                self.push(doc, cursor, Block::Text(left_block));
                self.push(doc, cursor, Block::Text(block));
                self.push(doc, cursor, Block::Text(right_block));
                return self.skip(cursor, line_h);
            }
        }
        self.push(doc, cursor, Block::Text(left_block));
        self.push(doc, cursor, Block::Text(right_block));
        self.skip(cursor, line_h)
    }

    /// Label/value rows, values in a second column.
    pub fn metric_rows(
        &self,
        doc: &mut Document,
        mut cursor: PageCursor,
        rows: &[(String, String)],
        style: &TextStyle,
    ) -> PageCursor {
        let line_h = self.config.line_height(style.font_size);
        let label_x = self.config.margin_left + self.config.bullet_indent;
        let value_x = self.config.margin_left + self.config.content_width() * 0.45;
        let label_style = style.bold();
        for (label, value) in rows {
            cursor = self.ensure_room(doc, cursor, line_h);
            let label_block = self.text_block(&format!("{label}:"), label_x, cursor.y, &label_style);
            let value_block = self.text_block(value, value_x, cursor.y, style);
            self.push(doc, cursor, Block::Text(label_block));
            self.push(doc, cursor, Block::Text(value_block));
            cursor = self.skip(cursor, line_h);
        }
        cursor
    }

    /// Full-width horizontal rule with a little space around it.
    pub fn rule(
        &self,
        doc: &mut Document,
        cursor: PageCursor,
        thickness: f32,
        color: Option<[u8; 3]>,
    ) -> PageCursor {
        let pad = 6.0;
        let cursor = self.ensure_room(doc, cursor, pad * 2.0 + thickness);
        let rule = Rule {
            x: self.config.margin_left,
            y: cursor.y + pad,
            width: self.config.content_width(),
            thickness,
            color,
        };
        self.push(doc, cursor, Block::Rule(rule));
        self.skip(cursor, pad * 2.0 + thickness)
    }

    /// Centered image scaled to fit `max_width` x `max_height`, aspect kept.
    pub fn image(
        &self,
        doc: &mut Document,
        cursor: PageCursor,
        image: usize,
        max_width: f32,
        max_height: f32,
    ) -> PageCursor {
        let Some(img) = doc.images.get(image) else {
            return cursor;
        };
        if img.pixel_width == 0 || img.pixel_height == 0 {
            return cursor;
        }
        let (pw, ph) = (img.pixel_width as f32, img.pixel_height as f32);
        let scale = (max_width / pw).min(max_height / ph);
        let (width, height) = (pw * scale, ph * scale);
        let cursor = self.ensure_room(doc, cursor, height);
        let block = ImageBlock {
            x: self.config.margin_left + (self.config.content_width() - width) / 2.0,
            y: cursor.y,
            width,
            height,
            image,
        };
        self.push(doc, cursor, Block::Image(block));
        self.skip(cursor, height)
    }

    /// Write `"Page {n} of {total}"` centered and `legend` flush left on every
    /// page. Must run after the last page has been added.
    pub fn write_footers(&self, doc: &mut Document, legend: &str) {
        let total = doc.pages.len();
        let y = self.config.page_height - self.config.footer_offset;
        let style = TextStyle {
            font_size: self.config.footer_size,
            bold: false,
            color: Some(self.config.muted_color),
            align: Alignment::Center,
        };
        let x0 = self.config.margin_left;
        let avail = self.config.content_width();
        for (i, page) in doc.pages.iter_mut().enumerate() {
            let mut page_label = self.text_block(&format!("Page {} of {}", i + 1, total), x0, y, &style);
            page_label.x = x0 + (avail - page_label.width) / 2.0;
            let legend = self.text_block(legend, x0, y, &style);
            page.footer = Some(Footer { page_label, legend });
        }
    }
}
