use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::error::{Error, Result};

/// Text-measuring capability used for line wrapping and alignment.
pub trait TextMeasure {
    /// Advance width of `text` in points.
    fn text_width(&self, text: &str, font_size: f32, bold: bool) -> f32;

    /// Ascent as a fraction of the font size, used to place baselines.
    fn ascender_ratio(&self) -> f32 {
        0.75
    }
}

/// Per-face advance widths in 1000-units.
#[derive(Clone, Debug)]
pub struct FaceMetrics {
    /// WinAnsi chars 32..=255.
    widths_1000: Vec<f32>,
    ascender_ratio: Option<f32>,
}

impl FaceMetrics {
    fn helvetica(bold: bool) -> Self {
        Self {
            widths_1000: if bold {
                helvetica_bold_widths()
            } else {
                helvetica_widths()
            },
            ascender_ratio: None,
        }
    }

    /// Width of a single character in 1000-units. Chars outside WinAnsi get
    /// an average width.
    pub fn char_width_1000(&self, ch: char) -> f32 {
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            self.widths_1000[(byte - 32) as usize]
        } else {
            556.0
        }
    }

    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }
}

/// A TrueType/OpenType face loaded from disk.
pub struct TrueTypeFont {
    name: String,
    data: Mmap,
    face_index: u32,
    metrics: FaceMetrics,
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("name", &self.name)
            .field("face_index", &self.face_index)
            .finish()
    }
}

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

impl TrueTypeFont {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display()))
        })?;
        // SAFETY: the mapping is read-only and the file is not modified while loaded.
        let data = unsafe { Mmap::map(&file) }?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Embedded")
            .to_string();
        Self::from_data(data, &fallback)
    }

    fn from_data(data: Mmap, fallback_name: &str) -> Result<Self> {
        let face_index = 0;
        let face = Face::parse(&data, face_index)
            .map_err(|e| Error::Font(format!("cannot parse {fallback_name}: {e}")))?;
        if matches!(face.permissions(), Some(ttf_parser::Permissions::Restricted)) {
            return Err(Error::Font(format!(
                "{fallback_name}: license does not permit embedding"
            )));
        }
        if i32::try_from(data.len()).is_err() {
            return Err(Error::Font(format!("{fallback_name}: font file too large to embed")));
        }
        if !face.is_subsetting_allowed() {
            log::warn!("{fallback_name}: subsetting not permitted, the full font will be embedded");
        }
        let units = face.units_per_em() as f32;

        let widths_1000: Vec<f32> = (32u8..=255u8)
            .map(|byte| {
                face.glyph_index(winansi_to_char(byte))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0)
            })
            .collect();

        let metrics = FaceMetrics {
            widths_1000,
            ascender_ratio: Some(face.ascender() as f32 / units),
        };
        let name = font_family_name(&face).unwrap_or_else(|| fallback_name.to_string());
        log::debug!("Loaded font {name} ({} units/em)", units);

        Ok(Self {
            name,
            data,
            face_index,
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
pub enum FontSource {
    Helvetica,
    TrueType(TrueTypeFont),
}

impl FontSource {
    fn metrics(&self, bold: bool) -> FaceMetrics {
        match self {
            FontSource::Helvetica => FaceMetrics::helvetica(bold),
            FontSource::TrueType(f) => f.metrics.clone(),
        }
    }
}

/// Regular and bold faces used for a whole document.
#[derive(Debug)]
pub struct FontSet {
    regular: FontSource,
    bold: FontSource,
    regular_metrics: FaceMetrics,
    bold_metrics: FaceMetrics,
}

impl Default for FontSet {
    fn default() -> Self {
        Self::helvetica()
    }
}

impl FontSet {
    pub fn helvetica() -> Self {
        Self::new(FontSource::Helvetica, FontSource::Helvetica)
    }

    pub fn new(regular: FontSource, bold: FontSource) -> Self {
        let regular_metrics = regular.metrics(false);
        let bold_metrics = bold.metrics(true);
        Self {
            regular,
            bold,
            regular_metrics,
            bold_metrics,
        }
    }

    /// Load TrueType faces from disk. A missing bold face reuses the regular
    /// file; no regular face means built-in Helvetica for both.
    pub fn load(regular: Option<&PathBuf>, bold: Option<&PathBuf>) -> Result<Self> {
        let Some(regular_path) = regular else {
            if bold.is_some() {
                log::warn!("Bold font given without a regular font; using Helvetica");
            }
            return Ok(Self::helvetica());
        };
        let regular_font = TrueTypeFont::open(regular_path)?;
        let bold_font = match bold {
            Some(p) => TrueTypeFont::open(p)?,
            None => TrueTypeFont::open(regular_path)?,
        };
        Ok(Self::new(
            FontSource::TrueType(regular_font),
            FontSource::TrueType(bold_font),
        ))
    }

    /// Characters of `text` the face cannot draw, in first-seen order. With
    /// Helvetica these are the chars outside WinAnsi, which are dropped on
    /// output.
    pub fn missing_glyphs(&self, text: &str, bold: bool) -> Vec<char> {
        let mut missing: Vec<char> = Vec::new();
        let face = match self.source(bold) {
            FontSource::TrueType(f) => Face::parse(&f.data, f.face_index).ok(),
            FontSource::Helvetica => None,
        };
        for ch in text.chars() {
            let drawable = match &face {
                Some(face) => face.glyph_index(ch).is_some(),
                None => char_to_winansi(ch) != 0,
            };
            if !drawable && !missing.contains(&ch) {
                missing.push(ch);
            }
        }
        missing
    }

    pub(crate) fn source(&self, bold: bool) -> &FontSource {
        if bold { &self.bold } else { &self.regular }
    }

    fn face(&self, bold: bool) -> &FaceMetrics {
        if bold {
            &self.bold_metrics
        } else {
            &self.regular_metrics
        }
    }
}

impl TextMeasure for FontSet {
    fn text_width(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        self.face(bold).text_width(text, font_size)
    }

    fn ascender_ratio(&self) -> f32 {
        self.regular_metrics.ascender_ratio.unwrap_or(0.75)
    }
}

/// The 0x80..=0x9F block of Windows-1252, where it departs from Latin-1.
const WINANSI_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

fn winansi_to_char(byte: u8) -> char {
    WINANSI_HIGH
        .iter()
        .find(|&&(b, _)| b == byte)
        .map_or(byte as char, |&(_, c)| c)
}

/// WinAnsi byte for `c`, or 0 when the char has none.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x20..=0x7F | 0xA0..=0xFF => c as u8,
        _ => WINANSI_HIGH
            .iter()
            .find(|&&(_, ch)| ch == c)
            .map_or(0, |&(b, _)| b),
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str encoding.
/// Unmappable chars are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match char_to_winansi(c) {
            0 => None,
            b => Some(b),
        })
        .collect()
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.push((gid >> 8) as u8);
        out.push((gid & 0xFF) as u8);
    }
    out
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 => 833.0,                          // M (wide)
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => 833.0,                   // m w (wide)
            97..=122 => 556.0,                    // lowercase a-z (average)
            _ => 556.0,
        })
        .collect()
}

/// Approximate Helvetica-Bold widths, same layout as `helvetica_widths`.
fn helvetica_bold_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,
            33..=47 => 333.0,
            48..=57 => 556.0,
            58..=64 => 333.0,
            73 => 278.0,
            74 => 556.0,
            77 => 833.0,
            65..=90 => 722.0,
            91..=96 => 333.0,
            102 | 105 | 106 | 108 | 116 => 333.0,
            109 => 889.0,
            119 => 778.0,
            97..=122 => 611.0,
            _ => 611.0,
        })
        .collect()
}

/// A font registered in a PDF under a resource name.
pub(crate) struct RegisteredFont {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    /// Present for embedded CID fonts; text is then encoded as glyph ids.
    pub(crate) char_to_gid: Option<HashMap<char, u16>>,
}

impl RegisteredFont {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding.
/// The font data is subsetted to only include glyphs used in the document.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    font: &TrueTypeFont,
    used_chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<HashMap<char, u16>> {
    let font_data: &[u8] = &font.data;
    let face = Face::parse(font_data, font.face_index).ok()?;

    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);

    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = HashMap::new();
    for &ch in used_chars {
        if let Some(gid) = face.glyph_index(ch) {
            char_to_gid.insert(ch, remapper.remap(gid.0));
        }
    }

    let subset_data = subsetter::subset(font_data, font.face_index, &remapper)
        .unwrap_or_else(|e| {
            log::warn!("Font subsetting failed for {}: {e}; embedding full font", font.name);
            font_data.to_vec()
        });

    let descriptor_ref = alloc();
    let data_ref = alloc();
    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    let ps_name = font.name.replace(' ', "");

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let cid_font_ref = alloc();
    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        let mut gid_widths: Vec<(u16, f32)> = char_to_gid
            .iter()
            .filter_map(|(&ch, &new_gid)| {
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| (new_gid, adv as f32 / units * 1000.0))
            })
            .collect();
        gid_widths.sort_by_key(|&(gid, _)| gid);
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc();
    let cmap_name = format!("{}-UTF16", ps_name);
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for (&ch, &new_gid) in &char_to_gid {
        cmap.pair(new_gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(char_to_gid)
}

/// Write one face of the font set into the PDF. Embedding failures fall back
/// to the matching Helvetica face.
pub(crate) fn register_font(
    pdf: &mut Pdf,
    fonts: &FontSet,
    bold: bool,
    pdf_name: String,
    alloc: &mut impl FnMut() -> Ref,
    used_chars: &HashSet<char>,
) -> RegisteredFont {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();

    let char_to_gid = match fonts.source(bold) {
        FontSource::TrueType(font) => {
            let embedded = embed_truetype(pdf, font_ref, font, used_chars, alloc);
            if embedded.is_none() {
                log::warn!(
                    "Could not embed {} bold={bold}; using Helvetica. Text was measured \
                     with {} widths and may not line up as placed",
                    font.name,
                    font.name
                );
            }
            embedded
        }
        FontSource::Helvetica => None,
    };

    let mut dropped: Vec<char> = match &char_to_gid {
        Some(map) => used_chars.iter().filter(|c| !map.contains_key(*c)).copied().collect(),
        None => used_chars.iter().filter(|&&c| char_to_winansi(c) == 0).copied().collect(),
    };
    if !dropped.is_empty() {
        dropped.sort_unstable();
        let list: String = dropped.iter().collect();
        log::warn!(
            "{pdf_name} bold={bold}: {} character(s) have no glyph and will not render: {list}",
            dropped.len()
        );
    }

    if char_to_gid.is_none() {
        let base: &[u8] = if bold { b"Helvetica-Bold" } else { b"Helvetica" };
        pdf.type1_font(font_ref)
            .base_font(Name(base))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    log::debug!(
        "register_font: {pdf_name} bold={bold} → {:.1}ms",
        t0.elapsed().as_secs_f64() * 1000.0,
    );

    RegisteredFont {
        pdf_name,
        font_ref,
        char_to_gid,
    }
}
