use crate::context::{Font, FontStyle};
use crate::error::MeasureError;
use crate::geometry::Size;
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;
use ttf_parser::Face;

/// Text measurement capability supplied by the rendering side.
pub trait TextMeasure {
    fn measure_text(&self, text: &str, font: &Font) -> Result<Size, MeasureError>;
}

impl<T: TextMeasure + ?Sized> TextMeasure for Box<T> {
    fn measure_text(&self, text: &str, font: &Font) -> Result<Size, MeasureError> {
        (**self).measure_text(text, font)
    }
}

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Measures with real font faces from the system font database.
#[derive(Debug, Clone)]
pub struct FontDbMeasurer {
    fallback_families: Vec<String>,
}

impl FontDbMeasurer {
    /// Falls back to the generic sans-serif face when the requested family is
    /// not installed.
    pub fn new() -> Self {
        Self {
            fallback_families: vec!["sans-serif".to_string()],
        }
    }

    /// Only the requested families are considered.
    pub fn strict() -> Self {
        Self {
            fallback_families: Vec::new(),
        }
    }

    fn family_list(&self, family: &str) -> String {
        let mut list = family.trim().to_string();
        for fallback in &self.fallback_families {
            if !list.is_empty() {
                list.push_str(", ");
            }
            list.push_str(fallback);
        }
        list
    }
}

impl Default for FontDbMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for FontDbMeasurer {
    fn measure_text(&self, text: &str, font: &Font) -> Result<Size, MeasureError> {
        let families = self.family_list(&font.family);
        let mut guard = TEXT_MEASURER
            .lock()
            .map_err(|_| MeasureError::Backend("font cache lock poisoned".to_string()))?;
        guard
            .measure(text, font.size, &families, font.style)
            .ok_or_else(|| MeasureError::FontUnavailable(families))
    }
}

/// Deterministic measurer based on per-character width factors. It never
/// touches the font database.
#[derive(Debug, Clone)]
pub struct ApproximateMeasurer {
    pub line_height: f32,
}

impl Default for ApproximateMeasurer {
    fn default() -> Self {
        Self {
            line_height: DEFAULT_LINE_HEIGHT,
        }
    }
}

impl TextMeasure for ApproximateMeasurer {
    fn measure_text(&self, text: &str, font: &Font) -> Result<Size, MeasureError> {
        let mut size = fallback_text_size(text, font.size, self.line_height);
        if font.style.is_bold() {
            size.width *= 1.05;
        }
        Ok(size)
    }
}

/// Line advance, in multiples of the font size, used when no face metrics
/// are available.
pub const DEFAULT_LINE_HEIGHT: f32 = 1.25;

/// Width of the widest `\n`-separated line.
pub fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    fallback_text_size(text, font_size, DEFAULT_LINE_HEIGHT).width
}

fn fallback_text_size(text: &str, font_size: f32, line_height: f32) -> Size {
    stack_lines(text, font_size * line_height, |line| {
        Some(line.chars().map(char_width_factor).sum::<f32>() * font_size)
    })
    .unwrap_or(Size::ZERO)
}

/// Lays `text` out one line per `\n`: the widest line sets the width, each
/// line adds `line_height`.
fn stack_lines(
    text: &str,
    line_height: f32,
    mut line_width: impl FnMut(&str) -> Option<f32>,
) -> Option<Size> {
    let mut width = 0.0f32;
    let mut count = 0usize;
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        width = width.max(line_width(line)?);
        count += 1;
    }
    Some(Size::new(width, line_height * count as f32))
}

pub fn char_width_factor(ch: char) -> f32 {
    match ch {
        '\t' => 1.224,
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'a' => 0.550,
        'b' => 0.603,
        'c' => 0.547,
        'd' => 0.609,
        'e' => 0.570,
        'f' => 0.340,
        'g' | 'h' => 0.600,
        'i' => 0.235,
        'j' => 0.227,
        'k' => 0.522,
        'l' => 0.239,
        'm' => 0.867,
        'n' => 0.585,
        'o' => 0.574,
        'p' => 0.595,
        'q' => 0.585,
        'r' => 0.364,
        's' => 0.523,
        't' => 0.305,
        'u' => 0.585,
        'v' => 0.545,
        'w' => 0.811,
        'x' => 0.538,
        'y' => 0.556,
        'z' => 0.550,
        '0' => 0.613,
        '1' => 0.396,
        '2' => 0.609,
        '3' => 0.597,
        '4' => 0.614,
        '5' => 0.586,
        '6' => 0.608,
        '7' => 0.559,
        '8' => 0.611,
        '9' => 0.595,
        '@' | '#' | '%' | '&' => 0.946,
        _ => 0.568,
    }
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(
        &mut self,
        text: &str,
        font_size: f32,
        font_family: &str,
        style: FontStyle,
    ) -> Option<Size> {
        let key = face_key(font_family, style);
        if !self.cache.contains_key(&key) {
            let face = self.load_face(font_family, style, &key);
            if face.is_none() {
                warn!(family = font_family; "no font face matches family");
            }
            self.cache.insert(key.clone(), face);
        }
        let face = self.cache.get_mut(&key).and_then(|face| face.as_mut())?;
        if font_size <= 0.0 {
            return Some(Size::ZERO);
        }
        let normalized = text.replace('\t', "    ");
        let line_height = face.line_height(font_size);
        stack_lines(&normalized, line_height, |line| {
            face.measure_width(line, font_size)
        })
    }

    fn load_face(&mut self, font_family: &str, style: FontStyle, key: &str) -> Option<FontFace> {
        if let Some(face) = load_cached_face(key) {
            return Some(face);
        }
        #[derive(Clone, Copy)]
        enum FamilyToken {
            Generic(Family<'static>),
            Name(usize),
        }

        let mut names: Vec<String> = Vec::new();
        let mut order: Vec<FamilyToken> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            match raw.to_ascii_lowercase().as_str() {
                "serif" => order.push(FamilyToken::Generic(Family::Serif)),
                "sans-serif" => order.push(FamilyToken::Generic(Family::SansSerif)),
                "monospace" => order.push(FamilyToken::Generic(Family::Monospace)),
                "cursive" => order.push(FamilyToken::Generic(Family::Cursive)),
                "fantasy" => order.push(FamilyToken::Generic(Family::Fantasy)),
                "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    order.push(FamilyToken::Generic(Family::SansSerif))
                }
                "ui-monospace" => order.push(FamilyToken::Generic(Family::Monospace)),
                _ => {
                    let idx = names.len();
                    names.push(raw.to_string());
                    order.push(FamilyToken::Name(idx));
                }
            }
        }
        if order.is_empty() {
            return None;
        }

        let families: Vec<Family<'_>> = order
            .iter()
            .map(|token| match *token {
                FamilyToken::Generic(family) => family,
                FamilyToken::Name(idx) => Family::Name(names[idx].as_str()),
            })
            .collect();

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
            debug!(faces = self.db.len(); "loaded system fonts");
        }

        let query = Query {
            families: &families,
            weight: if style.is_bold() {
                Weight::BOLD
            } else {
                Weight::NORMAL
            },
            stretch: Stretch::Normal,
            style: if style.is_italic() {
                Style::Italic
            } else {
                Style::Normal
            },
        };
        let id = self.db.query(&query)?;
        let mut loaded: Option<FontFace> = None;
        self.db.with_face_data(id, |data, index| {
            let bytes = data.to_vec();
            if Face::parse(&bytes, index).is_ok() {
                if let Some((font_path, meta_path)) = cache_paths(key)
                    && !font_path.exists()
                {
                    if let Some(parent) = font_path.parent() {
                        let _ = fs::create_dir_all(parent);
                    }
                    let _ = fs::write(&font_path, &bytes);
                    let _ = fs::write(&meta_path, index.to_string());
                }
                loaded = FontFace::new(bytes, index);
            }
        });
        loaded
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    line_units: i32,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let line_units = i32::from(face.ascender()) - i32::from(face.descender())
            + i32::from(face.line_gap());
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            line_units,
            ascii_advances,
            advance_cache: HashMap::new(),
        })
    }

    fn line_height(&self, font_size: f32) -> f32 {
        self.line_units.max(0) as f32 * font_size / self.units_per_em as f32
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;

        if text.is_ascii() {
            let mut width = 0.0f32;
            for byte in text.as_bytes() {
                if *byte == b'\n' {
                    continue;
                }
                let advance = self.ascii_advances[*byte as usize];
                if advance == 0 {
                    width += fallback;
                } else {
                    width += advance as f32 * scale;
                }
            }
            return Some(width.max(0.0));
        }

        let face = Face::parse(&self.data, self.index).ok()?;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = *self.advance_cache.entry(ch).or_insert_with(|| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
            });
            match advance {
                Some(advance) => width += advance as f32 * scale,
                None => width += fallback,
            }
        }
        Some(width.max(0.0))
    }
}

fn face_key(font_family: &str, style: FontStyle) -> String {
    format!("{}|{:?}", font_family.trim(), style)
}

fn cache_paths(key: &str) -> Option<(PathBuf, PathBuf)> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();
    let dir = base.join("rowtree").join("font-cache");
    let font_path = dir.join(format!("{hash:x}.font"));
    let meta_path = dir.join(format!("{hash:x}.meta"));
    Some((font_path, meta_path))
}

fn load_cached_face(key: &str) -> Option<FontFace> {
    let (font_path, meta_path) = cache_paths(key)?;
    if !font_path.exists() || !meta_path.exists() {
        return None;
    }
    let bytes = fs::read(font_path).ok()?;
    let index: u32 = fs::read_to_string(meta_path).ok()?.trim().parse().ok()?;
    FontFace::new(bytes, index)
}
