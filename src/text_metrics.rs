use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use ttf_parser::Face;
use usvg::fontdb::{Database, Family, ID, Query, Stretch, Style, Weight};

use crate::error::{BannerError, Result};

static SYSTEM_FONTS: Lazy<Arc<FontBook>> = Lazy::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "loaded system fonts");
    Arc::new(FontBook::from_database(db))
});

/// Vertical extents for one font size, y-up (descent is negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
}

impl LineMetrics {
    pub fn height(&self) -> f32 {
        self.ascent - self.descent
    }

    /// Baseline shift that puts the middle of the line box on a given y.
    pub fn middle_baseline_offset(&self) -> f32 {
        (self.ascent + self.descent) / 2.0
    }
}

/// Font loading service and text measurement.
///
/// Families are resolved against a fontdb database, the same one handed to
/// usvg when rendering so measured and drawn glyphs agree. Families that
/// resolve to nothing are measured with a calibrated per-character table.
pub struct FontBook {
    db: Arc<Database>,
    faces: Mutex<HashMap<String, Option<Arc<FontFace>>>>,
}

impl FontBook {
    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            faces: Mutex::new(HashMap::new()),
        }
    }

    /// No faces at all; measurement is purely heuristic and deterministic.
    pub fn empty() -> Self {
        Self::from_database(Database::new())
    }

    /// Process-wide book of installed system fonts, loaded on first use.
    pub fn system() -> Arc<FontBook> {
        Arc::clone(&SYSTEM_FONTS)
    }

    /// A copy of this book with one more font file registered. The file is
    /// required: a missing or unparseable file is an error.
    pub fn with_font_file(&self, path: &Path) -> Result<FontBook> {
        let mut db = (*self.db).clone();
        load_font_file(&mut db, path)?;
        Ok(Self::from_database(db))
    }

    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }

    pub fn is_empty(&self) -> bool {
        self.db.len() == 0
    }

    pub fn has_family(&self, font_family: &str) -> bool {
        self.face(font_family).is_some()
    }

    pub fn measure(&self, text: &str, font_size: f32, font_family: &str) -> f32 {
        if text.is_empty() || font_size <= 0.0 {
            return 0.0;
        }
        match self.face(font_family) {
            Some(face) => face.measure_width(text, font_size),
            None => fallback_text_width(text, font_size),
        }
    }

    pub fn line_metrics(&self, font_size: f32, font_family: &str) -> LineMetrics {
        match self.face(font_family) {
            Some(face) => face.line_metrics(font_size),
            None => LineMetrics {
                ascent: font_size * 0.8,
                descent: font_size * -0.2,
            },
        }
    }

    fn face(&self, font_family: &str) -> Option<Arc<FontFace>> {
        let key = normalize_family_key(font_family);
        let mut faces = match self.faces.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(face) = faces.get(&key) {
            return face.clone();
        }
        let face = self.load_face(&key).map(Arc::new);
        if face.is_none() && self.db.len() > 0 {
            tracing::warn!(family = %key, "font family not found, using estimated metrics");
        }
        faces.insert(key, face.clone());
        face
    }

    fn load_face(&self, font_family: &str) -> Option<FontFace> {
        let id = self.query(font_family)?;
        self.db
            .with_face_data(id, |data, index| FontFace::parse(data.to_vec(), index))
            .flatten()
    }

    fn query(&self, font_family: &str) -> Option<ID> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" => Family::SansSerif,
                "monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(*raw),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }
        self.db.query(&Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        })
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.db.len())
            .finish_non_exhaustive()
    }
}

pub fn load_font_file(db: &mut Database, path: &Path) -> Result<()> {
    let resource = path.display().to_string();
    let data = std::fs::read(path).map_err(|err| BannerError::unavailable(&resource, err))?;
    Face::parse(&data, 0).map_err(|err| BannerError::unavailable(&resource, err))?;
    db.load_font_data(data);
    tracing::debug!(font = %resource, "registered font file");
    Ok(())
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    ascender: f32,
    descender: f32,
    ascii_advances: [u16; 128],
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        let units_per_em = face.units_per_em().max(1) as f32;
        let ascender = face.ascender() as f32;
        let descender = face.descender() as f32;
        Some(Self {
            data,
            index,
            units_per_em,
            ascender,
            descender,
            ascii_advances,
        })
    }

    fn measure_width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * 0.56;

        if text.is_ascii() {
            return text
                .bytes()
                .filter(|b| *b != b'\n')
                .map(|b| match self.ascii_advances[b as usize] {
                    0 => fallback,
                    advance => advance as f32 * scale,
                })
                .sum();
        }

        let Ok(face) = Face::parse(&self.data, self.index) else {
            return fallback_text_width(text, font_size);
        };
        text.chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .map_or(fallback, |advance| advance as f32 * scale)
            })
            .sum()
    }

    fn line_metrics(&self, font_size: f32) -> LineMetrics {
        let scale = font_size / self.units_per_em;
        LineMetrics {
            ascent: self.ascender * scale,
            descent: self.descender * scale,
        }
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

fn char_width_factor(ch: char) -> f32 {
    // Average advances of a condensed display face at 1px.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'I' | 'i' | 'j' | 'l' => 0.26,
        'M' | 'W' | 'm' | 'w' => 0.86,
        'A'..='Z' => 0.66,
        'f' | 'r' | 't' => 0.34,
        'a'..='z' => 0.56,
        '1' => 0.396,
        '0'..='9' => 0.6,
        '@' | '#' | '%' | '&' => 0.946,
        _ => 0.568,
    }
}
