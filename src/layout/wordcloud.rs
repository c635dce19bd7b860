use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::WordCloudSettings;
use crate::geometry::Rect;
use crate::text_metrics::FontBook;

/// Word-cloud input. `size` is a visual weight; the settings' font-size
/// strategy turns it into pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub size: f32,
}

impl Word {
    pub fn new(text: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    /// Rendered font size in px.
    pub size: f32,
    /// Degrees, clockwise.
    pub rotate: f32,
    /// Centre of the word, relative to the cloud's top-left corner.
    pub x: f32,
    pub y: f32,
    /// Padded, rotated bounding box in cloud coordinates.
    pub bounds: Rect,
    pub style: String,
}

/// Packs words into the settings' cloud region, largest first.
///
/// Every word gets a rotation drawn from the discrete angle set, then walks
/// a rectangular spiral out from a jittered start near the centre until its
/// box fits inside the region without touching an earlier word. Words that
/// never find a spot are left out.
pub fn pack<R: Rng + ?Sized>(
    words: &[Word],
    settings: &WordCloudSettings,
    fonts: &FontBook,
    rng: &mut R,
) -> Vec<PlacedWord> {
    let region = Rect {
        x: 0.0,
        y: 0.0,
        width: settings.cloud_width,
        height: settings.cloud_height,
    };
    let angles = settings.rotation_angles();

    let mut sized: Vec<(&Word, f32)> = words
        .iter()
        .filter(|word| is_packable(word, settings))
        .map(|word| (word, (settings.font_size)(word, settings)))
        .collect();
    sized.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut placed: Vec<PlacedWord> = Vec::with_capacity(sized.len());
    for (word, size) in sized {
        let rotate = angles[rng.random_range(0..angles.len())];
        let (width, height) = word_box(&word.text, size, rotate, settings, fonts);
        if width > region.width || height > region.height {
            continue;
        }

        let start_x = (region.width * (rng.random::<f32>() + 0.5) / 2.0).floor();
        let start_y = (region.height * (rng.random::<f32>() + 0.5) / 2.0).floor();
        let dt = if rng.random_bool(0.5) { 1 } else { -1 };
        let max_delta = (region.width * region.width + region.height * region.height).sqrt();

        let candidates = std::iter::once((0, 0))
            .chain(RectangularSpiral::new(region.width, region.height, dt))
            .take_while(|(dx, dy)| (dx.abs().min(dy.abs()) as f32) < max_delta);

        for (dx, dy) in candidates {
            let x = start_x + dx as f32;
            let y = start_y + dy as f32;
            let bounds = Rect {
                x: x - width / 2.0,
                y: y - height / 2.0,
                width,
                height,
            };
            if !region.contains(&bounds) {
                continue;
            }
            if placed.iter().any(|other| other.bounds.intersects(&bounds)) {
                continue;
            }
            placed.push(PlacedWord {
                text: word.text.clone(),
                size,
                rotate,
                x,
                y,
                bounds,
                style: (settings.font_style)(word, settings),
            });
            break;
        }
    }
    placed
}

/// Blank text, or a font size that is not a positive finite number, can
/// never be placed.
pub(crate) fn is_packable(word: &Word, settings: &WordCloudSettings) -> bool {
    if word.text.trim().is_empty() {
        return false;
    }
    let size = (settings.font_size)(word, settings);
    size.is_finite() && size > 0.0
}

/// Axis-aligned size of the padded word box after rotation.
fn word_box(
    text: &str,
    size: f32,
    rotate: f32,
    settings: &WordCloudSettings,
    fonts: &FontBook,
) -> (f32, f32) {
    let w = fonts.measure(text, size, &settings.font_family) + settings.padding * 2.0;
    let h = fonts.line_metrics(size, &settings.font_family).height() + settings.padding * 2.0;
    let (sin, cos) = rotate.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    (w * cos + h * sin, w * sin + h * cos)
}

/// Rectangular spiral in integer steps, wider steps along the longer side so
/// the search follows the region's aspect ratio.
struct RectangularSpiral {
    t: i32,
    dt: i32,
    x: f64,
    y: f64,
    step_x: f64,
    step_y: f64,
}

impl RectangularSpiral {
    fn new(width: f32, height: f32, dt: i32) -> Self {
        let step_y = 4.0;
        Self {
            t: 0,
            dt,
            x: 0.0,
            y: 0.0,
            step_x: step_y * width as f64 / height as f64,
            step_y,
        }
    }
}

impl Iterator for RectangularSpiral {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        self.t += self.dt;
        let sign = if self.t < 0 { -1.0 } else { 1.0 };
        let side = ((1.0 + 4.0 * sign * self.t as f64).sqrt() - sign) as i32 & 3;
        match side {
            0 => self.x += self.step_x,
            1 => self.y += self.step_y,
            2 => self.x -= self.step_x,
            _ => self.y -= self.step_y,
        }
        Some((self.x as i32, self.y as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn settings(width: f32, height: f32) -> WordCloudSettings {
        WordCloudSettings {
            cloud_width: width,
            cloud_height: height,
            ..WordCloudSettings::default()
        }
    }

    fn names(count: usize) -> Vec<Word> {
        (0..count)
            .map(|i| Word::new(format!("donor{i}"), 8.0 + (i % 7) as f32 * 4.0))
            .collect()
    }

    fn assert_packed_properly(words: &[Word], placed: &[PlacedWord], settings: &WordCloudSettings) {
        let region = Rect {
            x: 0.0,
            y: 0.0,
            width: settings.cloud_width,
            height: settings.cloud_height,
        };
        let inputs: HashSet<&str> = words.iter().map(|w| w.text.as_str()).collect();
        let mut seen = HashSet::new();
        for word in placed {
            assert!(inputs.contains(word.text.as_str()), "unknown word {}", word.text);
            assert!(seen.insert(word.text.as_str()), "{} placed twice", word.text);
            assert!(region.contains(&word.bounds), "{} out of bounds", word.text);
        }
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!(!a.bounds.intersects(&b.bounds), "{} overlaps {}", a.text, b.text);
            }
        }
    }

    #[test]
    fn packed_words_are_an_overlap_free_subset() {
        let fonts = FontBook::empty();
        let settings = settings(550.0, 180.0);
        let words = names(60);
        for seed in 0..5 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let placed = pack(&words, &settings, &fonts, &mut rng);
            assert!(!placed.is_empty());
            assert!(placed.len() <= words.len());
            assert_packed_properly(&words, &placed, &settings);
        }
    }

    #[test]
    fn rotations_come_from_the_discrete_set() {
        let fonts = FontBook::empty();
        let settings = settings(550.0, 180.0);
        let angles = settings.rotation_angles();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for word in pack(&names(30), &settings, &fonts, &mut rng) {
            assert!(angles.contains(&word.rotate), "unexpected angle {}", word.rotate);
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let fonts = FontBook::empty();
        let settings = settings(420.0, 215.0);
        let words = names(40);
        let first = pack(&words, &settings, &fonts, &mut ChaCha8Rng::seed_from_u64(42));
        let second = pack(&words, &settings, &fonts, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_words_are_dropped() {
        let fonts = FontBook::empty();
        let settings = settings(100.0, 50.0);
        let words = vec![Word::new("Enormous", 400.0), Word::new("ok", 10.0)];
        let placed = pack(&words, &settings, &fonts, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].text, "ok");
    }

    #[test]
    fn font_size_and_style_strategies_apply() {
        let fonts = FontBook::empty();
        let settings = WordCloudSettings {
            min_rotation: 0.0,
            max_rotation: 0.0,
            ..settings(400.0, 200.0)
        }
        .with_font_size(|word, _| word.size / 2.0)
        .with_font_style(|word, _| if word.text == "Alice" { "gold".into() } else { "grey".into() });
        let words = vec![Word::new("Alice", 40.0), Word::new("Bob", 20.0)];
        let placed = pack(&words, &settings, &fonts, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].text, "Alice");
        assert_eq!(placed[0].size, 20.0);
        assert_eq!(placed[0].style, "gold");
        assert_eq!(placed[1].size, 10.0);
        assert_eq!(placed[1].style, "grey");
        assert!(placed.iter().all(|w| w.rotate == 0.0));
    }

    #[test]
    fn invalid_sizes_and_blank_text_are_skipped() {
        let fonts = FontBook::empty();
        let words = vec![
            Word::new("   ", 20.0),
            Word::new("zero", 0.0),
            Word::new("nan", f32::NAN),
            Word::new("fine", 20.0),
        ];
        let placed = pack(&words, &settings(300.0, 100.0), &fonts, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].text, "fine");
    }

    #[test]
    fn rotated_box_swaps_dimensions() {
        let fonts = FontBook::empty();
        let settings = WordCloudSettings::default();
        let (w, h) = word_box("Alice", 20.0, 0.0, &settings, &fonts);
        let (rw, rh) = word_box("Alice", 20.0, 90.0, &settings, &fonts);
        assert!((w - rh).abs() < 1e-3);
        assert!((h - rw).abs() < 1e-3);
    }

    #[test]
    fn spiral_walks_outward_in_rings() {
        let steps: Vec<(i32, i32)> = RectangularSpiral::new(100.0, 100.0, 1).take(6).collect();
        assert_eq!(steps, vec![(0, 4), (-4, 4), (-8, 4), (-8, 0), (-8, -4), (-4, -4)]);
    }
}
