use rand::Rng;

use crate::config::{RetryOverrides, WordCloudSettings};
use crate::error::{BannerError, Result};
use crate::text_metrics::FontBook;

use super::wordcloud::{PlacedWord, Word, is_packable, pack};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Multiplier applied to every word's size before each retry.
    pub shrink_factor: f32,
    /// Floor for shrunk sizes.
    pub min_size: f32,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            shrink_factor: 0.9,
            min_size: 6.0,
            max_retries: 10,
        }
    }
}

impl RetryPolicy {
    pub fn with_overrides(&self, overrides: &RetryOverrides) -> Self {
        Self {
            shrink_factor: overrides.shrink_factor.unwrap_or(self.shrink_factor),
            min_size: overrides.min_size.unwrap_or(self.min_size),
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.shrink_factor > 0.0 && self.shrink_factor <= 1.0) {
            return Err(BannerError::geometry("shrinkFactor must be in (0, 1]"));
        }
        if !(self.min_size.is_finite() && self.min_size > 0.0) {
            return Err(BannerError::geometry("minSize must be positive"));
        }
        Ok(())
    }
}

/// Outcome of a shrink-retry run. A partial result is a normal outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Packing {
    pub words: Vec<PlacedWord>,
    /// Input words that could be placed at all.
    pub requested: usize,
    /// Input words left out up front (blank text, unusable size).
    pub skipped: usize,
    /// Packer invocations, including the first.
    pub attempts: u32,
    /// Input sizes used by the final attempt.
    pub final_sizes: Vec<f32>,
}

impl Packing {
    pub fn placed(&self) -> usize {
        self.words.len()
    }

    pub fn is_partial(&self) -> bool {
        self.words.len() < self.requested
    }
}

/// Packs, and while words are missing shrinks all of them and packs again,
/// at most `max_retries` times. The last attempt is returned even when an
/// earlier one placed more words.
pub fn pack_with_retry<R: Rng + ?Sized>(
    words: &[Word],
    settings: &WordCloudSettings,
    policy: &RetryPolicy,
    fonts: &FontBook,
    rng: &mut R,
) -> Packing {
    let mut current: Vec<Word> = words
        .iter()
        .filter(|word| is_packable(word, settings))
        .cloned()
        .collect();
    let requested = current.len();
    let skipped = words.len() - requested;
    if skipped > 0 {
        tracing::debug!(skipped, "ignoring words that can never be placed");
    }
    let mut placed = pack(&current, settings, fonts, rng);
    let mut attempts = 1;

    while placed.len() < requested && attempts <= policy.max_retries {
        for word in &mut current {
            word.size = (word.size * policy.shrink_factor).max(policy.min_size);
        }
        placed = pack(&current, settings, fonts, rng);
        attempts += 1;
        tracing::debug!(attempt = attempts, placed = placed.len(), requested, "repacked word cloud");
    }

    let max_size = placed.iter().map(|w| w.size).fold(0.0f32, f32::max);
    tracing::info!(
        requested,
        placed = placed.len(),
        max_size,
        attempts,
        "packed word cloud"
    );

    Packing {
        words: placed,
        requested,
        skipped,
        attempts,
        final_sizes: current.iter().map(|w| w.size).collect(),
    }
}
