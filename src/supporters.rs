//! Donor policy for the supporters word cloud: who makes it into the cloud,
//! how large their name is drawn and how bright.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::config::{WordCloudBannerConfig, WordCloudBannerOverrides, WordCloudSettings};
use crate::error::{BannerError, Result};
use crate::layout::Word;
use crate::render::{CloudBanner, Renderer};
use crate::theme::grey;

pub const DEFAULT_WINDOW: Duration = Duration::days(90);
pub const DEFAULT_LIMIT: usize = 500;
/// Floor for a supporter's word size before shrinking.
pub const MIN_WORD_SIZE: f32 = 6.0;
const OLDEST_BRIGHTNESS: f64 = 55.0;
const NEWEST_BRIGHTNESS: f64 = 255.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub from: String,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Payload posted by the donation platform's webhook. `amount` arrives as a
/// decimal string.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookDonation {
    pub message_id: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub from_name: String,
    #[serde(default)]
    pub message: Option<String>,
    pub amount: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DonationRecord {
    Stored(Donation),
    Webhook(WebhookDonation),
}

impl Donation {
    pub fn from_webhook(payload: &WebhookDonation) -> Result<Self> {
        if payload.from_name.trim().is_empty() {
            return Err(BannerError::Input(format!(
                "donation {}: donor name is empty",
                payload.message_id
            )));
        }
        let amount: f64 = payload.amount.trim().parse().map_err(|_| {
            BannerError::Input(format!(
                "donation {}: amount {:?} is not a number",
                payload.message_id, payload.amount
            ))
        })?;
        if !amount.is_finite() {
            return Err(BannerError::Input(format!(
                "donation {}: amount must be finite",
                payload.message_id
            )));
        }
        let timestamp = OffsetDateTime::parse(
            &payload.timestamp,
            &time::format_description::well_known::Rfc3339,
        )
        .map_err(|err| {
            BannerError::Input(format!("donation {}: timestamp: {err}", payload.message_id))
        })?;
        Ok(Self {
            from: payload.from_name.clone(),
            amount,
            timestamp,
        })
    }

    /// Parses a JSON array whose entries are either stored donations or raw
    /// webhook payloads.
    pub fn parse_list(json: &str) -> Result<Vec<Self>> {
        let records: Vec<DonationRecord> =
            serde_json::from_str(json).map_err(|err| BannerError::Input(err.to_string()))?;
        records
            .into_iter()
            .map(|record| match record {
                DonationRecord::Stored(donation) => Ok(donation),
                DonationRecord::Webhook(payload) => Self::from_webhook(&payload),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Supporter {
    pub name: String,
    pub amount: f64,
    pub last_donation: OffsetDateTime,
}

/// Groups donations inside `window` by donor, largest total first, at most
/// `limit` supporters.
pub fn aggregate(
    donations: &[Donation],
    now: OffsetDateTime,
    window: Duration,
    limit: usize,
) -> Vec<Supporter> {
    let oldest = now - window;
    let mut by_name: HashMap<&str, Supporter> = HashMap::new();
    for donation in donations.iter().filter(|d| d.timestamp >= oldest) {
        by_name
            .entry(donation.from.as_str())
            .and_modify(|s| {
                s.amount += donation.amount;
                s.last_donation = s.last_donation.max(donation.timestamp);
            })
            .or_insert_with(|| Supporter {
                name: donation.from.clone(),
                amount: donation.amount,
                last_donation: donation.timestamp,
            });
    }

    let mut supporters: Vec<Supporter> = by_name.into_values().collect();
    supporters.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.name.cmp(&b.name))
    });
    supporters.truncate(limit);
    supporters
}

/// One word per supporter, sized by the cube root of their share.
pub fn cloud_words(supporters: &[Supporter]) -> Vec<Word> {
    let total: f64 = supporters.iter().map(|s| s.amount).sum();
    supporters
        .iter()
        .map(|s| {
            let share = if total > 0.0 { s.amount / total } else { 0.0 };
            let size = ((share.cbrt() * 100.0) as f32).max(MIN_WORD_SIZE);
            Word::new(s.name.clone(), size)
        })
        .collect()
}

fn brightness(last_donation: OffsetDateTime, now: OffsetDateTime, window: Duration) -> u8 {
    let span = window.as_seconds_f64();
    if span <= 0.0 {
        return NEWEST_BRIGHTNESS as u8;
    }
    let age = (now - last_donation).as_seconds_f64();
    let t = (1.0 - age / span).clamp(0.0, 1.0);
    (OLDEST_BRIGHTNESS + t * (NEWEST_BRIGHTNESS - OLDEST_BRIGHTNESS)).round() as u8
}

/// Font-style strategy: recent supporters are drawn white, older ones fade
/// towards dark grey.
pub fn recency_style(
    supporters: &[Supporter],
    now: OffsetDateTime,
    window: Duration,
) -> impl Fn(&Word, &WordCloudSettings) -> String + Send + Sync + 'static {
    let levels: Arc<HashMap<String, u8>> = Arc::new(
        supporters
            .iter()
            .map(|s| (s.name.clone(), brightness(s.last_donation, now, window)))
            .collect(),
    );
    move |word: &Word, _: &WordCloudSettings| {
        let level = levels.get(&word.text).copied();
        grey(level.unwrap_or(NEWEST_BRIGHTNESS as u8))
    }
}

/// The "Supporters" banner layout: a tall content box with a flat cloud.
pub fn supporters_banner_config(
    supporters: &[Supporter],
    now: OffsetDateTime,
    window: Duration,
) -> WordCloudBannerConfig {
    let defaults = WordCloudBannerConfig::default();
    let cloud = WordCloudSettings {
        min_rotation: 0.0,
        max_rotation: 0.0,
        rotation_steps: 7,
        ..defaults.cloud.clone()
    }
    .with_font_style(recency_style(supporters, now, window));
    WordCloudBannerConfig {
        title: "Supporters".to_string(),
        cloud,
        ..defaults
    }
}

pub fn render_supporters_banner(
    renderer: &Renderer,
    supporters: &[Supporter],
    now: OffsetDateTime,
    overrides: &WordCloudBannerOverrides,
) -> Result<CloudBanner> {
    let config = supporters_banner_config(supporters, now, DEFAULT_WINDOW).with_overrides(overrides);
    tracing::debug!(supporters = supporters.len(), "rendering supporters banner");
    renderer.word_cloud_banner(&cloud_words(supporters), &config)
}
