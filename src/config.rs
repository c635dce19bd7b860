use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BannerError, Result};
use crate::geometry::{Point, Rect};
use crate::layout::{RetryPolicy, Word};
use crate::theme::Colours;

pub const DEFAULT_FONT_FAMILY: &str = "Staatliches, Impact, sans-serif";

#[derive(Debug, Clone, PartialEq)]
pub struct BannerConfig {
    pub width: f32,
    pub margin: f32,
    pub point_offset: Point,
    pub banner_offset: Point,
    pub banner_height: f32,
    pub banner_slant: f32,
    pub colours: Colours,
    pub font_family: String,
    /// Font file that must load for the render to proceed.
    pub font_file: Option<PathBuf>,
    /// SVG or PNG drawn left of the title.
    pub logo: Option<PathBuf>,
    /// Canvas fill behind the banner; transparent when unset.
    pub background: Option<String>,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            width: 480.0,
            margin: 0.0,
            point_offset: Point::new(80.0, 10.0),
            banner_offset: Point::new(0.0, 0.0),
            banner_height: 30.0,
            banner_slant: 10.0,
            colours: Colours::default(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_file: None,
            logo: None,
            background: None,
        }
    }
}

impl BannerConfig {
    pub fn with_overrides(&self, overrides: &BannerOverrides) -> Self {
        let mut config = self.clone();
        if let Some(v) = overrides.width {
            config.width = v;
        }
        if let Some(v) = overrides.margin {
            config.margin = v;
        }
        if let Some(v) = &overrides.point_offset {
            config.point_offset = v.apply(config.point_offset);
        }
        if let Some(v) = &overrides.banner_offset {
            config.banner_offset = v.apply(config.banner_offset);
        }
        if let Some(v) = overrides.banner_height {
            config.banner_height = v;
        }
        if let Some(v) = overrides.banner_slant {
            config.banner_slant = v;
        }
        if let Some(v) = &overrides.colours {
            config.colours = v.apply(&config.colours);
        }
        if let Some(v) = &overrides.font_family {
            config.font_family = v.clone();
        }
        if let Some(v) = &overrides.font_file {
            config.font_file = Some(v.clone());
        }
        if let Some(v) = &overrides.logo {
            config.logo = Some(v.clone());
        }
        if let Some(v) = &overrides.background {
            config.background = Some(v.clone());
        }
        config
    }

    pub fn canvas_height(&self) -> f32 {
        self.banner_height + (self.point_offset.y + self.margin) * 2.0
    }

    pub fn validate(&self) -> Result<()> {
        let numbers = [
            ("width", self.width),
            ("margin", self.margin),
            ("pointOffset.x", self.point_offset.x),
            ("pointOffset.y", self.point_offset.y),
            ("bannerOffset.x", self.banner_offset.x),
            ("bannerOffset.y", self.banner_offset.y),
            ("bannerHeight", self.banner_height),
            ("bannerSlant", self.banner_slant),
        ];
        for (name, value) in numbers {
            if !value.is_finite() {
                return Err(BannerError::geometry(format!("{name} must be finite")));
            }
        }
        if self.width <= 0.0 {
            return Err(BannerError::geometry("width must be positive"));
        }
        if self.banner_height <= 0.0 {
            return Err(BannerError::geometry("bannerHeight must be positive"));
        }
        if self.margin < 0.0 {
            return Err(BannerError::geometry("margin must not be negative"));
        }
        if self.width - 2.0 * self.margin <= self.banner_slant.abs() {
            return Err(BannerError::geometry(
                "width leaves no room for the banner between margins",
            ));
        }
        if self.canvas_height() < 1.0 {
            return Err(BannerError::geometry("banner canvas height is empty"));
        }
        Ok(())
    }
}

/// Banner with a trapezoid content panel underneath the ribbon.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBoxConfig {
    pub banner: BannerConfig,
    pub content_height: f32,
    pub content_inset: f32,
    pub content_slant: f32,
}

impl Default for ContentBoxConfig {
    fn default() -> Self {
        Self {
            banner: BannerConfig::default(),
            content_height: 60.0,
            content_inset: 40.0,
            content_slant: 20.0,
        }
    }
}

impl ContentBoxConfig {
    pub fn with_overrides(&self, overrides: &ContentBoxOverrides) -> Self {
        let mut config = self.clone();
        config.banner = self.banner.with_overrides(&overrides.banner);
        if let Some(v) = overrides.content_height {
            config.content_height = v;
        }
        if let Some(v) = overrides.content_inset {
            config.content_inset = v;
        }
        if let Some(v) = overrides.content_slant {
            config.content_slant = v;
        }
        config
    }

    pub fn canvas_height(&self) -> f32 {
        self.banner.canvas_height() + self.content_height + self.content_slant
    }

    pub fn validate(&self) -> Result<()> {
        self.banner.validate()?;
        for (name, value) in [
            ("contentHeight", self.content_height),
            ("contentInset", self.content_inset),
            ("contentSlant", self.content_slant),
        ] {
            if !value.is_finite() {
                return Err(BannerError::geometry(format!("{name} must be finite")));
            }
        }
        if self.content_height <= 0.0 {
            return Err(BannerError::geometry("contentHeight must be positive"));
        }
        if self.content_inset < 0.0 {
            return Err(BannerError::geometry("contentInset must not be negative"));
        }
        Ok(())
    }
}

/// Strategy evaluated once per word; must be pure.
pub type WordFn<T> = Arc<dyn Fn(&Word, &WordCloudSettings) -> T + Send + Sync>;

#[derive(Clone)]
pub struct WordCloudSettings {
    pub cloud_width: f32,
    pub cloud_height: f32,
    /// Translation of the cloud region inside the target surface.
    pub cloud_offset: Point,
    pub min_rotation: f32,
    pub max_rotation: f32,
    pub rotation_steps: u32,
    /// Gap kept around every word, in px.
    pub padding: f32,
    pub font_family: String,
    pub seed: Option<u64>,
    pub font_size: WordFn<f32>,
    pub font_style: WordFn<String>,
}

impl Default for WordCloudSettings {
    fn default() -> Self {
        Self {
            cloud_width: 550.0,
            cloud_height: 180.0,
            cloud_offset: Point::new(0.0, 0.0),
            min_rotation: -45.0,
            max_rotation: 45.0,
            rotation_steps: 5,
            padding: 1.0,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            seed: None,
            font_size: Arc::new(|word, _| word.size),
            font_style: Arc::new(|_, _| "text".to_string()),
        }
    }
}

impl fmt::Debug for WordCloudSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordCloudSettings")
            .field("cloud_width", &self.cloud_width)
            .field("cloud_height", &self.cloud_height)
            .field("cloud_offset", &self.cloud_offset)
            .field("min_rotation", &self.min_rotation)
            .field("max_rotation", &self.max_rotation)
            .field("rotation_steps", &self.rotation_steps)
            .field("padding", &self.padding)
            .field("font_family", &self.font_family)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl WordCloudSettings {
    pub fn with_overrides(&self, overrides: &WordCloudOverrides) -> Self {
        let mut settings = self.clone();
        if let Some(v) = overrides.cloud_width {
            settings.cloud_width = v;
        }
        if let Some(v) = overrides.cloud_height {
            settings.cloud_height = v;
        }
        if let Some(v) = &overrides.cloud_offset {
            settings.cloud_offset = v.apply(settings.cloud_offset);
        }
        if let Some(v) = overrides.min_rotation {
            settings.min_rotation = v;
        }
        if let Some(v) = overrides.max_rotation {
            settings.max_rotation = v;
        }
        if let Some(v) = overrides.rotation_steps {
            settings.rotation_steps = v;
        }
        if let Some(v) = overrides.padding {
            settings.padding = v;
        }
        if let Some(v) = overrides.seed {
            settings.seed = Some(v);
        }
        settings
    }

    pub fn with_font_size(
        mut self,
        f: impl Fn(&Word, &WordCloudSettings) -> f32 + Send + Sync + 'static,
    ) -> Self {
        self.font_size = Arc::new(f);
        self
    }

    pub fn with_font_style(
        mut self,
        f: impl Fn(&Word, &WordCloudSettings) -> String + Send + Sync + 'static,
    ) -> Self {
        self.font_style = Arc::new(f);
        self
    }

    /// The discrete set of angles a word may take, `min..=max` in
    /// `rotation_steps` even steps.
    pub fn rotation_angles(&self) -> Vec<f32> {
        if self.rotation_steps <= 1 {
            return vec![self.min_rotation];
        }
        let step = (self.max_rotation - self.min_rotation) / (self.rotation_steps - 1) as f32;
        (0..self.rotation_steps)
            .map(|i| self.min_rotation + i as f32 * step)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cloudWidth", self.cloud_width),
            ("cloudHeight", self.cloud_height),
            ("cloudOffset.x", self.cloud_offset.x),
            ("cloudOffset.y", self.cloud_offset.y),
            ("minRotation", self.min_rotation),
            ("maxRotation", self.max_rotation),
            ("padding", self.padding),
        ] {
            if !value.is_finite() {
                return Err(BannerError::geometry(format!("{name} must be finite")));
            }
        }
        if self.cloud_width <= 0.0 || self.cloud_height <= 0.0 {
            return Err(BannerError::geometry("cloud bounds must be positive"));
        }
        if self.rotation_steps == 0 {
            return Err(BannerError::geometry("rotationSteps must be at least 1"));
        }
        if self.padding < 0.0 {
            return Err(BannerError::geometry("padding must not be negative"));
        }
        Ok(())
    }
}

/// Everything the supporters-style word cloud banner needs.
#[derive(Debug, Clone)]
pub struct WordCloudBannerConfig {
    pub title: String,
    pub content: ContentBoxConfig,
    pub cloud: WordCloudSettings,
    pub retry: RetryPolicy,
}

impl Default for WordCloudBannerConfig {
    fn default() -> Self {
        Self {
            title: "Supporters".to_string(),
            content: ContentBoxConfig {
                content_height: 200.0,
                content_inset: 40.0,
                ..ContentBoxConfig::default()
            },
            cloud: WordCloudSettings {
                cloud_offset: Point::new(25.0, 45.0),
                cloud_width: 420.0,
                cloud_height: 215.0,
                ..WordCloudSettings::default()
            },
            retry: RetryPolicy::default(),
        }
    }
}

impl WordCloudBannerConfig {
    pub fn with_overrides(&self, overrides: &WordCloudBannerOverrides) -> Self {
        let mut config = self.clone();
        if let Some(v) = &overrides.title {
            config.title = v.clone();
        }
        config.content = self.content.with_overrides(&overrides.content);
        config.cloud = self.cloud.with_overrides(&overrides.cloud);
        config.cloud.font_family = config.content.banner.font_family.clone();
        config.retry = self.retry.with_overrides(&overrides.retry);
        config
    }

    /// The cloud region must lie on the canvas; words are never clipped.
    pub fn validate(&self) -> Result<()> {
        self.content.validate()?;
        self.cloud.validate()?;
        self.retry.validate()?;

        let canvas = Rect {
            x: 0.0,
            y: 0.0,
            width: self.content.banner.width,
            height: self.content.canvas_height(),
        };
        let region = self.cloud_region();
        if !canvas.contains(&region) {
            return Err(BannerError::geometry(format!(
                "cloud region {:.0}x{:.0} at ({:.0}, {:.0}) leaves the {:.0}x{:.0} canvas",
                region.width, region.height, region.x, region.y, canvas.width, canvas.height
            )));
        }
        Ok(())
    }

    /// Cloud region in surface coordinates.
    pub fn cloud_region(&self) -> Rect {
        Rect {
            x: self.cloud.cloud_offset.x,
            y: self.cloud.cloud_offset.y,
            width: self.cloud.cloud_width,
            height: self.cloud.cloud_height,
        }
    }
}

// Partial records deserialized from JSON; `None` keeps the default.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PointOverrides {
    pub x: Option<f32>,
    pub y: Option<f32>,
}

impl PointOverrides {
    fn apply(&self, base: Point) -> Point {
        Point {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ColourOverrides {
    pub banner_bg: Option<String>,
    pub banner_fg: Option<String>,
    pub box_bg: Option<String>,
    pub text: Option<String>,
}

impl ColourOverrides {
    fn apply(&self, base: &Colours) -> Colours {
        Colours {
            banner_bg: self.banner_bg.clone().unwrap_or_else(|| base.banner_bg.clone()),
            banner_fg: self.banner_fg.clone().unwrap_or_else(|| base.banner_fg.clone()),
            box_bg: self.box_bg.clone().unwrap_or_else(|| base.box_bg.clone()),
            text: self.text.clone().unwrap_or_else(|| base.text.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerOverrides {
    pub width: Option<f32>,
    pub margin: Option<f32>,
    pub point_offset: Option<PointOverrides>,
    pub banner_offset: Option<PointOverrides>,
    pub banner_height: Option<f32>,
    pub banner_slant: Option<f32>,
    pub colours: Option<ColourOverrides>,
    pub font_family: Option<String>,
    pub font_file: Option<PathBuf>,
    pub logo: Option<PathBuf>,
    pub background: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBoxOverrides {
    #[serde(flatten)]
    pub banner: BannerOverrides,
    pub content_height: Option<f32>,
    pub content_inset: Option<f32>,
    pub content_slant: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCloudOverrides {
    pub cloud_width: Option<f32>,
    pub cloud_height: Option<f32>,
    pub cloud_offset: Option<PointOverrides>,
    pub min_rotation: Option<f32>,
    pub max_rotation: Option<f32>,
    pub rotation_steps: Option<u32>,
    pub padding: Option<f32>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOverrides {
    pub shrink_factor: Option<f32>,
    pub min_size: Option<f32>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCloudBannerOverrides {
    pub title: Option<String>,
    #[serde(flatten)]
    pub content: ContentBoxOverrides,
    #[serde(flatten)]
    pub cloud: WordCloudOverrides,
    #[serde(flatten)]
    pub retry: RetryOverrides,
}

pub fn load_overrides<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };
    let contents = std::fs::read_to_string(path)
        .map_err(|err| BannerError::Config(format!("{}: {err}", path.display())))?;
    let raw: Value = serde_json::from_str(&contents)?;
    for key in unknown_keys::<T>(&raw) {
        tracing::warn!(file = %path.display(), key, "ignoring unknown config key");
    }
    Ok(serde_json::from_value(raw)?)
}

/// Top-level keys of `raw` that `T` does not read.
///
/// Flattened records cannot deny unknown fields, so they are compared against
/// the keys `T` serializes instead.
pub fn unknown_keys<T: Serialize + Default>(raw: &Value) -> Vec<String> {
    let (Value::Object(raw), Ok(Value::Object(known))) = (raw, serde_json::to_value(T::default()))
    else {
        return Vec::new();
    };
    raw.keys()
        .filter(|key| !known.contains_key(key.as_str()))
        .cloned()
        .collect()
}
