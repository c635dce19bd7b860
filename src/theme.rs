use serde::{Deserialize, Serialize};

/// Semantic colour slots used by every banner variant. Values are any SVG
/// paint string (`#145398`, `white`, `rgb(55, 55, 55)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Colours {
    pub banner_bg: String,
    pub banner_fg: String,
    pub box_bg: String,
    pub text: String,
}

impl Default for Colours {
    fn default() -> Self {
        Self {
            banner_bg: "#145398".to_string(),
            banner_fg: "#2c87e9".to_string(),
            box_bg: "#1a222b".to_string(),
            text: "#fff".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColourLabel {
    BannerBg,
    BannerFg,
    BoxBg,
    Text,
}

impl ColourLabel {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "bannerBg" => Some(Self::BannerBg),
            "bannerFg" => Some(Self::BannerFg),
            "boxBg" => Some(Self::BoxBg),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

impl Colours {
    pub fn get(&self, label: ColourLabel) -> &str {
        match label {
            ColourLabel::BannerBg => &self.banner_bg,
            ColourLabel::BannerFg => &self.banner_fg,
            ColourLabel::BoxBg => &self.box_bg,
            ColourLabel::Text => &self.text,
        }
    }
}

/// Grey level as an SVG paint string.
pub fn grey(brightness: u8) -> String {
    format!("rgb({brightness}, {brightness}, {brightness})")
}
