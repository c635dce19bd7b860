use crate::config::BannerConfig;
use crate::error::{BannerError, Result};
use crate::geometry::Rect;
use crate::text_metrics::FontBook;

use super::BannerGeometry;

/// Title font size relative to the ribbon height.
pub const TITLE_FONT_SCALE: f32 = 1.2;
/// Width to height ratio of the logo slot.
pub const LOGO_ASPECT: f32 = 1.618;
/// Logo slot overhang above and below the ribbon, in total.
const LOGO_OVERHANG: f32 = 20.0;
/// Optical correction: caps-only display faces sit high on a middle baseline.
const TITLE_NUDGE_Y: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitlePlacement {
    /// Horizontal centre of the text.
    pub x: f32,
    /// Vertical centre of the text.
    pub y: f32,
    /// Alphabetic baseline that centres the line box on `y`.
    pub baseline: f32,
    pub max_width: f32,
    pub font_size: f32,
    /// Natural width at `font_size`.
    pub text_width: f32,
    /// Horizontal compression applied so the text never exceeds `max_width`.
    pub scale_x: f32,
}

impl TitlePlacement {
    pub fn fitted_width(&self) -> f32 {
        self.text_width * self.scale_x
    }
}

/// Where the logo goes when the banner carries one; it hangs slightly over
/// the ribbon on the left.
pub fn logo_slot(config: &BannerConfig) -> Rect {
    let height = config.banner_height + LOGO_OVERHANG;
    Rect {
        x: config.banner_slant + config.banner_offset.x - 5.0,
        y: config.point_offset.y + config.banner_offset.y - 10.0,
        width: height * LOGO_ASPECT,
        height,
    }
}

pub fn place_title(
    text: &str,
    surface_width: f32,
    geometry: &BannerGeometry,
    config: &BannerConfig,
    with_logo: bool,
    fonts: &FontBook,
) -> Result<TitlePlacement> {
    let logo_width = if with_logo {
        logo_slot(config).width
    } else {
        0.0
    };
    let max_width = surface_width - (config.margin + config.banner_slant) * 2.0 - logo_width;
    if max_width <= 0.0 {
        return Err(BannerError::geometry(format!(
            "no horizontal room for the title ({max_width:.1}px)"
        )));
    }

    let font_size = config.banner_height * TITLE_FONT_SCALE;
    let text_width = fonts.measure(text, font_size, &config.font_family);
    let scale_x = if text_width > max_width {
        max_width / text_width
    } else {
        1.0
    };

    let y = geometry.band_center_y() + TITLE_NUDGE_Y;
    let metrics = fonts.line_metrics(font_size, &config.font_family);

    Ok(TitlePlacement {
        x: surface_width / 2.0 + config.banner_offset.x + logo_width / 2.0,
        y,
        baseline: y + metrics.middle_baseline_offset(),
        max_width,
        font_size,
        text_width,
        scale_x,
    })
}
