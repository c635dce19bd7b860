use crate::config::{BannerConfig, ContentBoxConfig};
use crate::error::Result;
use crate::geometry::{Contour, Point, build_path};

/// Named corners of the ribbon. The left point sits above the band, the
/// right point below it, which gives the ribbon its folded look.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BannerAnchors {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
    pub point_left: Point,
    pub point_right: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentBoxAnchors {
    pub top_left: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
    pub top_right: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BannerGeometry {
    pub width: f32,
    pub height: f32,
    pub anchors: BannerAnchors,
    /// Left then right wedge.
    pub background_wedges: [Contour; 2],
    pub foreground_quad: Contour,
    pub content_box: Option<Contour>,
}

impl BannerGeometry {
    /// Vertical middle of the foreground band.
    pub fn band_center_y(&self) -> f32 {
        (self.anchors.top_left.y + self.anchors.bottom_left.y) / 2.0
    }
}

pub fn banner_anchors(config: &BannerConfig) -> BannerAnchors {
    let BannerConfig {
        width,
        margin,
        point_offset,
        banner_offset: offset,
        banner_height: height,
        banner_slant: slant,
        ..
    } = *config;
    let top = margin + offset.y + point_offset.y;
    let bottom = margin + height + offset.y + point_offset.y;

    BannerAnchors {
        top_left: Point::new(margin + offset.x, top),
        top_right: Point::new(width + offset.x - margin - slant, top),
        bottom_left: Point::new(margin + offset.x + slant, bottom),
        bottom_right: Point::new(width + offset.x - margin, bottom),
        point_left: Point::new(margin + offset.x + point_offset.x, margin + offset.y),
        point_right: Point::new(
            width + offset.x - margin - point_offset.x,
            margin + 2.0 * point_offset.y + offset.y + height,
        ),
    }
}

pub fn content_box_anchors(config: &ContentBoxConfig) -> ContentBoxAnchors {
    let banner = &config.banner;
    let height = config.canvas_height();
    let top = banner.margin + banner.point_offset.y + banner.banner_height;

    ContentBoxAnchors {
        top_left: Point::new(banner.margin + banner.banner_slant + config.content_inset, top),
        // The bottom edge tilts: left corner lifts by the ribbon slant.
        bottom_left: Point::new(
            banner.margin + config.content_slant + config.content_inset,
            height - banner.banner_slant,
        ),
        bottom_right: Point::new(
            banner.width - banner.margin - config.content_slant - config.content_inset,
            height - banner.margin,
        ),
        top_right: Point::new(banner.width - banner.margin - config.content_inset, top),
    }
}

pub fn compute_banner_geometry(config: &BannerConfig) -> Result<BannerGeometry> {
    config.validate()?;
    ribbon_geometry(config, config.canvas_height(), None)
}

pub fn compute_content_banner_geometry(config: &ContentBoxConfig) -> Result<BannerGeometry> {
    config.validate()?;
    let b = content_box_anchors(config);
    let content_box = build_path(&[b.top_left, b.bottom_left, b.bottom_right, b.top_right])?;
    ribbon_geometry(&config.banner, config.canvas_height(), Some(content_box))
}

fn ribbon_geometry(
    config: &BannerConfig,
    height: f32,
    content_box: Option<Contour>,
) -> Result<BannerGeometry> {
    let a = banner_anchors(config);
    let left_wedge = build_path(&[a.top_left, a.point_left, a.bottom_left])?;
    let right_wedge = build_path(&[a.bottom_right, a.point_right, a.top_right])?;
    let foreground_quad = build_path(&[a.top_left, a.top_right, a.bottom_right, a.bottom_left])?;

    Ok(BannerGeometry {
        width: config.width,
        height,
        anchors: a,
        background_wedges: [left_wedge, right_wedge],
        foreground_quad,
        content_box,
    })
}
