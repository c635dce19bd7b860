use std::path::Path;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use resvg::tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::config::{
    BannerConfig, BannerOverrides, ContentBoxConfig, ContentBoxOverrides, WordCloudBannerConfig,
    WordCloudBannerOverrides,
};
use crate::error::{BannerError, Result};
use crate::geometry::{Point, Rect};
use crate::layout::{
    BannerGeometry, Packing, PlacedWord, TitlePlacement, Word, compute_banner_geometry,
    compute_content_banner_geometry, logo_slot, pack_with_retry, place_title,
};
use crate::text_metrics::FontBook;
use crate::theme::{ColourLabel, Colours};

/// A pixel surface plus the fonts its text layers are drawn with. Layers
/// are painted in call order, each on top of the previous ones.
pub struct Surface {
    pixmap: Pixmap,
    fonts: Arc<FontBook>,
}

impl Surface {
    pub fn new(width: f32, height: f32, fonts: Arc<FontBook>) -> Result<Self> {
        let (w, h) = (width.round(), height.round());
        if !(w >= 1.0 && h >= 1.0) {
            return Err(BannerError::geometry(format!(
                "surface {width}x{height} has no pixels"
            )));
        }
        let pixmap = Pixmap::new(w as u32, h as u32)
            .ok_or_else(|| BannerError::geometry(format!("cannot allocate {w}x{h} surface")))?;
        Ok(Self { pixmap, fonts })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Draws SVG markup given in surface pixel coordinates.
    pub fn paint_svg(&mut self, body: &str) -> Result<()> {
        let (w, h) = (self.width(), self.height());
        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">{body}</svg>"
        );
        let options = usvg::Options {
            fontdb: self.fonts.database(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)?;
        resvg::render(&tree, Transform::default(), &mut self.pixmap.as_mut());
        Ok(())
    }

    /// Scales `image` into `slot`.
    pub fn paint_image(&mut self, image: &Image, slot: Rect) {
        let (iw, ih) = image.size();
        let transform = Transform::from_row(
            slot.width / iw,
            0.0,
            0.0,
            slot.height / ih,
            slot.x,
            slot.y,
        );
        match image {
            Image::Vector(tree) => resvg::render(tree, transform, &mut self.pixmap.as_mut()),
            Image::Raster(source) => self.pixmap.draw_pixmap(
                0,
                0,
                source.as_ref(),
                &PixmapPaint {
                    quality: FilterQuality::Bicubic,
                    ..PixmapPaint::default()
                },
                transform,
                None,
            ),
        }
    }

    /// Draws packed words; `offset` is where the cloud's top-left corner
    /// lands on this surface. Styles naming a palette slot (`text`, `boxBg`)
    /// take that slot's colour.
    pub fn paint_words(
        &mut self,
        words: &[PlacedWord],
        offset: Point,
        font_family: &str,
        colours: &Colours,
    ) -> Result<()> {
        if words.is_empty() {
            return Ok(());
        }
        let mut svg = String::new();
        for word in words {
            let shift = self
                .fonts
                .line_metrics(word.size, font_family)
                .middle_baseline_offset();
            svg.push_str(&format!(
                "<text x=\"0\" y=\"0\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\" transform=\"translate({:.2} {:.2}) rotate({:.2}) translate(0 {:.2})\">{}</text>",
                escape_xml(font_family),
                word.size,
                escape_xml(resolve_paint(colours, &word.style)),
                offset.x + word.x,
                offset.y + word.y,
                word.rotate,
                shift,
                escape_xml(&word.text)
            ));
        }
        self.paint_svg(&svg)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|err| BannerError::Encode(err.to_string()))
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// Decorative asset, loaded once per render.
pub enum Image {
    Vector(usvg::Tree),
    Raster(Pixmap),
}

impl Image {
    fn size(&self) -> (f32, f32) {
        match self {
            Image::Vector(tree) => (tree.size().width(), tree.size().height()),
            Image::Raster(pixmap) => (pixmap.width() as f32, pixmap.height() as f32),
        }
    }
}

/// Loads an SVG or PNG asset. Nothing is substituted when it fails.
pub fn load_image(path: &Path, fonts: &FontBook) -> Result<Image> {
    let resource = path.display().to_string();
    let data = std::fs::read(path).map_err(|err| BannerError::unavailable(&resource, err))?;
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("svg") || ext.eq_ignore_ascii_case("svgz"))
        .unwrap_or(false);
    if is_svg {
        let options = usvg::Options {
            fontdb: fonts.database(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_data(&data, &options)
            .map_err(|err| BannerError::unavailable(&resource, err))?;
        Ok(Image::Vector(tree))
    } else {
        let pixmap =
            Pixmap::decode_png(&data).map_err(|err| BannerError::unavailable(&resource, err))?;
        Ok(Image::Raster(pixmap))
    }
}

/// Background wedges, then the content box, then the foreground band.
pub fn shapes_svg(geometry: &BannerGeometry, colours: &Colours, background: Option<&str>) -> String {
    let mut svg = String::new();
    if let Some(fill) = background {
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(fill)
        ));
    }
    let mut fill_path = |d: String, fill: &str| {
        svg.push_str(&format!("<path d=\"{d}\" fill=\"{}\"/>", escape_xml(fill)));
    };
    for wedge in &geometry.background_wedges {
        fill_path(wedge.to_svg_path(), colours.get(ColourLabel::BannerBg));
    }
    if let Some(content) = &geometry.content_box {
        fill_path(content.to_svg_path(), colours.get(ColourLabel::BoxBg));
    }
    fill_path(
        geometry.foreground_quad.to_svg_path(),
        colours.get(ColourLabel::BannerFg),
    );
    svg
}

fn resolve_paint<'a>(colours: &'a Colours, style: &'a str) -> &'a str {
    ColourLabel::from_token(style)
        .map(|label| colours.get(label))
        .unwrap_or(style)
}

fn title_svg(text: &str, placement: &TitlePlacement, fill: &str, font_family: &str) -> String {
    format!(
        "<text x=\"0\" y=\"0\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\" transform=\"translate({:.2} {:.2}) scale({:.4} 1)\">{}</text>",
        escape_xml(font_family),
        placement.font_size,
        escape_xml(fill),
        placement.x,
        placement.baseline,
        placement.scale_x,
        escape_xml(text)
    )
}

/// Paints a complete banner (shapes, optional logo, title) onto `surface`.
pub fn paint_banner(
    surface: &mut Surface,
    geometry: &BannerGeometry,
    config: &BannerConfig,
    title: &str,
) -> Result<()> {
    let logo = match &config.logo {
        Some(path) => Some(load_image(path, surface.fonts())?),
        None => None,
    };
    let placement = place_title(
        title,
        surface.width() as f32,
        geometry,
        config,
        logo.is_some(),
        surface.fonts(),
    )?;

    surface.paint_svg(&shapes_svg(
        geometry,
        &config.colours,
        config.background.as_deref(),
    ))?;
    if let Some(image) = &logo {
        surface.paint_image(image, logo_slot(config));
    }
    surface.paint_svg(&title_svg(
        title,
        &placement,
        config.colours.get(ColourLabel::Text),
        &config.font_family,
    ))
}

/// Text laid over the banner shapes.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    pub title: &'a str,
    pub words: &'a [PlacedWord],
    /// Top-left corner of the cloud region on the surface.
    pub cloud_offset: Point,
    pub word_font_family: &'a str,
}

impl<'a> Overlay<'a> {
    pub fn title(title: &'a str) -> Self {
        Self {
            title,
            words: &[],
            cloud_offset: Point::default(),
            word_font_family: "",
        }
    }
}

/// Paints every layer in order and encodes the result as PNG.
pub fn render(
    mut surface: Surface,
    geometry: &BannerGeometry,
    config: &BannerConfig,
    overlay: &Overlay<'_>,
) -> Result<Vec<u8>> {
    paint_banner(&mut surface, geometry, config, overlay.title)?;
    surface.paint_words(
        overlay.words,
        overlay.cloud_offset,
        overlay.word_font_family,
        &config.colours,
    )?;
    surface.encode_png()
}

/// Result of a word-cloud banner render.
#[derive(Debug, Clone)]
pub struct CloudBanner {
    pub png: Vec<u8>,
    pub packing: Packing,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    fonts: Arc<FontBook>,
}

impl Renderer {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self { fonts }
    }

    pub fn system() -> Self {
        Self::new(FontBook::system())
    }

    fn fonts_for(&self, config: &BannerConfig) -> Result<Arc<FontBook>> {
        match &config.font_file {
            Some(path) => Ok(Arc::new(self.fonts.with_font_file(path)?)),
            None => Ok(Arc::clone(&self.fonts)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, config))]
    pub fn title_banner(&self, title: &str, config: &BannerConfig) -> Result<Vec<u8>> {
        let geometry = compute_banner_geometry(config)?;
        let surface = Surface::new(geometry.width, geometry.height, self.fonts_for(config)?)?;
        render(surface, &geometry, config, &Overlay::title(title))
    }

    /// Leaves the content box empty for the caller to fill.
    #[tracing::instrument(level = "debug", skip(self, config))]
    pub fn content_banner(&self, title: &str, config: &ContentBoxConfig) -> Result<Surface> {
        let geometry = compute_content_banner_geometry(config)?;
        let mut surface = Surface::new(
            geometry.width,
            geometry.height,
            self.fonts_for(&config.banner)?,
        )?;
        paint_banner(&mut surface, &geometry, &config.banner, title)?;
        Ok(surface)
    }

    pub fn word_cloud_banner(
        &self,
        words: &[Word],
        config: &WordCloudBannerConfig,
    ) -> Result<CloudBanner> {
        let mut rng = match config.cloud.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        self.word_cloud_banner_with_rng(words, config, &mut rng)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(words = words.len()))]
    pub fn word_cloud_banner_with_rng<R: Rng + ?Sized>(
        &self,
        words: &[Word],
        config: &WordCloudBannerConfig,
        rng: &mut R,
    ) -> Result<CloudBanner> {
        config.validate()?;
        let geometry = compute_content_banner_geometry(&config.content)?;
        let surface = Surface::new(
            geometry.width,
            geometry.height,
            self.fonts_for(&config.content.banner)?,
        )?;
        let packing = pack_with_retry(words, &config.cloud, &config.retry, surface.fonts(), rng);
        let overlay = Overlay {
            title: &config.title,
            words: &packing.words,
            cloud_offset: config.cloud.cloud_offset,
            word_font_family: &config.cloud.font_family,
        };
        let png = render(surface, &geometry, &config.content.banner, &overlay)?;
        Ok(CloudBanner { png, packing })
    }
}

pub fn render_title_banner(title: &str, overrides: &BannerOverrides) -> Result<Vec<u8>> {
    let config = BannerConfig::default().with_overrides(overrides);
    Renderer::system().title_banner(title, &config)
}

pub fn render_content_banner(title: &str, overrides: &ContentBoxOverrides) -> Result<Surface> {
    let config = ContentBoxConfig::default().with_overrides(overrides);
    Renderer::system().content_banner(title, &config)
}

pub fn render_word_cloud_banner(
    words: &[Word],
    overrides: &WordCloudBannerOverrides,
) -> Result<CloudBanner> {
    let config = WordCloudBannerConfig::default().with_overrides(overrides);
    Renderer::system().word_cloud_banner(words, &config)
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
