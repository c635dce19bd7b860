#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod render;
pub mod supporters;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{
    BannerConfig, BannerOverrides, ContentBoxConfig, ContentBoxOverrides, WordCloudBannerConfig,
    WordCloudBannerOverrides, WordCloudSettings, load_overrides,
};
pub use error::{BannerError, Result};
pub use geometry::{Contour, Point, Rect, build_path};
pub use layout::{Packing, PlacedWord, RetryPolicy, Word, pack, pack_with_retry};
pub use render::{
    CloudBanner, Overlay, Renderer, Surface, render, render_content_banner, render_title_banner,
    render_word_cloud_banner,
};
pub use text_metrics::FontBook;
pub use theme::Colours;
