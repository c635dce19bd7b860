mod banner;
mod retry;
mod text;
mod wordcloud;

pub use banner::{
    BannerAnchors, BannerGeometry, ContentBoxAnchors, banner_anchors, compute_banner_geometry,
    compute_content_banner_geometry, content_box_anchors,
};
pub use retry::{Packing, RetryPolicy, pack_with_retry};
pub use text::{LOGO_ASPECT, TITLE_FONT_SCALE, TitlePlacement, logo_slot, place_title};
pub use wordcloud::{PlacedWord, Word, pack};
