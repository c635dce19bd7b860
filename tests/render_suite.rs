use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use resvg::tiny_skia::Pixmap;
use ribbon_banner::config::{PointOverrides, WordCloudOverrides};
use ribbon_banner::layout::{compute_banner_geometry, place_title};
use ribbon_banner::{
    BannerConfig, BannerError, BannerOverrides, ContentBoxOverrides, FontBook, Rect, Renderer,
    Word, WordCloudBannerConfig, WordCloudBannerOverrides, render_content_banner,
    render_title_banner, render_word_cloud_banner,
};

fn decode(png: &[u8]) -> Pixmap {
    Pixmap::decode_png(png).expect("output is a valid PNG")
}

fn offline() -> Renderer {
    Renderer::new(Arc::new(FontBook::empty()))
}

fn tuffy() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("Tuffy.ttf")
}

fn is_glyph(pixmap: &Pixmap, x: u32, y: u32) -> bool {
    pixmap
        .pixel(x, y)
        .is_some_and(|px| px.red() > 200 && px.green() > 200 && px.blue() > 200)
}

fn glyph_pixels(pixmap: &Pixmap, area: Rect) -> usize {
    let x0 = area.x.max(0.0).floor() as u32;
    let y0 = area.y.max(0.0).floor() as u32;
    let x1 = (area.right().ceil() as u32).min(pixmap.width());
    let y1 = (area.bottom().ceil() as u32).min(pixmap.height());
    (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (x, y)))
        .filter(|&(x, y)| is_glyph(pixmap, x, y))
        .count()
}

#[test]
fn title_banner_has_default_dimensions() {
    let png = render_title_banner("Update 1.2", &BannerOverrides::default()).unwrap();
    assert!(!png.is_empty());
    let pixmap = decode(&png);
    assert_eq!((pixmap.width(), pixmap.height()), (480, 50));
}

#[test]
fn decoded_size_matches_requested_size() {
    for (width, banner_height) in [(480.0, 30.0), (640.0, 40.0), (321.4, 25.0)] {
        let overrides = BannerOverrides {
            width: Some(width),
            banner_height: Some(banner_height),
            ..Default::default()
        };
        let config = BannerConfig::default().with_overrides(&overrides);
        let pixmap = decode(&offline().title_banner("Round trip", &config).unwrap());
        assert_eq!(pixmap.width(), width.round() as u32);
        assert_eq!(pixmap.height(), config.canvas_height().round() as u32);
    }
}

#[test]
fn content_banner_returns_an_open_surface() {
    let overrides = ContentBoxOverrides {
        content_height: Some(90.0),
        ..Default::default()
    };
    let mut surface = render_content_banner("Schedule", &overrides).unwrap();
    assert_eq!((surface.width(), surface.height()), (480, 160));

    surface
        .paint_svg(r##"<rect x="100" y="80" width="20" height="20" fill="#ff0000"/>"##)
        .unwrap();
    let pixmap = decode(&surface.encode_png().unwrap());
    let px = pixmap.pixel(110, 90).unwrap();
    assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (255, 0, 0, 255));
}

#[test]
fn word_cloud_places_at_most_the_input_inside_the_region() {
    let words = vec![Word::new("Alice", 100.0), Word::new("Bob", 10.0)];
    let overrides = WordCloudBannerOverrides {
        cloud: WordCloudOverrides {
            cloud_width: Some(420.0),
            cloud_height: Some(215.0),
            seed: Some(1),
            ..Default::default()
        },
        ..Default::default()
    };
    let banner = render_word_cloud_banner(&words, &overrides).unwrap();
    assert!(banner.packing.placed() <= 2);
    assert_eq!(banner.packing.requested, 2);
    assert!(banner.packing.attempts <= 11);

    let region = Rect {
        x: 0.0,
        y: 0.0,
        width: 420.0,
        height: 215.0,
    };
    for word in &banner.packing.words {
        assert!(region.contains(&word.bounds), "{} escapes the cloud", word.text);
    }
    let pixmap = decode(&banner.png);
    assert_eq!((pixmap.width(), pixmap.height()), (480, 270));
}

#[test]
fn seeded_clouds_are_reproducible() {
    let words: Vec<Word> = (0..25)
        .map(|i| Word::new(format!("supporter{i}"), 10.0 + i as f32))
        .collect();
    let config = WordCloudBannerConfig::default().with_overrides(&WordCloudBannerOverrides {
        cloud: WordCloudOverrides {
            cloud_offset: Some(PointOverrides {
                x: Some(25.0),
                y: Some(45.0),
            }),
            cloud_width: Some(420.0),
            cloud_height: Some(215.0),
            ..Default::default()
        },
        ..Default::default()
    });
    let renderer = offline();
    let a = renderer
        .word_cloud_banner_with_rng(&words, &config, &mut ChaCha8Rng::seed_from_u64(8))
        .unwrap();
    let b = renderer
        .word_cloud_banner_with_rng(&words, &config, &mut ChaCha8Rng::seed_from_u64(8))
        .unwrap();
    assert_eq!(a.packing, b.packing);
    assert_eq!(a.png, b.png);

    let unique: HashSet<&str> = a.packing.words.iter().map(|w| w.text.as_str()).collect();
    assert_eq!(unique.len(), a.packing.placed());
}

#[test]
fn impossible_cloud_is_partial_not_an_error() {
    let words = vec![Word::new("Unfathomably", 400.0), Word::new("ok", 12.0)];
    let config = WordCloudBannerConfig::default().with_overrides(&WordCloudBannerOverrides {
        cloud: WordCloudOverrides {
            cloud_width: Some(120.0),
            cloud_height: Some(40.0),
            ..Default::default()
        },
        ..Default::default()
    });
    let banner = offline()
        .word_cloud_banner_with_rng(&words, &config, &mut ChaCha8Rng::seed_from_u64(0))
        .unwrap();
    assert!(banner.packing.is_partial());
    assert_eq!(banner.packing.attempts, config.retry.max_retries + 1);
}

#[test]
fn missing_font_file_is_resource_unavailable() {
    let overrides = BannerOverrides {
        font_file: Some("/nonexistent/Staatliches-Regular.ttf".into()),
        ..Default::default()
    };
    let err = render_title_banner("Live", &overrides).unwrap_err();
    assert!(matches!(err, BannerError::ResourceUnavailable { .. }), "{err}");
}

#[test]
fn missing_logo_is_resource_unavailable() {
    let overrides = BannerOverrides {
        logo: Some("/nonexistent/logo.png".into()),
        ..Default::default()
    };
    let err = render_title_banner("Live", &overrides).unwrap_err();
    assert!(matches!(err, BannerError::ResourceUnavailable { .. }), "{err}");
}

#[test]
fn degenerate_config_is_invalid_geometry() {
    for overrides in [
        BannerOverrides {
            width: Some(0.0),
            ..Default::default()
        },
        BannerOverrides {
            banner_height: Some(-1.0),
            ..Default::default()
        },
        BannerOverrides {
            margin: Some(f32::NAN),
            ..Default::default()
        },
    ] {
        let err = render_title_banner("x", &overrides).unwrap_err();
        assert!(matches!(err, BannerError::InvalidGeometry(_)), "{err}");
    }
}

#[test]
fn overrides_deserialize_from_camel_case_json() {
    let overrides: WordCloudBannerOverrides = serde_json::from_str(
        r##"{"title": "Thanks", "contentHeight": 150, "cloudWidth": 300, "shrinkFactor": 0.8,
            "pointOffset": {"y": 12}, "colours": {"boxBg": "#000"}}"##,
    )
    .unwrap();
    let config = WordCloudBannerConfig::default().with_overrides(&overrides);
    assert_eq!(config.title, "Thanks");
    assert_eq!(config.content.content_height, 150.0);
    assert_eq!(config.cloud.cloud_width, 300.0);
    assert_eq!(config.retry.shrink_factor, 0.8);
    assert_eq!(config.content.banner.point_offset.x, 80.0);
    assert_eq!(config.content.banner.point_offset.y, 12.0);
    assert_eq!(config.content.banner.colours.box_bg, "#000");
    assert_eq!(config.content.banner.colours.banner_bg, "#145398");
}

#[test]
fn default_cloud_never_leaves_the_surface() {
    let words: Vec<Word> = (0..80).map(|i| Word::new(format!("donor{i}"), 14.0)).collect();
    let config = WordCloudBannerConfig::default();
    let banner = offline()
        .word_cloud_banner_with_rng(&words, &config, &mut ChaCha8Rng::seed_from_u64(1))
        .unwrap();
    let pixmap = decode(&banner.png);
    let surface = Rect {
        x: 0.0,
        y: 0.0,
        width: pixmap.width() as f32,
        height: pixmap.height() as f32,
    };
    let band_bottom = 40.0;
    let offset = config.cloud.cloud_offset;
    assert!(banner.packing.placed() > 0);
    for word in &banner.packing.words {
        let on_surface = Rect {
            x: offset.x + word.bounds.x,
            y: offset.y + word.bounds.y,
            ..word.bounds
        };
        assert!(surface.contains(&on_surface), "{} at {on_surface:?}", word.text);
        assert!(on_surface.y >= band_bottom, "{} covers the ribbon", word.text);
    }
}

#[test]
fn cloud_region_off_canvas_is_invalid_geometry() {
    let overrides = WordCloudBannerOverrides {
        cloud: WordCloudOverrides {
            cloud_offset: Some(PointOverrides {
                x: Some(0.0),
                y: Some(0.0),
            }),
            cloud_width: Some(550.0),
            cloud_height: Some(180.0),
            ..Default::default()
        },
        ..Default::default()
    };
    let err = render_word_cloud_banner(&[Word::new("Alice", 20.0)], &overrides).unwrap_err();
    assert!(matches!(err, BannerError::InvalidGeometry(_)), "{err}");
}

#[test]
fn word_glyphs_land_inside_their_boxes() {
    let overrides = WordCloudBannerOverrides {
        title: Some("THANKS".to_string()),
        content: ContentBoxOverrides {
            banner: BannerOverrides {
                font_file: Some(tuffy()),
                font_family: Some("Tuffy".to_string()),
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };
    let config = WordCloudBannerConfig::default().with_overrides(&overrides);
    let words = vec![
        Word::new("Alice", 40.0),
        Word::new("Bob", 32.0),
        Word::new("Carol", 26.0),
        Word::new("Dave", 20.0),
    ];
    let banner = offline()
        .word_cloud_banner_with_rng(&words, &config, &mut ChaCha8Rng::seed_from_u64(21))
        .unwrap();
    assert_eq!(banner.packing.placed(), 4);
    let pixmap = decode(&banner.png);
    let offset = config.cloud.cloud_offset;

    let boxes: Vec<Rect> = banner
        .packing
        .words
        .iter()
        .map(|word| Rect {
            x: offset.x + word.bounds.x,
            y: offset.y + word.bounds.y,
            ..word.bounds
        })
        .collect();
    for (word, area) in banner.packing.words.iter().zip(&boxes) {
        assert!(glyph_pixels(&pixmap, *area) > 20, "{} has no visible glyphs", word.text);
    }

    // Nothing bright in the cloud outside the word boxes.
    let slack = 3.0;
    let region = config.cloud_region();
    for y in region.y as u32..region.bottom() as u32 {
        for x in region.x as u32..region.right() as u32 {
            if !is_glyph(&pixmap, x, y) {
                continue;
            }
            let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);
            let covered = boxes.iter().any(|b| {
                fx >= b.x - slack
                    && fx <= b.right() + slack
                    && fy >= b.y - slack
                    && fy <= b.bottom() + slack
            });
            assert!(covered, "stray glyph pixel at ({x}, {y})");
        }
    }
}

#[test]
fn long_titles_are_squeezed_between_the_slants() {
    let title = "Thank you to every single supporter of this stream";
    let config = BannerConfig::default().with_overrides(&BannerOverrides {
        font_file: Some(tuffy()),
        font_family: Some("Tuffy".to_string()),
        ..Default::default()
    });

    let fonts = FontBook::empty().with_font_file(&tuffy()).unwrap();
    let geometry = compute_banner_geometry(&config).unwrap();
    let placement = place_title(title, config.width, &geometry, &config, false, &fonts).unwrap();
    assert!(placement.scale_x < 1.0, "title should need compression");

    let pixmap = decode(&offline().title_banner(title, &config).unwrap());
    let band = Rect {
        x: 0.0,
        y: 10.0,
        width: 480.0,
        height: 30.0,
    };
    assert!(glyph_pixels(&pixmap, band) > 200);

    let left = Rect {
        x: 0.0,
        width: 7.0,
        ..band
    };
    let right = Rect {
        x: 473.0,
        width: 7.0,
        ..band
    };
    assert_eq!(glyph_pixels(&pixmap, left), 0);
    assert_eq!(glyph_pixels(&pixmap, right), 0);
}
