use crate::config::{
    BannerConfig, BannerOverrides, ContentBoxConfig, ContentBoxOverrides, WordCloudBannerConfig,
    WordCloudBannerOverrides, load_overrides,
};
use crate::layout::Word;
use crate::render::Renderer;
use crate::supporters::{
    DEFAULT_LIMIT, DEFAULT_WINDOW, Donation, aggregate, render_supporters_banner,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Parser, Debug)]
#[command(name = "ribbon", version, about = "Slanted ribbon banners and word-cloud images")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output PNG file. Written to stdout if omitted or '-'.
    #[arg(short = 'o', long = "output", global = true)]
    pub output: Option<PathBuf>,

    /// Config JSON file with layout overrides (camelCase keys)
    #[arg(short = 'c', long = "configFile", global = true)]
    pub config: Option<PathBuf>,

    /// Seed for word placement
    #[arg(long = "seed", global = true)]
    pub seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plain title ribbon
    Title { title: String },
    /// Ribbon over an empty content box
    Content { title: String },
    /// Word cloud from a JSON array of {"text", "size"} ('-' for stdin)
    Cloud { words: PathBuf },
    /// Supporters cloud from a JSON array of donations ('-' for stdin)
    Supporters {
        donations: PathBuf,
        /// Reference time (RFC 3339) for the donation window; defaults to now
        #[arg(long = "now")]
        now: Option<String>,
    },
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let png = render(&args)?;
    write_output(&png, args.output.as_deref())
}

fn render(args: &Args) -> Result<Vec<u8>> {
    let renderer = Renderer::system();
    let config = args.config.as_deref();
    match &args.command {
        Command::Title { title } => {
            let overrides: BannerOverrides = load_overrides(config)?;
            let config = BannerConfig::default().with_overrides(&overrides);
            Ok(renderer.title_banner(title, &config)?)
        }
        Command::Content { title } => {
            let overrides: ContentBoxOverrides = load_overrides(config)?;
            let config = ContentBoxConfig::default().with_overrides(&overrides);
            Ok(renderer.content_banner(title, &config)?.encode_png()?)
        }
        Command::Cloud { words } => {
            let overrides = cloud_overrides(config, args.seed)?;
            let words: Vec<Word> = serde_json::from_str(&read_input(words)?)
                .with_context(|| format!("parsing words from {}", words.display()))?;
            let config = WordCloudBannerConfig::default().with_overrides(&overrides);
            let banner = renderer.word_cloud_banner(&words, &config)?;
            report_partial(banner.packing.placed(), banner.packing.requested);
            Ok(banner.png)
        }
        Command::Supporters { donations, now } => {
            let overrides = cloud_overrides(config, args.seed)?;
            let now = match now {
                Some(raw) => OffsetDateTime::parse(raw, &Rfc3339)
                    .with_context(|| format!("invalid --now {raw:?}"))?,
                None => OffsetDateTime::now_utc(),
            };
            let donations = Donation::parse_list(&read_input(donations)?)?;
            let supporters = aggregate(&donations, now, DEFAULT_WINDOW, DEFAULT_LIMIT);
            let banner = render_supporters_banner(&renderer, &supporters, now, &overrides)?;
            report_partial(banner.packing.placed(), banner.packing.requested);
            Ok(banner.png)
        }
    }
}

fn cloud_overrides(path: Option<&Path>, seed: Option<u64>) -> Result<WordCloudBannerOverrides> {
    let mut overrides: WordCloudBannerOverrides = load_overrides(path)?;
    if seed.is_some() {
        overrides.cloud.seed = seed;
    }
    Ok(overrides)
}

fn report_partial(placed: usize, requested: usize) {
    if placed < requested {
        tracing::warn!(placed, requested, "not every word fit into the cloud");
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_output(png: &[u8], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) if path != Path::new("-") => {
            std::fs::write(path, png).with_context(|| format!("writing {}", path.display()))
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(png)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_follow_the_subcommand() {
        let args = Args::try_parse_from([
            "ribbon", "cloud", "words.json", "-o", "out.png", "--seed", "7",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Cloud { .. }));
        assert_eq!(args.output.as_deref(), Some(Path::new("out.png")));
        assert_eq!(args.seed, Some(7));
    }

    #[test]
    fn config_file_uses_the_camel_case_flag() {
        let args =
            Args::try_parse_from(["ribbon", "--configFile", "banner.json", "title", "Hello"])
                .unwrap();
        assert_eq!(args.config.as_deref(), Some(Path::new("banner.json")));
        match args.command {
            Command::Title { title } => assert_eq!(title, "Hello"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn seed_flag_overrides_the_config_file() {
        let overrides = cloud_overrides(None, Some(99)).unwrap();
        assert_eq!(overrides.cloud.seed, Some(99));
        let unseeded = cloud_overrides(None, None).unwrap();
        assert_eq!(unseeded.cloud.seed, None);
    }
}
