// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};

use presspull::config::{DEFAULT_BASE_URL, DEFAULT_LIMIT, DEFAULT_QUALITY};
use presspull::{
    CwebpTranscoder, NativeTranscoder, NoopReporter, ProgressEvent, ProgressReporter,
    ReqwestClient, SharedProgressReporter, SharedTranscoder, SyncConfig, sync_content,
};

// Emoji with fallback for terminals without Unicode support
static NEWSPAPER: Emoji<'_, '_> = Emoji("📰 ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static PAGE: Emoji<'_, '_> = Emoji("📄 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[?] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static BROOM: Emoji<'_, '_> = Emoji("🧹 ", "[-] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TranscoderKind {
    /// Run the external `cwebp` tool (lossy, honours --quality)
    Cwebp,
    /// Encode in-process with the image crate (lossless)
    Native,
}

/// Mirror a WordPress content source into local JSON and WebP images
#[derive(Parser, Debug)]
#[command(name = "presspull")]
#[command(about = "Mirror a WordPress content source into local JSON and WebP images")]
#[command(version)]
struct Args {
    /// Base URL of the WordPress install
    #[arg(long, env = "WORDPRESS_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Maximum number of posts to request
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Dev-facing image cache directory
    #[arg(long, default_value = "public/images")]
    dev_root: PathBuf,

    /// Production-facing image cache directory
    #[arg(long, default_value = "dist/images")]
    prod_root: PathBuf,

    /// URL prefix cached images are served under
    #[arg(long, default_value = "/images")]
    public_prefix: String,

    /// Where to write the aggregate posts JSON
    #[arg(short, long, default_value = "src/data/posts.json")]
    output: PathBuf,

    /// WebP quality (0-100)
    #[arg(long, default_value_t = DEFAULT_QUALITY)]
    quality: u8,

    /// Network timeout per request, in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// How images are converted to WebP
    #[arg(long, value_enum, default_value_t = TranscoderKind::Cwebp)]
    transcoder: TranscoderKind,

    /// Path to the cwebp binary
    #[arg(long, default_value = "cwebp")]
    cwebp: PathBuf,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            base_url: self.base_url.clone(),
            limit: self.limit,
            dev_root: self.dev_root.clone(),
            prod_root: self.prod_root.clone(),
            public_prefix: self.public_prefix.clone(),
            output_path: self.output.clone(),
            quality: self.quality,
            timeout: Duration::from_secs(self.timeout),
            ..SyncConfig::default()
        }
    }

    fn transcoder(&self, config: &SyncConfig) -> SharedTranscoder {
        match self.transcoder {
            TranscoderKind::Cwebp => {
                Arc::new(CwebpTranscoder::with_program(&self.cwebp, config.quality))
            }
            TranscoderKind::Native => Arc::new(NativeTranscoder),
        }
    }
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = ProgressBar::new_spinner();
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(Duration::from_millis(100));

        Self { main_bar }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingContent { endpoint } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Querying {}", endpoint.cyan()));
            }

            ProgressEvent::ContentFetched { record_count } => {
                self.main_bar.println(format!(
                    "{PAGE}{} posts fetched",
                    record_count.to_string().cyan()
                ));
            }

            ProgressEvent::ContentUnavailable { error } => {
                self.main_bar.abandon_with_message(format!(
                    "{FAILURE}{} {}",
                    "Content source unavailable:".red().bold(),
                    error.red()
                ));
            }

            ProgressEvent::PartialFilesCleanedUp { count } => {
                self.main_bar.println(format!(
                    "{BROOM}Removed {} interrupted download(s)",
                    count.to_string().yellow()
                ));
            }

            ProgressEvent::RecordStarting {
                slug,
                record_index,
                total_records,
            } => {
                self.main_bar.set_message(format!(
                    "[{}/{}] {}",
                    (record_index + 1).to_string().cyan(),
                    total_records.to_string().cyan(),
                    truncate_title(&slug, 50)
                ));
            }

            ProgressEvent::RecordCompleted { .. } => {}

            ProgressEvent::RecordFailed { slug, error } => {
                self.main_bar.println(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&slug, 40).red(),
                    error.red()
                ));
            }

            ProgressEvent::AssetDownloading { url, .. } => {
                self.main_bar
                    .set_message(format!("{DOWNLOAD}{}", truncate_title(&url, 60)));
            }

            ProgressEvent::AssetCached { local_path, .. } => {
                self.main_bar
                    .println(format!("  {DOWNLOAD}{}", local_path.green()));
            }

            ProgressEvent::AssetReused { .. } | ProgressEvent::AssetPassedThrough { .. } => {}

            ProgressEvent::AssetFetchFailed { url, error } => {
                self.main_bar.println(format!(
                    "  {FAILURE}{} - {}",
                    truncate_title(&url, 50).red(),
                    error.dimmed()
                ));
            }

            ProgressEvent::TranscodeFailed { url, error } => {
                self.main_bar.println(format!(
                    "  {WARNING}{} served unconverted - {}",
                    truncate_title(&url, 50).yellow(),
                    error.dimmed()
                ));
            }

            ProgressEvent::ColorExtractionFailed { path, error } => {
                self.main_bar.println(format!(
                    "  {WARNING}no color for {} - {}",
                    path.display().to_string().yellow(),
                    error.dimmed()
                ));
            }

            ProgressEvent::MetadataBackfilled { filename } => {
                self.main_bar
                    .println(format!("  {PAGE}metadata for {}", filename.cyan()));
            }

            ProgressEvent::OutputWritten { path, record_count } => {
                self.main_bar.println(format!(
                    "{FOLDER}Wrote {} posts to {}",
                    record_count.to_string().green(),
                    path.display().to_string().cyan()
                ));
            }

            ProgressEvent::SyncCompleted {
                processed_count,
                skipped_count,
                failed_count,
                degraded_count,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} processed, {} skipped, {} failed, {} unconverted",
                    "Sync complete:".bold().green(),
                    processed_count.to_string().green().bold(),
                    skipped_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    },
                    degraded_count.to_string().yellow()
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            NEWSPAPER,
            "presspull".bold().magenta(),
            "- WordPress Content Mirror".dimmed()
        );
    }

    let config = args.sync_config();
    let client =
        ReqwestClient::with_timeout(config.timeout).context("Failed to build HTTP client")?;

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    let run = sync_content(&client, args.transcoder(&config), &config, reporter)
        .await
        .context("Failed to sync content")?;

    if !args.quiet && !run.failed_records.is_empty() {
        println!("\n{}", "Failed posts:".red().bold());
        for (slug, error) in &run.failed_records {
            println!("  {}{} - {}", CROSS, slug.yellow(), error.dimmed());
        }
    }

    Ok(())
}
