// Terminal side of the tool: the interactive media picker, spinners while a
// platform is being worked on, and the human-readable summaries.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};

use crate::job::{Platform, PublishJob};
use crate::publisher::{PlatformOutcome, RunReport};
use crate::temphost::mib;

const PREVIEW_CHARS: usize = 80;

/// Stems that have both a `.mp4` and a `.txt` file in `media_dir`, sorted.
pub fn list_publishable(media_dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(media_dir)
        .with_context(|| format!("media directory not found: {}", media_dir.display()))?;

    let mut videos = BTreeSet::new();
    let mut texts = BTreeSet::new();
    for entry in entries {
        let path = entry?.path();
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        match ext {
            "mp4" => {
                videos.insert(stem.to_string());
            }
            "txt" => {
                texts.insert(stem.to_string());
            }
            _ => {}
        }
    }
    Ok(videos.intersection(&texts).cloned().collect())
}

/// Let the user choose one publishable pair. Returns (video, caption file).
pub fn pick_media(media_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let available = list_publishable(media_dir)?;
    if available.is_empty() {
        bail!(
            "no publishable media in {} (needs a .mp4 and a .txt with the same name)",
            media_dir.display()
        );
    }

    // `Select` shows a keyboard-navigable list in the terminal.
    let choice = Select::new()
        .with_prompt("Media to publish")
        .items(&available)
        .default(0)
        .interact()?;
    let stem = &available[choice];
    Ok((
        media_dir.join(format!("{stem}.mp4")),
        media_dir.join(format!("{stem}.txt")),
    ))
}

pub fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

pub fn caption_preview(caption: &str) -> String {
    if caption.chars().count() > PREVIEW_CHARS {
        let head: String = caption.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        caption.to_string()
    }
}

pub fn print_dry_run(job: &PublishJob, skipped: &[Platform]) {
    println!("\n[DRY RUN] Summary:");
    println!(
        "  Video     : {} ({:.1} MiB)",
        job.video().display(),
        mib(job.video_size())
    );
    println!("  Caption   : {}", caption_preview(job.caption()));
    println!("  Cover     : {}", job.cover());
    let targets: Vec<String> = job.platforms().iter().map(|p| p.to_string()).collect();
    if targets.is_empty() {
        println!("  Platforms : none");
    } else {
        println!("  Platforms : {}", targets.join(", "));
    }
    for platform in skipped {
        println!("  Skipped   : {platform} (missing credentials)");
    }
    println!("\nNothing was published.");
}

pub fn outcome_line(outcome: &PlatformOutcome) -> String {
    if outcome.success {
        format!(
            "✓ {}: published ({})",
            outcome.platform,
            outcome.post_id.as_deref().unwrap_or("no id")
        )
    } else {
        format!(
            "✗ {}: {}",
            outcome.platform,
            outcome.detail.as_deref().unwrap_or("failed")
        )
    }
}

pub fn print_report(report: &RunReport) {
    println!();
    for outcome in report.outcomes() {
        println!("{}", outcome_line(outcome));
    }
    if report.all_succeeded() {
        println!("All platforms published.");
    } else if report.any_succeeded() {
        println!("Published on some platforms only.");
    } else {
        println!("Nothing was published.");
    }
}
