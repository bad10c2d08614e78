// Glue between the command line and the publishing core.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Result};
use indicatif::ProgressBar;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::archive::archive_files;
use crate::auth;
use crate::cli::{Cli, Command, PublishArgs};
use crate::config::{Credentials, Settings};
use crate::error::PublishError;
use crate::instagram::InstagramPublisher;
use crate::job::{is_url, CoverSpec, Platform, PublishJob};
use crate::poll::Sleeper;
use crate::publisher::{publish_all, PublishEvent, Publisher, RunReport};
use crate::temphost::TempHost;
use crate::tiktok::TikTokPublisher;
use crate::ui;

pub fn run(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref())?;

    if let Some(Command::TiktokAuth) = cli.command {
        auth::run(&settings)?;
        return Ok(ExitCode::SUCCESS);
    }

    let code = run_with(&cli.publish, &settings, &Credentials::from_env(), std::thread::sleep)?;
    Ok(ExitCode::from(code))
}

/// The publish command with settings and credentials already resolved.
/// Returns the process exit code.
pub fn run_with(args: &PublishArgs, settings: &Settings, creds: &Credentials, sleep: Sleeper) -> Result<u8> {
    let (video, text) = resolve_sources(args, settings)?;

    let selection = select_platforms(&args.platforms, &settings.defaults.platforms, creds);
    for platform in &selection.skipped {
        println!(
            "Skipping {platform}: {} not set",
            Credentials::required_vars(*platform)
        );
    }

    let job = prepare_job(args, settings, &video, &text, selection.targets.iter().copied())?;
    println!("Caption : {}", ui::caption_preview(job.caption()));
    println!("Cover   : {}", job.cover());

    if args.dry_run {
        ui::print_dry_run(&job, &selection.skipped);
        return Ok(0);
    }

    if job.platforms().is_empty() {
        eprintln!(
            "Error: no platform to publish to (set {} or {})",
            Credentials::required_vars(Platform::Instagram),
            Credentials::required_vars(Platform::TikTok)
        );
        return Ok(1);
    }

    let report = run_publish(settings, creds, &job, &[video.as_path(), text.as_path()], sleep)?;
    Ok(report.exit_code())
}

/// Video and caption file, from the flags or the interactive picker, with
/// relative paths resolved against `media_dir`.
pub fn resolve_sources(args: &PublishArgs, settings: &Settings) -> Result<(PathBuf, PathBuf)> {
    let media_dir = settings.defaults.media_dir.as_deref();
    match (&args.video, &args.text) {
        (Some(video), Some(text)) => Ok((resolve_path(video, media_dir), resolve_path(text, media_dir))),
        (None, None) => match media_dir {
            Some(dir) => ui::pick_media(dir),
            None => bail!("--video and --text are required (or set defaults.media_dir in the config)"),
        },
        _ => bail!("--video and --text must be given together"),
    }
}

/// Absolute paths are kept; relative ones are looked up in `media_dir`
/// first and used as given otherwise.
pub fn resolve_path(path: &Path, media_dir: Option<&Path>) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    if let Some(dir) = media_dir {
        let candidate = dir.join(path);
        if candidate.exists() {
            return candidate;
        }
    }
    path.to_path_buf()
}

/// Platforms to attempt, and the ones that were asked for but lack
/// credentials.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub targets: Vec<Platform>,
    pub skipped: Vec<Platform>,
}

pub fn select_platforms(requested: &[Platform], defaults: &[Platform], creds: &Credentials) -> Selection {
    let explicit = if requested.is_empty() { defaults } else { requested };

    let mut selection = Selection::default();
    if explicit.is_empty() {
        selection.targets = Platform::ALL.into_iter().filter(|p| creds.has(*p)).collect();
        return selection;
    }

    let wanted: BTreeSet<Platform> = explicit.iter().copied().collect();
    for platform in wanted {
        if creds.has(platform) {
            selection.targets.push(platform);
        } else {
            selection.skipped.push(platform);
        }
    }
    selection
}

/// Read the caption, work out the cover and validate everything locally.
pub fn prepare_job(
    args: &PublishArgs,
    settings: &Settings,
    video: &Path,
    text: &Path,
    platforms: impl IntoIterator<Item = Platform>,
) -> std::result::Result<PublishJob, PublishError> {
    let caption = std::fs::read_to_string(text)
        .map_err(|_| PublishError::input(format!("caption file not found: {}", text.display())))?;

    let media_dir = settings.defaults.media_dir.as_deref();
    let thumbnail = args.thumbnail.as_deref().map(|t| {
        if is_url(t) {
            t.to_string()
        } else {
            resolve_path(Path::new(t), media_dir).to_string_lossy().into_owned()
        }
    });
    // The configured default only applies when no cover flag was given.
    let thumbnail_at = match (&thumbnail, &args.thumbnail_at) {
        (None, None) => settings.defaults.thumbnail_at.clone(),
        (_, explicit) => explicit.clone(),
    };

    let cover = CoverSpec::from_options(thumbnail.as_deref(), thumbnail_at.as_deref())?;
    PublishJob::new(video, caption.trim(), cover, platforms)
}

pub fn build_publishers(
    settings: &Settings,
    creds: &Credentials,
    sleep: Sleeper,
) -> Result<Vec<Box<dyn Publisher>>> {
    let api = ApiClient::new()?;
    let policy = settings.polling.policy();
    let mut publishers: Vec<Box<dyn Publisher>> = Vec::new();

    if let Some(ig) = &creds.instagram {
        let temp_host = TempHost::new(api.clone(), &settings.endpoints.temp_host);
        publishers.push(Box::new(
            InstagramPublisher::new(api.clone(), temp_host, ig.clone())
                .with_base_url(&settings.endpoints.instagram_api)
                .with_poll_policy(policy, sleep),
        ));
    }
    if let Some(tt) = &creds.tiktok {
        publishers.push(Box::new(
            TikTokPublisher::new(api.clone(), tt.clone())
                .with_base_url(&settings.endpoints.tiktok_api)
                .with_privacy_level(&settings.tiktok.privacy_level)
                .with_poll_policy(policy, sleep),
        ));
    }
    Ok(publishers)
}

/// Publish on every platform of the job, print the results and archive the
/// source files when at least one platform succeeded.
pub fn run_publish(
    settings: &Settings,
    creds: &Credentials,
    job: &PublishJob,
    sources: &[&Path],
    sleep: Sleeper,
) -> Result<RunReport> {
    let publishers = build_publishers(settings, creds, sleep)?;

    let mut spinner: Option<ProgressBar> = None;
    let report = publish_all(job, &publishers, |event| match event {
        PublishEvent::Started(platform) => {
            spinner = Some(ui::spinner(format!("Publishing to {platform}...")));
        }
        PublishEvent::Finished(outcome) => {
            if let Some(s) = spinner.take() {
                s.finish_with_message(ui::outcome_line(outcome));
            }
        }
    });
    ui::print_report(&report);

    if report.any_succeeded() {
        if let Some(dir) = &settings.defaults.published_dir {
            match archive_files(dir, sources) {
                Ok(moved) => info!(count = moved.len(), dir = %dir.display(), "source files archived"),
                Err(err) => {
                    error!(error = %err, "archiving failed");
                    eprintln!("Warning: could not move files to {}: {err}", dir.display());
                }
            }
        }
    } else {
        warn!("nothing published, source files left in place");
    }

    Ok(report)
}
