use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use std::time::{Duration, Instant};

use crate::cli::{Commands, GenerateArgs, PreviewArgs, RenderArgs, ScriptArgs, TrendingArgs};
use crate::config::{AppConfig, asset_cache_dir};
use crate::generate::{AudioGenerator, ImageGenerator, ScriptGenerator, trending};
use crate::manifest::VideoManifest;
use crate::media::playback::SimulatedTransport;
use crate::media::{PlaybackController, PlaybackStatus, TransportEvent};
use crate::render::{ArtifactResult, RenderSession, Renderer};
use crate::ui::prelude::{Level, emit};

const PREVIEW_TICK: Duration = Duration::from_millis(200);

pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Trending(args) => handle_trending(args).await,
        Commands::Script(args) => handle_script(args).await,
        Commands::Generate(args) => handle_generate(args).await,
        Commands::Preview(args) => handle_preview(args).await,
        Commands::Render(args) => handle_render(args).await,
    }
}

async fn handle_trending(args: TrendingArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let client = Client::new();

    let topics = trending::fetch_trending(&client, &config, &args.category)
        .await
        .with_context(|| format!("fetching trending topics for '{}'", args.category))?;

    if topics.is_empty() {
        emit(
            Level::Warn,
            "trending.empty",
            "No trending topics found; try again in a moment",
            None,
        );
        return Ok(());
    }

    for (idx, topic) in topics.iter().enumerate() {
        emit(
            Level::Info,
            "trending.topic",
            &format!(
                "{}. {} (score {:.0}, {})\n   {}",
                idx + 1,
                topic.title,
                topic.viral_score,
                topic.estimated_popularity,
                topic.description
            ),
            Some(json!({"title": topic.title, "viralScore": topic.viral_score})),
        );
    }
    Ok(())
}

async fn handle_script(args: ScriptArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let client = Client::new();
    let mut generator = ScriptGenerator::new();

    let script = generator
        .generate(
            &client,
            &config,
            &args.topic,
            &args.category,
            args.description.as_deref(),
        )
        .await
        .with_context(|| format!("generating script for '{}'", args.topic))?;

    emit(Level::Success, "script.hook", &format!("Hook: {}", script.hook), None);
    emit(
        Level::Info,
        "script.main",
        &format!("Main content: {}", script.main_content),
        None,
    );
    emit(
        Level::Info,
        "script.cta",
        &format!("Call to action: {}", script.call_to_action),
        None,
    );
    for (idx, visual) in script.suggested_visuals.iter().enumerate() {
        emit(
            Level::Info,
            "script.visual",
            &format!("Visual {}: {}", idx + 1, visual),
            None,
        );
    }
    Ok(())
}

async fn handle_generate(args: GenerateArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let client = Client::new();

    let mut scripts = ScriptGenerator::new();
    let script = scripts
        .generate(
            &client,
            &config,
            &args.topic,
            &args.category,
            args.description.as_deref(),
        )
        .await
        .with_context(|| format!("generating script for '{}'", args.topic))?;

    if script.suggested_visuals.is_empty() {
        anyhow::bail!("script came back without visual suggestions; retry the generation");
    }

    let unique_id = slugify(&args.topic);
    let mut images = ImageGenerator::new();
    let mut image_urls = Vec::with_capacity(script.suggested_visuals.len());
    for (idx, visual) in script.suggested_visuals.iter().enumerate() {
        emit(
            Level::Info,
            "generate.image",
            &format!(
                "Generating image {}/{}...",
                idx + 1,
                script.suggested_visuals.len()
            ),
            None,
        );
        let url = images
            .generate(&client, &config, visual, Some(&unique_id))
            .await
            .with_context(|| format!("generating image for visual {}", idx + 1))?;
        image_urls.push(url);
    }

    emit(Level::Info, "generate.audio", "Generating narration...", None);
    let mut audio = AudioGenerator::new();
    let audio_path = audio
        .generate(
            &client,
            &config,
            &script.narration_text(),
            args.voice.as_deref(),
            Some(&unique_id),
        )
        .await
        .context("generating narration audio")?;

    let manifest = VideoManifest {
        topic: args.topic.clone(),
        category: args.category.clone(),
        script,
        images: image_urls,
        audio: Some(audio_path),
        // Narration metadata loads later; preview recomputes the timeline
        // once a duration is known.
        audio_duration: None,
    };

    let out_path = match args.out_file {
        Some(path) => path,
        None => asset_cache_dir()?.join(format!("{unique_id}.json")),
    };
    manifest.save(&out_path)?;

    emit(
        Level::Success,
        "generate.done",
        &format!("Manifest written to {}", out_path.display()),
        Some(json!({"path": out_path.display().to_string()})),
    );
    Ok(())
}

async fn handle_preview(args: PreviewArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let manifest = VideoManifest::load(&args.manifest)?;
    let media_set = manifest.media_set()?;

    let duration = args.duration.or(manifest.audio_duration);
    let mut player = PlaybackController::new(
        media_set.image_count(),
        duration,
        config.min_slide_seconds,
        SimulatedTransport,
    )?;

    emit(
        Level::Info,
        "preview.start",
        &format!(
            "Previewing {} slides over {:.1}s",
            player.timeline().slide_count(),
            player.timeline().total_duration()
        ),
        None,
    );

    if let Some(slide) = args.slide {
        player.jump_to_slide(slide).await.ok();
    }

    if player.play().await.is_err() {
        // Recoverable; the player is left paused with the reason attached.
        if let Some(notice) = player.notice() {
            emit(Level::Warn, "preview.play", notice, None);
        }
        return Ok(());
    }

    let base_position = player.position();
    let started = Instant::now();
    let mut ticker = tokio::time::interval(PREVIEW_TICK);
    let mut shown: Option<usize> = None;

    while player.status() == PlaybackStatus::Playing {
        ticker.tick().await;
        let position = base_position + started.elapsed().as_secs_f64();
        player.handle_event(TransportEvent::Position { seconds: position });

        let snapshot = player.snapshot();
        if let Some(active) = snapshot.active_slide
            && shown != Some(active)
        {
            shown = Some(active);
            let interval = player.timeline().intervals()[active];
            emit(
                Level::Info,
                "preview.slide",
                &format!(
                    "Slide {}/{} [{:.1}s - {:.1}s] {}",
                    active + 1,
                    media_set.image_count(),
                    interval.start,
                    interval.end,
                    media_set.images()[active].as_str()
                ),
                None,
            );
        }
    }

    emit(Level::Success, "preview.done", "Preview finished", None);
    Ok(())
}

async fn handle_render(args: RenderArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let manifest = VideoManifest::load(&args.manifest)?;
    let media_set = manifest.media_set()?;

    let timeline = crate::media::compute_timeline(
        media_set.image_count(),
        manifest.audio_duration,
        config.min_slide_seconds,
    )?;

    let client = Client::new();
    let mut renderer = Renderer::new(config.render.clone());
    let mut session = RenderSession::new();

    let ticket = session.begin();
    let result = renderer
        .request_artifact(&client, &media_set, timeline.total_duration())
        .await?;
    session.complete(ticket, result);

    match session.outcome() {
        Some(ArtifactResult::Ready { url }) => {
            emit(
                Level::Success,
                "render.ready",
                &format!("Video ready for download: {url}"),
                Some(json!({"url": url})),
            );
        }
        Some(ArtifactResult::Unavailable { guidance }) => {
            emit(Level::Warn, "render.unavailable", &guidance.title, None);
            for step in &guidance.steps {
                emit(Level::Info, "render.guidance", step, None);
            }
        }
        Some(ArtifactResult::Failed { reason }) => {
            // Retryable by the user, never retried automatically. Failing
            // the process lets scripts tell this apart from success.
            anyhow::bail!("render failed: {reason}; run the command again to retry");
        }
        None => {}
    }
    Ok(())
}

fn slugify(topic: &str) -> String {
    let mut slug = String::with_capacity(topic.len());
    for ch in topic.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        }
    }
    slug.trim_matches('-').to_string()
}
