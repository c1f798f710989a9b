use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use storyboard_rs::core::{tasks_for, GenerationMode, Storyboard};
use storyboard_rs::providers::google::provider::{GoogleClientFactory, API_KEY_ENV};
use storyboard_rs::{AspectRatio, CredentialStore, DataUri, GridSize, QualityLevel, ShotBoard};
use tracing_subscriber::EnvFilter;

// Run with:
//   GOOGLE_GENERATIVE_AI_API_KEY=... cargo run -p generate-storyboard -- "a fox crossing a frozen lake"
// Keys saved in the config file take precedence over the environment.
// Optional:
//   STORYBOARD_GRID=3          (2..=5, shots = grid * grid)
//   STORYBOARD_ASPECT=16:9
//   STORYBOARD_QUALITY=hd      (standard | hd | 4k)
//   STORYBOARD_REFS=a.png,b.jpg
//   STORYBOARD_OUT=storyboard-out
//   RUST_LOG=storyboard=debug

fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

fn extension_for(uri: &DataUri) -> &'static str {
    match uri.media_type() {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

fn load_references() -> Result<Vec<DataUri>> {
    let Ok(list) = std::env::var("STORYBOARD_REFS") else {
        return Ok(Vec::new());
    };
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let path = PathBuf::from(p);
            let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            Ok(DataUri::from_bytes(media_type_for(&path), &bytes))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyboard=info")))
        .with_writer(std::io::stderr)
        .init();

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        bail!("usage: generate-storyboard <prompt>");
    }

    let store = CredentialStore::default_location()?;
    let settings = store.load()?.or_env_key(API_KEY_ENV);
    settings.validate()?;
    if settings.api_keys.is_empty() {
        bail!(
            "no API keys: set {API_KEY_ENV} or add \"apiKeys\" to {}",
            store.path().display()
        );
    }

    let grid = match std::env::var("STORYBOARD_GRID") {
        Ok(v) => GridSize::try_from(v.trim().parse::<u8>()?).map_err(anyhow::Error::msg)?,
        Err(_) => GridSize::default(),
    };
    let aspect: AspectRatio = match std::env::var("STORYBOARD_ASPECT") {
        Ok(v) => v.parse().map_err(anyhow::Error::msg)?,
        Err(_) => AspectRatio::default(),
    };
    let quality = match std::env::var("STORYBOARD_QUALITY").ok().as_deref() {
        Some("hd") => QualityLevel::Hd,
        Some("4k") => QualityLevel::UltraHd,
        _ => QualityLevel::Standard,
    };
    let out_dir = PathBuf::from(std::env::var("STORYBOARD_OUT").unwrap_or_else(|_| "storyboard-out".into()));
    let references = load_references()?;

    let factory = GoogleClientFactory::from_settings(&settings)?;
    let storyboard = Storyboard::new(move |c| factory.build(c), settings.dispatch.clone());
    let pool_size = storyboard.initialize_credentials(settings.credentials());
    eprintln!("{pool_size} credential(s), planning {} shots...", grid.shot_count());

    let shots = storyboard
        .plan_storyboard(&prompt, grid, aspect, &references)
        .await?;
    for (i, shot) in shots.iter().enumerate() {
        eprintln!("{:>2}. [{}] {}", i + 1, shot.spec.shot_type, shot.spec.description);
    }

    let tasks = tasks_for(&shots, quality, GenerationMode::Fresh, &references);
    let mut board = ShotBoard::new(shots);
    let mut events = storyboard.run_batch(tasks, None)?;
    while let Some(event) = events.next().await {
        board.apply(&event);
        let done = board.shots().len() - board.pending();
        match &event.outcome {
            Ok(_) => eprintln!("[{done}/{}] shot {} done", board.shots().len(), event.task.shot_id),
            Err(err) => eprintln!(
                "[{done}/{}] shot {} failed: {}",
                board.shots().len(),
                event.task.shot_id,
                err.format_details()
            ),
        }
    }

    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let mut written = 0;
    for (index, shot) in board.shots().iter().enumerate() {
        if let Some(image) = &shot.image_url {
            let path = out_dir.join(format!("shot-{:02}.{}", index + 1, extension_for(image)));
            std::fs::write(&path, image.to_bytes()?)?;
            written += 1;
        } else if let Some(error) = &shot.error {
            eprintln!("shot {:02}: {error}", index + 1);
        }
    }
    println!("wrote {written} image(s) to {}", out_dir.display());
    Ok(())
}
