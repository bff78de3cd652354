use clap::Parser;
use picture_show::utils::sanitize_filename;
use picture_show::{CollectionFollower, DownloadResult, Viewer, ViewerConfig};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    if let Err(e) = run(args).await {
        ::log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = build_config(&args)?;
    ::log::info!("Scraping images from: {}", config.source_url);

    let viewer = Viewer::new(config)?;

    if args.dry_run {
        for url in viewer.discover().await? {
            println!("{}", url);
        }
        return Ok(());
    }

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    // Report images as they land rather than after the run
    let follower = viewer.images().follow().await;
    let finished = CancellationToken::new();
    let consumer = tokio::spawn(consume_images(
        follower,
        args.output_dir.clone(),
        finished.clone(),
    ));

    let start_time = std::time::Instant::now();
    let outcome = viewer.load().await;
    let collected = viewer.images().len().await;

    // The viewer must outlive the consumer so it can catch up from the collection
    finished.cancel();
    if let Err(e) = consumer.await {
        ::log::warn!("Image consumer stopped unexpectedly: {}", e);
    }
    drop(viewer);

    let duration = start_time.elapsed();
    match outcome {
        Ok(summary) => {
            ::log::info!(
                "Loaded {} of {} images in {:.2} seconds",
                summary.downloaded,
                summary.discovered,
                duration.as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            ::log::warn!(
                "Run failed after {:.2} seconds with {} images loaded",
                duration.as_secs_f64(),
                collected
            );
            Err(e.into())
        }
    }
}

/// Merges the config file, environment and command-line overrides
fn build_config(args: &Args) -> Result<ViewerConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::from_file(path)?,
        None => ViewerConfig::default(),
    };

    if let Some(url) = &args.url {
        config.source_url = url.clone();
    }

    // Override the WebDriver URL with an environment variable if provided
    if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
        if !webdriver_url.is_empty() {
            config.webdriver_url = Some(webdriver_url);
        }
    }

    if let Some(webdriver_url) = &args.webdriver {
        config.webdriver_url = Some(webdriver_url.clone());
    }

    Ok(config)
}

/// Logs every arriving image and optionally saves it
async fn consume_images(
    mut images: CollectionFollower,
    output_dir: Option<PathBuf>,
    finished: CancellationToken,
) {
    loop {
        tokio::select! {
            next = images.next() => match next {
                Some((index, item)) => process_image(index, item, output_dir.as_ref()).await,
                None => return,
            },
            _ = finished.cancelled() => break,
        }
    }

    // Whatever landed after the last event we handled
    for (index, item) in images.catch_up().await {
        process_image(index, item, output_dir.as_ref()).await;
    }
}

async fn process_image(index: usize, item: Arc<DownloadResult>, output_dir: Option<&PathBuf>) {
    ::log::info!(
        "Image {}: {} ({}x{})",
        index + 1,
        item.source_url,
        item.image.width(),
        item.image.height()
    );

    if let Some(dir) = output_dir {
        let path = dir.join(format!(
            "{:03}_{}.png",
            index + 1,
            sanitize_filename(item.source_url.as_str())
        ));

        // PNG encoding is CPU-bound; keep it off the runtime workers
        let target = path.clone();
        let saved = tokio::task::spawn_blocking(move || item.image.save_png(&target)).await;
        match saved {
            Ok(Ok(())) => ::log::debug!("Saved {}", path.display()),
            Ok(Err(e)) => ::log::error!("Failed to save {}: {}", path.display(), e),
            Err(e) => ::log::error!("Save task for {} failed: {}", path.display(), e),
        }
    }
}
