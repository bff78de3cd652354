use crate::collection::ImageCollection;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::fetchers::{DocumentSource, FetchPipeline, HttpTransport, ReqwestTransport};
use crate::parsers::{self, TileLayout};
use crate::readiness::Readiness;
use crate::results::RunSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Scrapes the listing page and loads every image it links to
///
/// A run fetches the page, narrows it down to the image tiles, and downloads
/// every linked image into [`Viewer::images`]. [`Viewer::readiness`] is
/// lowered for the whole run, including the page fetch.
pub struct Viewer<T = ReqwestTransport> {
    source_url: Url,
    layout: TileLayout,
    document_source: DocumentSource,
    pipeline: FetchPipeline<T>,
}

impl Viewer<ReqwestTransport> {
    /// Create a viewer that talks HTTP through `reqwest`
    pub fn new(config: ViewerConfig) -> Result<Self, ViewerError> {
        let transport = ReqwestTransport::new(&config.user_agent)
            .map_err(|e| ViewerError::Config(format!("building HTTP client: {}", e)))?;
        Self::with_transport(config, Arc::new(transport))
    }
}

impl<T: HttpTransport> Viewer<T> {
    /// Create a viewer over any transport
    pub fn with_transport(config: ViewerConfig, transport: Arc<T>) -> Result<Self, ViewerError> {
        let source_url = Url::parse(&config.source_url).map_err(|e| {
            ViewerError::Config(format!("invalid source URL {:?}: {}", config.source_url, e))
        })?;

        let document_source = match config.webdriver_url {
            Some(webdriver_url) => DocumentSource::WebDriver {
                webdriver_url,
                ready_selector: format!("a.{}", config.layout.marker_class),
                render_timeout: Duration::from_secs(config.render_timeout_secs),
            },
            None => DocumentSource::Http,
        };

        Ok(Self {
            source_url,
            layout: config.layout,
            document_source,
            pipeline: FetchPipeline::new(
                transport,
                Arc::new(ImageCollection::new()),
                Readiness::new(),
            ),
        })
    }

    /// Cancel in-flight downloads when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.pipeline = self.pipeline.with_cancellation(token);
        self
    }

    /// Override how the page source is obtained
    pub fn with_document_source(mut self, source: DocumentSource) -> Self {
        self.document_source = source;
        self
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Images collected by the current or most recent run
    pub fn images(&self) -> &Arc<ImageCollection> {
        self.pipeline.images()
    }

    /// `true` while no run is in flight
    pub fn readiness(&self) -> &Readiness {
        self.pipeline.readiness()
    }

    /// Fetch the page and return the image links it contains
    pub async fn discover(&self) -> Result<Vec<Url>, ViewerError> {
        let html = self
            .document_source
            .fetch(
                self.pipeline.transport().as_ref(),
                &self.source_url,
                self.pipeline.cancellation(),
            )
            .await?;

        // The parsed document is not Send; keep it out of any await
        Ok(parsers::extract_image_links(
            &html,
            &self.source_url,
            &self.layout,
        ))
    }

    /// Run the whole scrape: page fetch, link extraction, image downloads
    ///
    /// A page fetch failure ends the run before any download starts. Image
    /// failures are reported after every download has settled.
    pub async fn load(&self) -> Result<RunSummary, ViewerError> {
        let _guard = self.readiness().begin_run();
        self.images().clear().await;

        let urls = self.discover().await?;
        let summary = self.pipeline.fetch_all(urls).await?;
        Ok(summary)
    }
}
