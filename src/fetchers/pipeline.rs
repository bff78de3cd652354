use crate::collection::ImageCollection;
use crate::error::FetchError;
use crate::fetchers::transport::{HttpTransport, with_cancellation};
use crate::readiness::Readiness;
use crate::results::{DecodedImage, DownloadResult, RunSummary};
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Downloads every URL concurrently and appends decoded images as they land
///
/// All downloads are started at once. One failure never cancels its siblings;
/// the run waits for every download to settle and only then reports the first
/// failure in request order. Images that were appended before the failure stay
/// in the collection.
pub struct FetchPipeline<T> {
    transport: Arc<T>,
    images: Arc<ImageCollection>,
    readiness: Readiness,
    cancel: Option<CancellationToken>,
}

impl<T: HttpTransport> FetchPipeline<T> {
    pub fn new(transport: Arc<T>, images: Arc<ImageCollection>, readiness: Readiness) -> Self {
        Self {
            transport,
            images,
            readiness,
            cancel: None,
        }
    }

    /// Cancel in-flight downloads when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn images(&self) -> &Arc<ImageCollection> {
        &self.images
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    /// One complete run: lower readiness, clear the collection, fetch everything
    ///
    /// Readiness is restored on every exit path. Callers are expected to check
    /// [`Readiness::is_ready`] before starting a run.
    pub async fn run(&self, urls: Vec<Url>) -> Result<RunSummary, FetchError> {
        let _guard = self.readiness.begin_run();
        self.images.clear().await;
        self.fetch_all(urls).await
    }

    /// Fetches and appends every URL without touching readiness or clearing
    pub async fn fetch_all(&self, urls: Vec<Url>) -> Result<RunSummary, FetchError> {
        let discovered = urls.len();
        ::log::info!("Fetching {} images", discovered);

        let outcomes = join_all(urls.into_iter().map(|url| self.fetch_one(url))).await;

        let mut summary = RunSummary {
            discovered,
            ..RunSummary::default()
        };
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(()) => summary.downloaded += 1,
                Err(e) => {
                    summary.failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        ::log::info!(
            "Fetched {} of {} images ({} failed)",
            summary.downloaded,
            summary.discovered,
            summary.failed
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Fetch, decode, append; strictly in that order
    async fn fetch_one(&self, url: Url) -> Result<(), FetchError> {
        let outcome = async {
            let bytes = self.transport.get(&url, self.cancel.as_ref()).await?;
            let image = decode(&url, bytes, self.cancel.as_ref()).await?;
            self.images.push(DownloadResult::new(url.clone(), image)).await;
            Ok::<(), FetchError>(())
        }
        .await;

        match &outcome {
            Ok(()) => ::log::debug!("Downloaded {}", url),
            Err(e) => ::log::warn!("Failed to download {}: {}", url, e),
        }
        outcome
    }
}

/// Decodes on the blocking pool so large images don't stall the runtime
async fn decode(
    url: &Url,
    bytes: Vec<u8>,
    cancel: Option<&CancellationToken>,
) -> Result<DecodedImage, FetchError> {
    let task = async {
        match tokio::task::spawn_blocking(move || DecodedImage::decode(&bytes)).await {
            Ok(Ok(image)) => Ok(image),
            Ok(Err(e)) => Err(FetchError::Decode {
                url: url.clone(),
                message: e.to_string(),
            }),
            Err(e) => Err(FetchError::Join {
                url: url.clone(),
                message: e.to_string(),
            }),
        }
    };

    with_cancellation(url, cancel, task).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::mock::{MockTransport, png_bytes};
    use rand::Rng;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn url(path: &str) -> Url {
        Url::parse("https://example.test/").unwrap().join(path).unwrap()
    }

    fn pipeline(transport: MockTransport) -> FetchPipeline<MockTransport> {
        FetchPipeline::new(
            Arc::new(transport),
            Arc::new(ImageCollection::new()),
            Readiness::new(),
        )
    }

    async fn collected_urls(pipeline: &FetchPipeline<MockTransport>) -> BTreeSet<String> {
        pipeline
            .images()
            .snapshot()
            .await
            .iter()
            .map(|item| item.source_url.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let transport = MockTransport::new()
            .with_body("https://example.test/1.png", png_bytes(2, 2), 40)
            .with_body("https://example.test/2.png", png_bytes(3, 1), 0);
        let pipeline = pipeline(transport);

        let summary = pipeline
            .run(vec![url("1.png"), url("2.png")])
            .await
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                discovered: 2,
                downloaded: 2,
                failed: 0
            }
        );
        let images = pipeline.images().snapshot().await;
        assert_eq!(images.len(), 2);
        // The faster download lands first
        assert_eq!(images[0].source_url, url("2.png"));
        assert_eq!(images[0].image.width(), 3);
    }

    #[tokio::test]
    async fn test_middle_failure_waits_for_siblings() {
        let transport = MockTransport::new()
            .with_body("https://example.test/1.png", png_bytes(1, 1), 30)
            .with_status("https://example.test/2.png", 404, 0)
            .with_body("https://example.test/3.png", png_bytes(1, 1), 30);
        let pipeline = pipeline(transport);

        let err = pipeline
            .run(vec![url("1.png"), url("2.png"), url("3.png")])
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(err.url(), &url("2.png"));

        let collected = collected_urls(&pipeline).await;
        let expected: BTreeSet<String> = [url("1.png"), url("3.png")]
            .iter()
            .map(Url::to_string)
            .collect();
        assert_eq!(collected, expected);
        assert!(pipeline.readiness().is_ready());
    }

    #[tokio::test]
    async fn test_decode_failure_is_not_collected() {
        let transport = MockTransport::new()
            .with_body("https://example.test/ok.png", png_bytes(1, 1), 0)
            .with_body("https://example.test/bad.png", b"<html>nope</html>".to_vec(), 0);
        let pipeline = pipeline(transport);

        let err = pipeline
            .run(vec![url("bad.png"), url("ok.png")])
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode { .. }));
        let images = pipeline.images().snapshot().await;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].source_url, url("ok.png"));
    }

    #[tokio::test]
    async fn test_randomized_latency_is_repeatable() {
        let mut transport = MockTransport::new();
        let mut urls = Vec::new();
        let mut successes = 0;
        {
            let mut rng = rand::thread_rng();
            for i in 0..24 {
                let target = format!("https://example.test/img/{}.png", i);
                let delay = rng.gen_range(0..15);
                transport = if i % 5 == 3 {
                    transport.with_status(&target, 500, delay)
                } else {
                    successes += 1;
                    transport.with_body(&target, png_bytes(1, 1), delay)
                };
                urls.push(Url::parse(&target).unwrap());
            }
        }
        let pipeline = pipeline(transport);

        assert!(pipeline.run(urls.clone()).await.is_err());
        let first = collected_urls(&pipeline).await;
        assert_eq!(pipeline.images().len().await, successes);

        assert!(pipeline.run(urls).await.is_err());
        let second = collected_urls(&pipeline).await;
        assert_eq!(pipeline.images().len().await, successes);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_readiness_lowered_for_whole_run() {
        let transport = MockTransport::new()
            .with_status("https://example.test/1.png", 500, 20)
            .with_status("https://example.test/2.png", 503, 40);
        let pipeline = pipeline(transport);
        let readiness = pipeline.readiness().clone();
        let mut rx = readiness.subscribe();

        assert!(readiness.is_ready());

        let (result, ()) = tokio::join!(pipeline.run(vec![url("1.png"), url("2.png")]), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(!readiness.is_ready());
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!readiness.is_ready());
        });

        assert!(result.is_err());
        assert!(readiness.is_ready());
        assert!(pipeline.images().is_empty().await);

        // Subscribers end on the restored value
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_empty_run() {
        let pipeline = pipeline(MockTransport::new());

        let summary = pipeline.run(Vec::new()).await.unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(pipeline.readiness().is_ready());
    }

    #[tokio::test]
    async fn test_run_clears_previous_results() {
        let transport = MockTransport::new()
            .with_body("https://example.test/1.png", png_bytes(1, 1), 0)
            .with_body("https://example.test/2.png", png_bytes(1, 1), 0);
        let pipeline = pipeline(transport);

        pipeline.run(vec![url("1.png")]).await.unwrap();
        pipeline.run(vec![url("2.png")]).await.unwrap();

        let images = pipeline.images().snapshot().await;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].source_url, url("2.png"));
    }

    #[tokio::test]
    async fn test_duplicates_are_fetched_twice() {
        let transport =
            MockTransport::new().with_body("https://example.test/1.png", png_bytes(1, 1), 0);
        let pipeline = pipeline(transport);

        let summary = pipeline
            .run(vec![url("1.png"), url("1.png")])
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 2);
        assert_eq!(pipeline.transport().requested().len(), 2);
        assert_eq!(pipeline.images().len().await, 2);
    }

    #[tokio::test]
    async fn test_cancellation_settles_every_download() {
        let transport = MockTransport::new()
            .with_body("https://example.test/1.png", png_bytes(1, 1), 500)
            .with_body("https://example.test/2.png", png_bytes(1, 1), 500);
        let token = CancellationToken::new();
        let pipeline = pipeline(transport).with_cancellation(token.clone());

        let (result, ()) = tokio::join!(pipeline.run(vec![url("1.png"), url("2.png")]), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        assert!(matches!(result, Err(FetchError::Cancelled { .. })));
        assert!(pipeline.images().is_empty().await);
        assert!(pipeline.readiness().is_ready());
    }
}
