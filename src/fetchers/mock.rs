//! In-memory transport for tests

use crate::error::FetchError;
use crate::fetchers::transport::{HttpTransport, with_cancellation};
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Clone)]
enum Reply {
    Body(Vec<u8>),
    Status(u16),
}

/// Serves canned replies per URL after a simulated latency
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    routes: HashMap<String, (Reply, Duration)>,
    requests: Mutex<Vec<Url>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_body(mut self, url: &str, body: Vec<u8>, delay_ms: u64) -> Self {
        self.routes.insert(
            url.to_string(),
            (Reply::Body(body), Duration::from_millis(delay_ms)),
        );
        self
    }

    pub(crate) fn with_status(mut self, url: &str, status: u16, delay_ms: u64) -> Self {
        self.routes.insert(
            url.to_string(),
            (Reply::Status(status), Duration::from_millis(delay_ms)),
        );
        self
    }

    /// URLs requested so far, in request order
    pub(crate) fn requested(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for MockTransport {
    async fn get(
        &self,
        url: &Url,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.clone());
        let route = self.routes.get(url.as_str()).cloned();

        let reply = async {
            match route {
                Some((reply, delay)) => {
                    tokio::time::sleep(delay).await;
                    match reply {
                        Reply::Body(body) => Ok(body),
                        Reply::Status(status) => Err(FetchError::Status {
                            url: url.clone(),
                            status,
                        }),
                    }
                }
                None => Err(FetchError::Request {
                    url: url.clone(),
                    message: "no route".to_string(),
                }),
            }
        };

        with_cancellation(url, cancel, reply).await
    }
}

/// Encodes a solid-colour PNG of the given size
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
