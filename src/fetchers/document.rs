use crate::error::ViewerError;
use crate::fetchers::transport::HttpTransport;
use fantoccini::{Client, ClientBuilder, Locator};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Common WebDriver endpoints tried when the configured one is unreachable
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:4444", // Selenium / geckodriver default
    "http://localhost:9515", // ChromeDriver default
    "http://127.0.0.1:4444",
    "http://127.0.0.1:9515",
];

/// Where the listing page's HTML comes from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Plain HTTP GET; gets whatever markup the server sends
    Http,

    /// Let a browser render the page through WebDriver first
    WebDriver {
        webdriver_url: String,
        /// CSS selector that marks the page as rendered
        ready_selector: String,
        /// How long to wait for `ready_selector` before taking the source anyway
        render_timeout: Duration,
    },
}

impl DocumentSource {
    /// Fetch the document source as text
    pub async fn fetch<T: HttpTransport>(
        &self,
        transport: &T,
        url: &Url,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ViewerError> {
        ::log::info!("Fetching source document: {}", url);
        match self {
            DocumentSource::Http => {
                let bytes = transport
                    .get(url, cancel)
                    .await
                    .map_err(ViewerError::Document)?;
                Ok(decode_text(&bytes))
            }
            DocumentSource::WebDriver {
                webdriver_url,
                ready_selector,
                render_timeout,
            } => render(webdriver_url, url, ready_selector, *render_timeout).await,
        }
    }
}

/// Decodes a document body, honouring a UTF-8 or UTF-16 byte order mark
pub fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Navigates a WebDriver session to `url` and returns the rendered source
async fn render(
    webdriver_url: &str,
    url: &Url,
    ready_selector: &str,
    render_timeout: Duration,
) -> Result<String, ViewerError> {
    let client = connect_to_webdriver(webdriver_url).await?;

    let source = rendered_source(&client, url, ready_selector, render_timeout).await;

    // Always end the session, even when rendering failed
    if let Err(e) = client.close().await {
        ::log::warn!("Failed to close WebDriver session: {}", e);
    }

    source
}

async fn rendered_source(
    client: &Client,
    url: &Url,
    ready_selector: &str,
    render_timeout: Duration,
) -> Result<String, ViewerError> {
    client
        .goto(url.as_str())
        .await
        .map_err(|e| ViewerError::WebDriver(format!("navigating to {}: {}", url, e)))?;

    let started = std::time::Instant::now();
    match client
        .wait()
        .at_most(render_timeout)
        .for_element(Locator::Css(ready_selector))
        .await
    {
        Ok(_) => ::log::debug!(
            "Page rendered in {:.2} seconds",
            started.elapsed().as_secs_f64()
        ),
        Err(e) => ::log::warn!(
            "'{}' did not appear within {:?}, using source as is: {}",
            ready_selector,
            render_timeout,
            e
        ),
    }

    client
        .source()
        .await
        .map_err(|e| ViewerError::WebDriver(format!("reading source of {}: {}", url, e)))
}

/// Connects to the WebDriver instance, falling back to common local endpoints
async fn connect_to_webdriver(webdriver_url: &str) -> Result<Client, ViewerError> {
    match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!(
                "Failed to connect to WebDriver at {}: {}",
                webdriver_url,
                e
            );
        }
    }

    for url in FALLBACK_WEBDRIVER_URLS {
        if url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    Err(ViewerError::WebDriver(format!(
        "no WebDriver server reachable at {} or any fallback; \
         start one or set WEBDRIVER_URL",
        webdriver_url
    )))
}
