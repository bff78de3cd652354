use crate::error::ViewerError;
use crate::parsers::TileLayout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Wallpaper listing page the viewer scrapes by default
pub const DEFAULT_SOURCE_URL: &str = "https://onedrive.live.com/?cid=623F2C273E554172&id=623F2C273E554172!11581&ft=8&tagFilter=portrait";

/// Configuration for the picture viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Listing page to scrape; also the base for relative image links
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// URL of a WebDriver instance; when set, the page is rendered in a browser
    #[serde(default)]
    pub webdriver_url: Option<String>,

    /// Seconds to wait for the rendered page to show its tiles
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,

    /// User agent sent with every HTTP request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Where the image tiles live on the page
    #[serde(default)]
    pub layout: TileLayout,
}

/// Default value for source_url
fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

/// Default value for render_timeout_secs
fn default_render_timeout_secs() -> u64 {
    10
}

/// Default value for user_agent
fn default_user_agent() -> String {
    format!("picture-show/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_URL)
    }
}

impl ViewerConfig {
    /// Create a new configuration with default values
    pub fn new(source_url: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            webdriver_url: None,
            render_timeout_secs: default_render_timeout_secs(),
            user_agent: default_user_agent(),
            layout: TileLayout::default(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ViewerError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|e| ViewerError::Config(format!("reading {}: {}", path.display(), e)))?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        serde_json::from_str(json).map_err(|e| ViewerError::Config(e.to_string()))
    }
}
