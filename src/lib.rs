//! Scrapes a cloud-storage listing page for image links and downloads them concurrently.
//!
//! The page is narrowed down with [`parsers::traverse`], a walk over nested
//! `div`s that each carry an expected attribute token. The resulting links are
//! fetched by a [`fetchers::FetchPipeline`], which publishes decoded images into
//! an observable [`ImageCollection`] as they arrive and keeps a [`Readiness`]
//! flag lowered while a run is in flight.

pub mod collection;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod parsers;
pub mod readiness;
pub mod results;
pub mod utils;
pub mod viewer;

// Re-export commonly used types for convenience
pub use collection::{CollectionEvent, CollectionFollower, ImageCollection};
pub use config::ViewerConfig;
pub use error::{FetchError, ViewerError};
pub use readiness::{Readiness, RunGuard};
pub use results::{DecodedImage, DownloadResult, RunSummary};
pub use viewer::Viewer;
