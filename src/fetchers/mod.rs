pub mod document;
pub mod pipeline;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use document::DocumentSource;
pub use pipeline::FetchPipeline;
pub use transport::{HttpTransport, ReqwestTransport};
