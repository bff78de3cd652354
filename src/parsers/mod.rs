pub mod links;
pub mod traversal;


pub use links::{TileLayout, extract_image_links, extract_links};
pub use traversal::{AttributeMatcher, MatchChain, contains_token, traverse};
