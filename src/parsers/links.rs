use crate::parsers::traversal::{self, AttributeMatcher, MatchChain, child_elements};
use crate::utils::resolve_url;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use url::Url;

/// Fixed table walk between the page containers and the tile widgets
const TABLE_PATH: [&str; 5] = ["table", "tbody", "tr", "td", "div"];

/// Shape of the file-listing page: where the tiles are and which anchors count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayout {
    /// Chain from `<body>` down to the container holding the listing table
    #[serde(default = "default_page_chain")]
    pub page_chain: MatchChain,

    /// Chain from a table cell's `<div>` down to a single tile
    #[serde(default = "default_tile_chain")]
    pub tile_chain: MatchChain,

    /// Exact `class` value of anchors that link to an image
    #[serde(default = "default_marker_class")]
    pub marker_class: String,
}

impl Default for TileLayout {
    fn default() -> Self {
        Self {
            page_chain: default_page_chain(),
            tile_chain: default_tile_chain(),
            marker_class: default_marker_class(),
        }
    }
}

fn default_page_chain() -> MatchChain {
    vec![
        AttributeMatcher::id("c_base"),
        AttributeMatcher::id("c_content"),
        AttributeMatcher::id("filesPageContent"),
        AttributeMatcher::class("c-SkyDriveApp"),
        AttributeMatcher::class("mainContent"),
        AttributeMatcher::class("centerColumn"),
        AttributeMatcher::class("content"),
        AttributeMatcher::class("contentArea"),
        AttributeMatcher::class("fillTable"),
    ]
}

fn default_tile_chain() -> MatchChain {
    vec![
        AttributeMatcher::class("c-ListView"),
        AttributeMatcher::class("surface"),
        AttributeMatcher::class("child"),
        AttributeMatcher::class("c-SetItemTile"),
    ]
}

fn default_marker_class() -> String {
    "liimagelink".to_string()
}

/// Checks whether an anchor is an image link: exact marker class and an `<img>` inside
fn is_image_anchor(anchor: &ElementRef<'_>, marker_class: &str) -> bool {
    let has_marker = anchor.value().attr("class") == Some(marker_class);
    let has_image = anchor
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|e| e.value().name() == "img");

    has_marker && has_image
}

/// Tiles reachable from the page containers through the table walk and the tile chain
pub fn find_tiles<'a>(
    containers: &[ElementRef<'a>],
    tile_chain: &[AttributeMatcher],
) -> Vec<ElementRef<'a>> {
    let cells = TABLE_PATH.iter().fold(containers.to_vec(), |current, &tag| {
        current
            .into_iter()
            .flat_map(|element| child_elements(element, tag))
            .collect()
    });

    cells
        .into_iter()
        .flat_map(|cell| traversal::traverse(cell, tile_chain))
        .collect()
}

/// Extracts absolute image-link URLs from the narrowed page containers
///
/// Anchors without the exact marker class, without an image, without an
/// `href`, or whose `href` does not resolve against `base_url` are dropped
/// silently. Duplicates are kept.
pub fn extract_links(
    containers: &[ElementRef<'_>],
    base_url: &Url,
    layout: &TileLayout,
) -> Vec<Url> {
    let tiles = find_tiles(containers, &layout.tile_chain);
    ::log::debug!(
        "Found {} tiles in {} containers",
        tiles.len(),
        containers.len()
    );

    tiles
        .into_iter()
        .flat_map(|tile| child_elements(tile, "a"))
        .filter(|anchor| is_image_anchor(anchor, &layout.marker_class))
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_url(base_url, href))
        .collect()
}

/// Page containers matched by the page chain, starting below `<html><body>`
pub fn find_page_containers<'a>(
    document: &'a Html,
    page_chain: &[AttributeMatcher],
) -> Vec<ElementRef<'a>> {
    child_elements(document.root_element(), "body")
        .flat_map(|body| traversal::traverse(body, page_chain))
        .collect()
}

/// Parses an HTML document and extracts its image links
pub fn extract_image_links(html: &str, base_url: &Url, layout: &TileLayout) -> Vec<Url> {
    let document = Html::parse_document(html);
    let containers = find_page_containers(&document, &layout.page_chain);
    ::log::debug!("Page chain matched {} containers", containers.len());

    let links = extract_links(&containers, base_url, layout);
    ::log::info!("Extracted {} image links", links.len());
    if !links.is_empty() {
        ::log::debug!(
            "First few links: {:?}",
            links.iter().take(5).map(Url::as_str).collect::<Vec<_>>()
        );
    }

    links
}
