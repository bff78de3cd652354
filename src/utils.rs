use url::Url;

/// Resolves a relative or absolute link against a base URL
///
/// An empty link is a same-document reference and resolves to `base_url`.
/// Returns `None` when the link cannot be parsed or resolves to a URL without a
/// hierarchical path (`javascript:`, `mailto:`, `data:` and similar), since
/// those never point at a downloadable resource.
pub fn resolve_url(base_url: &Url, link: &str) -> Option<Url> {
    let link = link.trim();
    match base_url.join(link) {
        Ok(url) if !url.cannot_be_a_base() => Some(url),
        Ok(url) => {
            ::log::trace!("Dropping non-hierarchical link: {}", url);
            None
        }
        Err(e) => {
            ::log::trace!("Dropping unresolvable link {:?}: {}", link, e);
            None
        }
    }
}

/// Convert a URL to a sanitized filename
pub fn sanitize_filename(url: &str) -> String {
    // Remove protocol and replace invalid filename characters
    let mut name = url.replace("http://", "").replace("https://", "");
    name = name.replace(['/', ':', '?', '&', '=', '#', '%', '\\', '*', '"', '<', '>', '|'], "_");

    // Limit filename length on a char boundary
    if name.chars().count() > 100 {
        name.chars().take(100).collect()
    } else {
        name
    }
}
