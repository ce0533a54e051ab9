// src/utils/url.rs

//! URL manipulation utilities for catalog identity handling.

use regex::Regex;

/// Build an absolute URL from a possibly relative `href`.
///
/// Absolute URLs pass through unchanged. Relative ones are joined to `base`
/// with exactly one slash between them. `None` in yields `None` out.
///
/// # Examples
/// ```
/// use irisbot::utils::url::absolutize;
///
/// assert_eq!(
///     absolutize("https://example.com", Some("proyecto/235")),
///     Some("https://example.com/proyecto/235".to_string())
/// );
/// assert_eq!(absolutize("https://example.com", None), None);
/// ```
pub fn absolutize(base: &str, href: Option<&str>) -> Option<String> {
    let href = href?;
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    Some(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        href.trim_start_matches('/')
    ))
}

/// Extract the numeric project ID from a detail URL.
///
/// The ID is the digits following the `/proyecto/` path marker; query strings
/// and relative/absolute forms are tolerated.
///
/// # Examples
/// ```
/// use irisbot::utils::url::extract_project_id;
///
/// assert_eq!(extract_project_id("/proyecto/235"), Some(235));
/// assert_eq!(
///     extract_project_id("https://iris.example.com/proyecto/682?operation=Venta"),
///     Some(682)
/// );
/// assert_eq!(extract_project_id("/nosotros"), None);
/// ```
pub fn extract_project_id(url: &str) -> Option<i64> {
    let pattern = Regex::new(r"/proyecto/(\d+)").ok()?;
    let caps = pattern.captures(url)?;
    caps.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize_passthrough() {
        assert_eq!(
            absolutize("https://example.com", Some("https://other.com/x")),
            Some("https://other.com/x".to_string())
        );
    }

    #[test]
    fn test_absolutize_adds_single_slash() {
        assert_eq!(
            absolutize("https://example.com/", Some("/proyecto/1")),
            Some("https://example.com/proyecto/1".to_string())
        );
        assert_eq!(
            absolutize("https://example.com", Some("proyecto/1")),
            Some("https://example.com/proyecto/1".to_string())
        );
    }

    #[test]
    fn test_absolutize_none() {
        assert_eq!(absolutize("https://example.com", None), None);
    }

    #[test]
    fn test_extract_id_relative() {
        assert_eq!(extract_project_id("/proyecto/235"), Some(235));
    }

    #[test]
    fn test_extract_id_ignores_query_string() {
        assert_eq!(
            extract_project_id("https://host/proyecto/235?operation=Venta"),
            Some(235)
        );
        assert_eq!(extract_project_id("/proyecto/235"), Some(235));
    }

    #[test]
    fn test_extract_id_trailing_segments() {
        assert_eq!(extract_project_id("/proyecto/1234/detalle"), Some(1234));
    }

    #[test]
    fn test_extract_id_missing() {
        assert_eq!(extract_project_id("/proyectos?country=1"), None);
        assert_eq!(extract_project_id(""), None);
    }
}
