//! Pure parsers for the delivery column and the Ley VP flag.

/// Parsed delivery information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryInfo {
    /// Hand-over category or date (first tower's when multi-tower)
    pub delivery_type: Option<String>,

    /// Full per-tower text when the project has several towers
    pub torres: Option<String>,

    /// Status guessed from the configured keyword table
    pub status: Option<String>,
}

/// Parse a raw delivery string into type, tower breakdown and status.
///
/// The keyword scan is case-insensitive and first-match-wins; the matched
/// keyword is returned title-cased. A literal `TORRE` anywhere marks the
/// text as a multi-tower breakdown: the full text becomes `torres` and the
/// part before the first comma becomes the type.
pub fn parse_delivery(text: Option<&str>, keywords: &[String]) -> DeliveryInfo {
    let text = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return DeliveryInfo::default(),
    };

    let lower = text.to_lowercase();
    let status = keywords
        .iter()
        .find(|keyword| lower.contains(&keyword.to_lowercase()))
        .map(|keyword| title_case(keyword));

    if text.to_uppercase().contains("TORRE") {
        let delivery_type = text
            .split(',')
            .next()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .unwrap_or(text);
        DeliveryInfo {
            delivery_type: Some(delivery_type.to_string()),
            torres: Some(text.to_string()),
            status,
        }
    } else {
        DeliveryInfo {
            delivery_type: Some(text.to_string()),
            torres: None,
            status,
        }
    }
}

/// Classify a raw Ley VP cell value.
///
/// Empty or `-` (after trim) means no designation; any other content means
/// the project carries it.
pub fn parse_ley_vp(text: Option<&str>) -> bool {
    match text.map(str::trim) {
        Some("") | Some("-") | None => false,
        Some(_) => true,
    }
}

/// Capitalize the first letter of each word, lowercasing the rest.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
