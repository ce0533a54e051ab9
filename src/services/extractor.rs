//! Layout-adaptive field extraction for catalog cards.
//!
//! The catalog renders cards in one of three layouts depending on the
//! selected view. Resolution order is strict: list > table > grid. Every
//! per-field lookup degrades to `None` on missing or malformed markup; a
//! card always yields a record, and the crawl loop discards the ones
//! without a name.

use scraper::{ElementRef, Html, Selector};

use crate::models::{CatalogSelectors, ProjectRecord};
use crate::services::delivery::{DeliveryInfo, parse_delivery, parse_ley_vp};
use crate::utils::url::absolutize;

/// Extracts [`ProjectRecord`]s from parsed catalog HTML.
pub struct FieldExtractor<'a> {
    selectors: &'a CatalogSelectors,
    base_url: &'a str,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(selectors: &'a CatalogSelectors, base_url: &'a str) -> Self {
        Self {
            selectors,
            base_url,
        }
    }

    /// Extract every card matched by `card_css` in a page snapshot.
    pub fn extract_all(&self, html: &str, card_css: &str) -> Vec<ProjectRecord> {
        let document = Html::parse_document(html);
        let Some(card_selector) = parse_selector(card_css) else {
            return Vec::new();
        };
        document
            .select(&card_selector)
            .map(|card| self.extract(card))
            .collect()
    }

    /// Extract a single card, resolving its layout.
    pub fn extract(&self, card: ElementRef<'_>) -> ProjectRecord {
        if let Some(row) = select_first(card, &self.selectors.list.row_marker) {
            return self.extract_list(card, row);
        }
        if select_first(card, &self.selectors.table.cell).is_some() {
            return self.extract_table(card);
        }
        self.extract_grid(card)
    }

    /// List layout: fields addressed by column position within the row.
    fn extract_list(&self, card: ElementRef<'_>, row: ElementRef<'_>) -> ProjectRecord {
        let list = &self.selectors.list;

        let delivery = self.delivery_from_column(nth_child_element(row, list.delivery_col));
        let has_ley_vp = self.ley_vp_from_column(nth_child_element(row, list.ley_vp_col));

        ProjectRecord {
            name: text_in_col(row, list.name_col, &list.name),
            zone: text_in_col(row, list.zone_col, &list.zone),
            delivery_type: delivery.delivery_type,
            delivery_torres: delivery.torres,
            project_status: delivery.status,
            price_from: last_text_in_col(row, list.price_col, &list.price),
            developer: text_in_col(row, list.developer_col, &list.developer),
            commission: text_in_col(row, list.commission_col, &list.commission),
            has_ley_vp,
            location: text_in_col(row, list.location_col, &list.location),
            image_url: self.image_src(card),
            detail_url: absolutize(self.base_url, card.value().attr("href")),
        }
    }

    /// Table layout: fields addressed by cell index.
    fn extract_table(&self, card: ElementRef<'_>) -> ProjectRecord {
        let table = &self.selectors.table;
        let cells: Vec<ElementRef<'_>> = match parse_selector(&table.cell) {
            Some(selector) => card.select(&selector).collect(),
            None => Vec::new(),
        };
        let cell = |col: usize| cells.get(col.checked_sub(1)?).copied();

        let mut delivery = self.delivery_from_column(cell(table.delivery_col));
        if delivery.delivery_type.is_none() {
            delivery.delivery_type = cell(table.delivery_col).and_then(text_of);
        }
        let has_ley_vp = self.ley_vp_from_column(cell(table.ley_vp_col));

        let detail_href = select_first(card, &table.link).and_then(|a| a.value().attr("href"));

        ProjectRecord {
            name: cell(table.name_col).and_then(text_of),
            zone: cell(table.zone_col).and_then(text_of),
            delivery_type: delivery.delivery_type,
            delivery_torres: delivery.torres,
            project_status: delivery.status,
            price_from: cell(table.price_col).and_then(text_of),
            developer: cell(table.developer_col).and_then(text_of),
            commission: cell(table.commission_col).and_then(text_of),
            has_ley_vp,
            location: None,
            image_url: self.image_src(card),
            detail_url: absolutize(self.base_url, detail_href),
        }
    }

    /// Grid layout fallback: several fields are simply not rendered here.
    fn extract_grid(&self, card: ElementRef<'_>) -> ProjectRecord {
        let grid = &self.selectors.grid;

        let raw_tag = select_first(card, &grid.delivery_tag).and_then(text_of);
        let delivery = parse_delivery(raw_tag.as_deref(), &self.selectors.status_keywords);

        let detail_href = select_first(card, &grid.link).and_then(|a| a.value().attr("href"));

        ProjectRecord {
            name: select_first(card, &grid.title).and_then(text_of),
            zone: None,
            delivery_type: delivery.delivery_type,
            delivery_torres: delivery.torres,
            project_status: delivery.status,
            price_from: None,
            developer: None,
            commission: None,
            // Not determinable in this layout
            has_ley_vp: false,
            location: select_first(card, &grid.location).and_then(text_of),
            image_url: self.image_src(card),
            detail_url: absolutize(self.base_url, detail_href),
        }
    }

    /// Delivery column: hand-over tag through the parser, then the
    /// `Estado:` paragraph overrides any status the parser guessed.
    fn delivery_from_column(&self, column: Option<ElementRef<'_>>) -> DeliveryInfo {
        let Some(column) = column else {
            return DeliveryInfo::default();
        };
        let delivery = &self.selectors.delivery;

        let raw_tag = select_first(column, &delivery.tag).and_then(text_of);
        let mut info = parse_delivery(raw_tag.as_deref(), &self.selectors.status_keywords);

        if let Some(paragraph) = select_first(column, &delivery.status_paragraph).and_then(text_of)
        {
            if let Some(position) = paragraph.rfind(&delivery.status_marker) {
                let status = paragraph[position + delivery.status_marker.len()..].trim();
                if !status.is_empty() {
                    info.status = Some(status.to_string());
                }
            }
        }
        info
    }

    /// Ley VP column: a visual indicator wins; otherwise classify the text.
    fn ley_vp_from_column(&self, column: Option<ElementRef<'_>>) -> bool {
        let Some(column) = column else {
            return false;
        };
        if select_first(column, &self.selectors.ley_vp_icon).is_some() {
            return true;
        }
        parse_ley_vp(text_of(column).as_deref())
    }

    fn image_src(&self, card: ElementRef<'_>) -> Option<String> {
        select_first(card, &self.selectors.image)
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string)
    }
}

/// Parse a selector, degrading to `None` on malformed config values.
fn parse_selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(css)?;
    scope.select(&selector).next()
}

/// Nth direct child element (1-based), matching positional column layouts.
fn nth_child_element(parent: ElementRef<'_>, position: usize) -> Option<ElementRef<'_>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .nth(position.checked_sub(1)?)
}

/// Trimmed, whitespace-collapsed text content.
fn text_of(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() { None } else { Some(text) }
}

fn text_in_col(row: ElementRef<'_>, column: usize, css: &str) -> Option<String> {
    let col = nth_child_element(row, column)?;
    select_first(col, css).and_then(text_of)
}

/// Like [`text_in_col`] but takes the **last** match in the column.
fn last_text_in_col(row: ElementRef<'_>, column: usize, css: &str) -> Option<String> {
    let col = nth_child_element(row, column)?;
    let selector = parse_selector(css)?;
    col.select(&selector).last().and_then(text_of)
}
