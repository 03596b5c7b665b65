//! Detail-page parser
//!
//! A detail page carries two structural anchors: the header row (name and
//! area crumb) and the overview block (labelled details, summary, base info
//! list and the location module). Everything is optional; a missing node
//! leaves its field `None`.

use crate::extract::record::Record;
use chrono::{DateTime, Local};
use scraper::{ElementRef, Html, Selector};

/// Both structural anchors; a genuine detail page matches exactly twice
const STRUCTURAL_ANCHORS: &str = r#"div.row.row-top, div[data-anchor="overview"]"#;

/// Number of structural anchors a valid detail page carries
pub const EXPECTED_ANCHORS: usize = 2;

/// A parsed detail page, before geocoding
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDetail {
    /// Record with every field the page itself provides
    pub record: Record,

    /// Raw `data-params` payload for the location lookup, if present
    pub geocode_params: Option<String>,
}

/// Counts the structural anchors on a page
pub fn count_structural_anchors(html: &str) -> usize {
    let document = Html::parse_document(html);
    match Selector::parse(STRUCTURAL_ANCHORS) {
        Ok(selector) => document.select(&selector).count(),
        Err(_) => 0,
    }
}

/// Parses a detail page body into a record
///
/// # Arguments
///
/// * `html` - The detail page body
/// * `source_tag` - Value for the record's `source` field
/// * `captured_at` - Capture time for the record's `timeStamp` field
pub fn parse_detail(html: &str, source_tag: &str, captured_at: DateTime<Local>) -> ParsedDetail {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut record = Record::new(source_tag, captured_at);
    let mut geocode_params = None;

    if let Some(header) = first(&root, "div.row.row-top") {
        record.resort_name = first(&header, "div.title h1").and_then(|h1| text_of(&h1));

        if let Some(area) = first(&header, "div.drop > span > a") {
            record.area_name = text_of(&area);
            record.area_id = area.value().attr("href").and_then(parse_area_id);
        }
    }

    if let Some(overview) = first(&root, r#"div[data-anchor="overview"]"#) {
        if let Some(detail) = first(&overview, "div.mod.mod-detail") {
            apply_detail_module(&mut record, &detail);
        }

        if let Some(location) = first(&overview, "div.mod.mod-location") {
            record.address = first(&location, "p.sub").and_then(|p| text_of(&p));

            geocode_params = first(&location, r#"div[data-api*="poiLocationApi"]"#)
                .and_then(|div| div.value().attr("data-params"))
                .map(str::to_string);
            record.poi_id = geocode_params.as_deref().and_then(parse_poi_id);
        }
    }

    ParsedDetail {
        record,
        geocode_params,
    }
}

/// Fills labelled details, the summary and the base info list
fn apply_detail_module(record: &mut Record, detail: &ElementRef) {
    for dl in child_elements(detail, "dl") {
        let label = child_elements(&dl, "dt").next().and_then(|dt| text_of(&dt));
        let value = child_elements(&dl, "dd").next().and_then(|dd| text_of(&dd));

        match label.as_deref() {
            Some("交通") => record.trans_info = value,
            Some("门票") => record.tickets_info = value,
            Some("开放时间") => record.open_info = value,
            Some(other) => tracing::trace!(label = other, "Ignoring unknown detail label"),
            None => {}
        }
    }

    record.introduction = first(detail, "div.summary").and_then(|div| text_of(&div));

    let Some(base_info) = first(detail, "ul.baseinfo") else {
        return;
    };
    for li in child_elements(&base_info, "li") {
        let content = first(&li, "div.content").and_then(|div| text_of(&div));
        for class in li.value().classes() {
            match class {
                "tel" => record.tel = content.clone(),
                "item-site" => record.item_site = content.clone(),
                "item-time" => record.item_time = content.clone(),
                "pay-abstracts" => record.pay_abstracts = content.clone(),
                _ => {}
            }
        }
    }
}

/// Extracts the numeric area id from an area link such as `/travel-scenic-spot/mafengwo/10030.html`
fn parse_area_id(href: &str) -> Option<i64> {
    let pattern = regex::Regex::new(r"(\d+)\.html").ok()?;
    pattern.captures(href)?.get(1)?.as_str().parse().ok()
}

/// Reads `poi_id` from the location params JSON, as a number or a numeric string
fn parse_poi_id(params: &str) -> Option<i64> {
    let value: serde_json::Value = serde_json::from_str(params).ok()?;
    match value.get("poi_id")? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn first<'a>(scope: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

fn child_elements<'a>(
    parent: &ElementRef<'a>,
    name: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

/// Collects an element's text, trimmed; blank text counts as absent
fn text_of(element: &ElementRef) -> Option<String> {
    let text: String = element.text().collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
