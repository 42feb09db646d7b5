//! Product-detail extraction from the three sources the marketplace
//! exposes: the internal JSON API, the embedded page state, and the
//! rendered markup. The caller picks the entry point for the source it
//! fetched; `parse_detail_page` is the only place two of them meet,
//! choosing between state and markup for a retrieved page.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use olx_common::{ProductDetail, ScrapeError, Seller};

use crate::fetcher::PageFetcher;
use crate::markup::{strip_style_blocks, text_of};
use crate::{absolutize, json, BASE_URL};

static RE_PHOTO_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";s=\{?\w+\}?x\{?\w+\}?").unwrap());
static RE_PHOTO_QUALITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r";q=\d+").unwrap());
static RE_BR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_URL_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ID([a-zA-Z0-9]+)\.html").unwrap());

/// Strip image sizing and quality tokens to get the full-resolution
/// URL. Handles fixed sizes (`;s=216x152`) and templates
/// (`;s={width}x{height}`); every other path segment is untouched.
pub fn clean_photo_url(url: &str) -> String {
    let without_size = RE_PHOTO_SIZE.replace_all(url, "");
    RE_PHOTO_QUALITY.replace_all(&without_size, "").to_string()
}

/// Line-break tags become newlines BEFORE the remaining tags are
/// stripped; the reverse order would lose the intentional breaks.
pub fn normalize_description(raw: &str) -> String {
    let with_breaks = RE_BR.replace_all(raw, "\n");
    RE_TAG.replace_all(&with_breaks, "").to_string()
}

/// Fetch a product by id through the internal JSON API. `None` means
/// the ad does not exist; the route layer turns that into a 404.
pub async fn fetch_product(
    fetcher: &dyn PageFetcher,
    id: &str,
) -> Result<Option<ProductDetail>, ScrapeError> {
    let url = format!("{BASE_URL}/api/v1/offers/{id}/");
    let body = fetcher.retrieve(&url).await?;
    let payload: Value = serde_json::from_str(&body).map_err(|e| ScrapeError::Payload {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    let Some(data) = payload.get("data") else {
        return Ok(None);
    };
    if data.get("id").map(json::id_string).unwrap_or_default().is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_detail_from_api(data)))
}

/// Parse a retrieved product page, preferring the embedded state and
/// falling back to markup structure when it is absent.
pub fn parse_detail_page(html: &str, url: &str) -> ProductDetail {
    match crate::state::extract_state(html).as_ref().and_then(crate::state::ad_node) {
        Some(ad) => parse_detail_from_state(ad, url),
        None => parse_detail_from_html(html, url),
    }
}

/// Parse the `data` node of an internal API offer payload.
pub fn parse_detail_from_api(ad: &Value) -> ProductDetail {
    let mut parameters = BTreeMap::new();
    let mut diverted_price = String::new();
    if let Some(params) = ad.get("params").and_then(Value::as_array) {
        for p in params {
            let Some(key) = json::str_field(p, "name").or_else(|| json::str_field(p, "key")) else {
                continue;
            };
            let value = param_value(p);
            // The price often arrives as a parameter too; it belongs at
            // the top level, not in the parameter map.
            if key == "price" || key == "Cena" {
                diverted_price = value;
            } else {
                parameters.insert(key.to_string(), value);
            }
        }
    }

    let photos = ad
        .get("photos")
        .and_then(Value::as_array)
        .map(|ps| ps.iter().filter_map(photo_link).map(|p| clean_photo_url(&p)).collect())
        .unwrap_or_default();

    ProductDetail {
        id: ad.get("id").map(json::id_string).unwrap_or_default(),
        title: json::str_field(ad, "title").unwrap_or_default().to_string(),
        description: normalize_description(json::str_field(ad, "description").unwrap_or_default()),
        price: api_price(ad, diverted_price),
        negotiable: json::bool_at(ad, "/price/negotiable"),
        parameters,
        photos,
        location: location_from(ad, "/location/city/name", "/location/region/name"),
        posted_at: json::str_field(ad, "last_refresh_time")
            .or_else(|| json::str_field(ad, "created_time"))
            .or_else(|| json::str_field(ad, "lastRefreshTime"))
            .or_else(|| json::str_field(ad, "createdTime"))
            .unwrap_or_default()
            .to_string(),
        seller: seller_from(ad),
        url: ad
            .get("url")
            .and_then(Value::as_str)
            .map(absolutize)
            .unwrap_or_default(),
    }
}

/// Parse the ad node of an embedded page state. Same shape family as
/// the API payload, but with the embedded schema's field names.
pub fn parse_detail_from_state(ad: &Value, url: &str) -> ProductDetail {
    let mut parameters = BTreeMap::new();
    if let Some(params) = ad.get("params").and_then(Value::as_array) {
        for p in params {
            let Some(key) = json::str_field(p, "name").or_else(|| json::str_field(p, "key")) else {
                continue;
            };
            parameters.insert(key.to_string(), param_value(p));
        }
    }

    let photos = ad
        .get("photos")
        .and_then(Value::as_array)
        .map(|ps| ps.iter().filter_map(photo_link).map(|p| clean_photo_url(&p)).collect())
        .unwrap_or_default();

    let price = json::str_at(ad, "/price/displayValue")
        .map(str::to_string)
        .or_else(|| computed_regular_price(ad))
        .unwrap_or_default();

    ProductDetail {
        id: ad.get("id").map(json::id_string).unwrap_or_default(),
        title: json::str_field(ad, "title").unwrap_or_default().to_string(),
        description: normalize_description(json::str_field(ad, "description").unwrap_or_default()),
        price,
        negotiable: json::bool_at(ad, "/contact/negotiation") || json::bool_at(ad, "/price/negotiation"),
        parameters,
        photos,
        location: location_from(ad, "/location/cityName", "/location/regionName"),
        posted_at: json::str_field(ad, "lastRefreshTime")
            .or_else(|| json::str_field(ad, "createdTime"))
            .unwrap_or_default()
            .to_string(),
        seller: seller_from(ad),
        url: url.to_string(),
    }
}

/// Parse a rendered product page by its stable structural attributes.
pub fn parse_detail_from_html(html: &str, url: &str) -> ProductDetail {
    let cleaned = strip_style_blocks(html);
    let document = Html::parse_document(&cleaned);

    let title = select_text(&document, r#"[data-testid="offer_title"]"#);
    let price = select_text(&document, r#"[data-testid="ad-price-container"]"#);
    let description = select_text(&document, r#"[data-testid="ad_description"]"#);

    let mut parameters = BTreeMap::new();
    let param_sel = Selector::parse(r#"[data-testid="ad-parameters-container"] p"#).unwrap();
    for p in document.select(&param_sel) {
        // "Stan: Używane" → ("Stan", "Używane"); values may contain
        // further colons.
        if let Some((key, value)) = text_of(p).split_once(':') {
            let (key, value) = (key.trim(), value.trim());
            if !key.is_empty() && !value.is_empty() {
                parameters.insert(key.to_string(), value.to_string());
            }
        }
    }

    let mut photos = Vec::new();
    let photo_sel = Selector::parse(r#"[data-testid="swiper-image"]"#).unwrap();
    for img in document.select(&photo_sel) {
        if let Some(src) = img.attr("src").map(str::to_string).or_else(|| first_srcset_entry(img.attr("srcset"))) {
            if !src.is_empty() {
                photos.push(src);
            }
        }
    }

    let negotiable = price.to_lowercase().contains("negocj") || html.contains(r#""negotiation":true"#);

    let id = RE_URL_ID
        .captures(url)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    ProductDetail {
        id,
        title,
        description,
        price,
        negotiable,
        parameters,
        photos,
        location: String::new(),
        posted_at: select_text(&document, r#"[data-testid="ad-posted-at"]"#),
        seller: Seller {
            name: select_text(&document, r#"[data-testid="user-profile-user-name"]"#),
            member_since: select_text(&document, r#"[data-testid="member-since"]"#),
        },
        url: url.to_string(),
    }
}

// --- Field accessors (fallback precedence is the business logic) ---

/// Parameter value precedence: plain string, labeled value, normalized
/// value, then the value's raw JSON form.
fn param_value(p: &Value) -> String {
    match p.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(v) => json::str_field(v, "label")
            .or_else(|| json::str_field(p, "normalizedValue"))
            .map(str::to_string)
            .unwrap_or_else(|| v.to_string()),
        None => String::new(),
    }
}

/// API price precedence: displayed price, displayed regular price,
/// computed regular price, then a price diverted from the parameters.
fn api_price(ad: &Value, diverted: String) -> String {
    json::str_at(ad, "/price/displayValue")
        .or_else(|| json::str_at(ad, "/price/regularPrice/displayValue"))
        .map(str::to_string)
        .or_else(|| computed_regular_price(ad))
        .unwrap_or(diverted)
}

/// `"{value} {currencyCode}"`, defaulting the local currency symbol
/// when the code is absent.
fn computed_regular_price(ad: &Value) -> Option<String> {
    let value = match ad.pointer("/price/regularPrice/value")? {
        // A zero value means no real price was set; let the diverted
        // parameter price win instead.
        Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
        Value::String(s) if !s.is_empty() => s.clone(),
        _ => return None,
    };
    let currency = json::str_at(ad, "/price/regularPrice/currencyCode").unwrap_or("zł");
    Some(format!("{value} {currency}"))
}

fn photo_link(p: &Value) -> Option<String> {
    match p {
        Value::String(s) => Some(s.clone()),
        _ => json::str_field(p, "link").map(str::to_string),
    }
}

fn location_from(ad: &Value, city_ptr: &str, region_ptr: &str) -> String {
    json::str_at(ad, "/location/pathName")
        .map(str::to_string)
        .unwrap_or_else(|| json::join_location(json::str_at(ad, city_ptr), json::str_at(ad, region_ptr)))
}

fn seller_from(ad: &Value) -> Seller {
    Seller {
        name: json::str_at(ad, "/contact/name")
            .or_else(|| json::str_at(ad, "/user/name"))
            .unwrap_or_default()
            .to_string(),
        member_since: json::str_at(ad, "/user/created").unwrap_or_default().to_string(),
    }
}

fn select_text(document: &Html, selector: &str) -> String {
    let sel = Selector::parse(selector).unwrap();
    document.select(&sel).next().map(text_of).unwrap_or_default()
}

fn first_srcset_entry(srcset: Option<&str>) -> Option<String> {
    srcset?
        .split(',')
        .next()?
        .trim()
        .split(' ')
        .next()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn photo_cleaning_removes_size_and_quality_tokens() {
        assert_eq!(
            clean_photo_url("https://img.site/a;s={w}x{h};q=80.jpg"),
            "https://img.site/a.jpg"
        );
        assert_eq!(
            clean_photo_url("https://img.site/b;s=216x152;q=50.webp"),
            "https://img.site/b.webp"
        );
        assert_eq!(
            clean_photo_url("https://img.site/c;s={width}x{height}"),
            "https://img.site/c"
        );
        // No tokens: unchanged.
        assert_eq!(clean_photo_url("https://img.site/plain.jpg"), "https://img.site/plain.jpg");
    }

    #[test]
    fn description_breaks_survive_tag_stripping() {
        assert_eq!(
            normalize_description("line one<br>line two<BR />line <b>three</b>"),
            "line one\nline two\nline three"
        );
    }

    #[test]
    fn api_price_precedence() {
        let displayed = json!({"price": {"displayValue": "200 zł", "regularPrice": {"value": 150, "currencyCode": "PLN"}}});
        assert_eq!(api_price(&displayed, String::new()), "200 zł");

        // The documented scenario: empty displayed price, computed
        // regular price wins.
        let computed = json!({"price": {"displayValue": "", "regularPrice": {"value": 150, "currencyCode": "PLN"}}});
        assert_eq!(api_price(&computed, String::new()), "150 PLN");

        let default_currency = json!({"price": {"regularPrice": {"value": 99}}});
        assert_eq!(api_price(&default_currency, String::new()), "99 zł");

        let diverted_only = json!({"price": {}});
        assert_eq!(api_price(&diverted_only, "120 zł".to_string()), "120 zł");
    }

    #[test]
    fn zero_regular_price_falls_through_to_diverted() {
        let zeroed = json!({"price": {"regularPrice": {"value": 0, "currencyCode": "PLN"}}});
        assert_eq!(api_price(&zeroed, "1 500 zł".to_string()), "1 500 zł");

        let zeroed_float = json!({"price": {"regularPrice": {"value": 0.0}}});
        assert_eq!(api_price(&zeroed_float, String::new()), "");
    }

    #[test]
    fn api_parse_diverts_price_parameter() {
        let ad = json!({
            "id": 1052407977u64,
            "title": "Konsola",
            "description": "Stan idealny<br>Komplet kabli",
            "params": [
                {"name": "Cena", "value": {"label": "1 500 zł"}},
                {"name": "Stan", "value": "Używane"},
                {"key": "rodzaj", "normalizedValue": "stacjonarna", "value": {}}
            ],
            "photos": [{"link": "https://img.site/p;s={width}x{height};q=80.jpg"}],
            "location": {"pathName": "Kraków, Małopolskie"},
            "last_refresh_time": "2024-05-01T10:00:00+02:00",
            "contact": {"name": "Marek"},
            "user": {"created": "2019-03-01"},
            "url": "/d/oferta/konsola-ID1052407977.html"
        });
        let detail = parse_detail_from_api(&ad);

        assert_eq!(detail.id, "1052407977");
        assert_eq!(detail.price, "1 500 zł");
        assert!(!detail.parameters.contains_key("Cena"));
        assert_eq!(detail.parameters["Stan"], "Używane");
        assert_eq!(detail.parameters["rodzaj"], "stacjonarna");
        assert_eq!(detail.description, "Stan idealny\nKomplet kabli");
        assert_eq!(detail.photos, vec!["https://img.site/p.jpg"]);
        assert_eq!(detail.location, "Kraków, Małopolskie");
        assert_eq!(detail.posted_at, "2024-05-01T10:00:00+02:00");
        assert_eq!(detail.seller.name, "Marek");
        assert_eq!(detail.seller.member_since, "2019-03-01");
        assert_eq!(detail.url, "https://www.olx.pl/d/oferta/konsola-ID1052407977.html");
    }

    #[test]
    fn state_parse_uses_embedded_field_names() {
        let ad = json!({
            "id": 42,
            "title": "Rower",
            "price": {"regularPrice": {"value": "350", "currencyCode": "zł"}, "negotiation": true},
            "location": {"cityName": "Gdynia", "regionName": "Pomorskie"},
            "lastRefreshTime": "dzisiaj o 14:02",
            "photos": ["https://img.site/r;s=100x100.jpg"]
        });
        let detail = parse_detail_from_state(&ad, "https://www.olx.pl/d/oferta/rower-ID42.html");

        assert_eq!(detail.price, "350 zł");
        assert!(detail.negotiable);
        assert_eq!(detail.location, "Gdynia, Pomorskie");
        assert_eq!(detail.photos, vec!["https://img.site/r.jpg"]);
        assert_eq!(detail.url, "https://www.olx.pl/d/oferta/rower-ID42.html");
    }

    #[test]
    fn html_parse_recovers_fields_from_structural_attributes() {
        let html = r#"<html><body>
            <style>[data-testid="offer_title"] { font-size: 2em; }</style>
            <h1 data-testid="offer_title">Sofa narożna</h1>
            <div data-testid="ad-price-container"><h3>800 zł do negocjacji</h3></div>
            <div data-testid="ad_description">Wygodna, mało używana.</div>
            <div data-testid="ad-parameters-container">
                <p>Stan: Używane</p>
                <p>Kolor: Szary</p>
                <p>bez dwukropka</p>
            </div>
            <img data-testid="swiper-image" srcset="https://img.site/s1.jpg 1x, https://img.site/s2.jpg 2x">
            <img data-testid="swiper-image" src="https://img.site/s3.jpg">
            <span data-testid="ad-posted-at">28 sierpnia 2026</span>
            <h4 data-testid="user-profile-user-name">Anna</h4>
            <p data-testid="member-since">Na OLX od maj 2020</p>
        </body></html>"#;

        let detail = parse_detail_from_html(html, "https://www.olx.pl/d/oferta/sofa-IDabc123.html");

        assert_eq!(detail.id, "abc123");
        assert_eq!(detail.title, "Sofa narożna");
        assert_eq!(detail.price, "800 zł do negocjacji");
        assert!(detail.negotiable);
        assert_eq!(detail.description, "Wygodna, mało używana.");
        assert_eq!(detail.parameters.len(), 2);
        assert_eq!(detail.parameters["Stan"], "Używane");
        assert_eq!(detail.photos, vec!["https://img.site/s1.jpg", "https://img.site/s3.jpg"]);
        assert_eq!(detail.posted_at, "28 sierpnia 2026");
        assert_eq!(detail.seller.name, "Anna");
        assert_eq!(detail.seller.member_since, "Na OLX od maj 2020");
        assert!(detail.location.is_empty());
    }

    #[test]
    fn html_parse_negotiation_from_raw_flag() {
        let html = r#"<html><body>
            <h1 data-testid="offer_title">Lampa</h1>
            <div data-testid="ad-price-container">120 zł</div>
            <script>{"negotiation":true}</script>
        </body></html>"#;
        let detail = parse_detail_from_html(html, "https://www.olx.pl/d/oferta/lampa-ID9.html");
        assert!(detail.negotiable);
    }

    #[test]
    fn not_found_is_an_empty_title() {
        let detail = parse_detail_from_html("<html></html>", "https://www.olx.pl/");
        assert!(detail.title.is_empty());
        assert!(detail.id.is_empty());
    }

    #[test]
    fn page_parse_prefers_embedded_state() {
        let state = json!({"ad": {"ad": {"id": 7, "title": "Z osadzonego stanu"}}});
        let literal = serde_json::to_string(&state.to_string()).unwrap();
        let html = format!(
            r#"<html><script>window.__PRERENDERED_STATE__= {literal};
</script><h1 data-testid="offer_title">Z markupu</h1></html>"#
        );

        let detail = parse_detail_page(&html, "https://www.olx.pl/d/oferta/x-ID7.html");
        assert_eq!(detail.title, "Z osadzonego stanu");

        let markup_only = r#"<html><h1 data-testid="offer_title">Z markupu</h1></html>"#;
        let detail = parse_detail_page(markup_only, "https://www.olx.pl/d/oferta/x-ID7.html");
        assert_eq!(detail.title, "Z markupu");
    }

    #[test]
    fn param_value_precedence() {
        assert_eq!(param_value(&json!({"value": "plain"})), "plain");
        assert_eq!(param_value(&json!({"value": {"label": "labeled"}})), "labeled");
        assert_eq!(
            param_value(&json!({"value": {}, "normalizedValue": "normalized"})),
            "normalized"
        );
        assert_eq!(param_value(&json!({"value": 5})), "5");
    }
}
