//! Category discovery from the landing page. A single direct-markup
//! parse; the dual-path machinery is not needed here.

use scraper::{Html, Selector};

use olx_common::{Category, ScrapeError};

use crate::fetcher::PageFetcher;
use crate::markup::text_of;
use crate::{absolutize, BASE_URL};

pub async fn fetch_categories(fetcher: &dyn PageFetcher) -> Result<Vec<Category>, ScrapeError> {
    let html = fetcher.retrieve(&format!("{BASE_URL}/")).await?;
    Ok(parse_categories(&html))
}

pub fn parse_categories(html: &str) -> Vec<Category> {
    let document = Html::parse_document(html);
    let anchor_sel = Selector::parse(r#"a[data-testid^="cat-"]"#).unwrap();
    let name_sel = Selector::parse("p").unwrap();

    let mut categories = Vec::new();
    for anchor in document.select(&anchor_sel) {
        let href = anchor.attr("href").unwrap_or_default();

        let name = anchor
            .select(&name_sel)
            .next()
            .map(text_of)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| text_of(anchor));

        let slug = href.trim_start_matches('/').trim_end_matches('/').to_string();
        if name.is_empty() || slug.is_empty() {
            continue;
        }

        categories.push(Category {
            name,
            slug,
            url: absolutize(href),
        });
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_category_anchors() {
        let html = r#"<html><body>
            <a data-testid="cat-99" href="/elektronika/"><p>Elektronika</p></a>
            <a data-testid="cat-12" href="/motoryzacja/">Motoryzacja</a>
            <div data-testid="cat-77">not an anchor</div>
        </body></html>"#;

        let categories = parse_categories(html);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Elektronika");
        assert_eq!(categories[0].slug, "elektronika");
        assert_eq!(categories[0].url, "https://www.olx.pl/elektronika/");
        assert_eq!(categories[1].name, "Motoryzacja");
    }

    #[test]
    fn skips_entries_missing_name_or_slug() {
        let html = r#"<html><body>
            <a data-testid="cat-1" href="/"><p>Strona główna</p></a>
            <a data-testid="cat-2" href="/dom-ogrod/"><p></p></a>
        </body></html>"#;
        assert!(parse_categories(html).is_empty());
    }

    #[test]
    fn keeps_absolute_hrefs() {
        let html = r#"<a data-testid="cat-3" href="https://www.olx.pl/zwierzeta/"><p>Zwierzęta</p></a>"#;
        let categories = parse_categories(html);
        assert_eq!(categories[0].url, "https://www.olx.pl/zwierzeta/");
    }
}
