use scraper::{ElementRef, Html};

use crate::sources::{RowSkip, first_text, select_with_fallback, selector};

const PULSE_FOOTBALL_URL: &str = "https://www.pulsesports.co.ke/football";
const PULSE_ORIGIN: &str = "https://www.pulsesports.co.ke";
const CARD_SELECTORS: &[&str] = &["article", "div.c-article-card"];
pub const PULSE_SUMMARY: &str = "Click to read full story on Pulse Sports.";

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArticle {
    pub title: String,
    pub url: String,
    pub image_url: Option<String>,
}

/// Pulse Sports Kenya football headlines.
pub struct PulseNews;

impl PulseNews {
    pub fn name(&self) -> &'static str {
        "Pulse Sports"
    }

    pub fn url(&self) -> &'static str {
        PULSE_FOOTBALL_URL
    }

    pub fn summary(&self) -> &'static str {
        PULSE_SUMMARY
    }

    pub fn extract(&self, html: &str) -> Vec<Result<ExtractedArticle, RowSkip>> {
        let document = Html::parse_document(html);
        select_with_fallback(&document, CARD_SELECTORS)
            .iter()
            .map(parse_card)
            .collect()
    }
}

fn parse_card(card: &ElementRef<'_>) -> Result<ExtractedArticle, RowSkip> {
    let href = selector("a[href]")
        .and_then(|sel| card.select(&sel).next())
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .ok_or(RowSkip::MissingLink)?;
    let title = first_text(card, "h1, h2, h3").ok_or(RowSkip::MissingTitle)?;

    // Lazy-loaded images keep the real URL in data-src.
    let image_url = selector("img").and_then(|sel| card.select(&sel).next()).and_then(|img| {
        let attrs = img.value();
        attrs
            .attr("data-src")
            .or_else(|| attrs.attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(str::to_string)
    });

    Ok(ExtractedArticle {
        title,
        url: absolutize(href),
        image_url,
    })
}

fn absolutize(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{PULSE_ORIGIN}{href}")
    } else {
        format!("{PULSE_ORIGIN}/{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::absolutize;

    #[test]
    fn relative_links_get_site_origin() {
        assert_eq!(
            absolutize("/football/story/abc"),
            "https://www.pulsesports.co.ke/football/story/abc"
        );
        assert_eq!(
            absolutize("football/x"),
            "https://www.pulsesports.co.ke/football/x"
        );
        assert_eq!(absolutize("https://other.example/a"), "https://other.example/a");
    }
}
