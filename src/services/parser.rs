//! HTML extraction for catalog pages.
//!
//! One parser instance holds every CSS selector precompiled. All methods
//! are synchronous; documents are parsed and dropped inside each call.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::ParsedBook;
use crate::utils::resolve_url;

/// Placeholder stored when a detail page carries no description block.
const NO_DESCRIPTION: &str = "No description";

/// Extracts book fields and navigation links from fetched pages.
pub struct PageParser {
    site_root: String,
    title: Selector,
    category: Selector,
    description: Selector,
    price_excl: Selector,
    price_incl: Selector,
    stock: Selector,
    reviews: Selector,
    gallery_image: Selector,
    star_rating: Selector,
    book_anchors: Selector,
    category_anchors: Selector,
    next_anchor: Selector,
    stock_count: Regex,
}

impl PageParser {
    /// Compile the selector set for a site rooted at `site_root`.
    pub fn new(site_root: impl Into<String>) -> Result<Self> {
        Ok(Self {
            site_root: site_root.into(),
            title: Self::parse_selector("h1")?,
            category: Self::parse_selector(".breadcrumb li:nth-last-child(2) a")?,
            description: Self::parse_selector("#product_description + p")?,
            price_excl: Self::parse_selector(".table-striped tr:nth-child(3) td")?,
            price_incl: Self::parse_selector(".table-striped tr:nth-child(4) td")?,
            stock: Self::parse_selector(".table-striped tr:nth-child(6) td")?,
            reviews: Self::parse_selector(".table-striped tr:nth-child(7) td")?,
            gallery_image: Self::parse_selector("#product_gallery img")?,
            star_rating: Self::parse_selector(".star-rating")?,
            book_anchors: Self::parse_selector("h3 a")?,
            category_anchors: Self::parse_selector(".side_categories ul ul li a")?,
            next_anchor: Self::parse_selector("li.next a")?,
            stock_count: Regex::new(r"\d+").expect("digit pattern is valid"),
        })
    }

    /// Extract all book fields from a detail page.
    ///
    /// A missing required element or a non-numeric price/review value is a
    /// parse error carrying the page URL. Description, image and rating
    /// degrade to their documented defaults instead of failing.
    pub fn parse_book(&self, html: &str, url: &str) -> Result<ParsedBook> {
        let document = Html::parse_document(html);

        let title = self.required_text(&document, &self.title, url, "title")?;
        let category = self.required_text(&document, &self.category, url, "category")?;
        let description = document
            .select(&self.description)
            .next()
            .map(element_text)
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        let price_excl_tax = self.parse_price(&document, &self.price_excl, url, "price_excl_tax")?;
        let price_incl_tax = self.parse_price(&document, &self.price_incl, url, "price_incl_tax")?;

        let stock_text = self.required_text(&document, &self.stock, url, "availability")?;
        let availability = self
            .stock_count
            .find(&stock_text)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0);

        let reviews_text = self.required_text(&document, &self.reviews, url, "review count")?;
        let review_count = reviews_text.parse::<u32>().map_err(|_| {
            AppError::parse(url, format!("review count is not a number: '{reviews_text}'"))
        })?;

        let image_url = document
            .select(&self.gallery_image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| resolve_url(src, url, &self.site_root))
            .unwrap_or_default();

        let rating = document
            .select(&self.star_rating)
            .next()
            .map(rating_from_classes)
            .unwrap_or(0);

        Ok(ParsedBook {
            url: url.to_string(),
            title,
            category,
            description,
            price_incl_tax,
            price_excl_tax,
            availability,
            review_count,
            image_url,
            rating,
        })
    }

    /// Absolute URLs of every book link on a listing page.
    pub fn book_links(&self, html: &str, current_url: &str) -> Vec<String> {
        self.collect_links(html, current_url, &self.book_anchors)
    }

    /// Absolute URLs of every category link on the index page.
    pub fn category_links(&self, html: &str, current_url: &str) -> Vec<String> {
        self.collect_links(html, current_url, &self.category_anchors)
    }

    /// Absolute URL of the next listing page, if the pager has one.
    pub fn next_page(&self, html: &str, current_url: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.next_anchor)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_url(href, current_url, &self.site_root))
    }

    fn collect_links(&self, html: &str, current_url: &str, selector: &Selector) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve_url(href, current_url, &self.site_root))
            .collect()
    }

    fn required_text(
        &self,
        document: &Html,
        selector: &Selector,
        url: &str,
        field: &str,
    ) -> Result<String> {
        document
            .select(selector)
            .next()
            .map(element_text)
            .ok_or_else(|| AppError::parse(url, format!("missing {field}")))
    }

    fn parse_price(
        &self,
        document: &Html,
        selector: &Selector,
        url: &str,
        field: &str,
    ) -> Result<f64> {
        let text = self.required_text(document, selector, url, field)?;
        // Drop the leading currency symbol, whatever it is.
        let numeric: String = text.chars().skip(1).collect();
        numeric
            .parse::<f64>()
            .map_err(|_| AppError::parse(url, format!("{field} is not numeric: '{text}'")))
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Map the star-rating class vocabulary to a numeric rating.
fn rating_from_classes(element: ElementRef<'_>) -> u8 {
    element
        .value()
        .classes()
        .find_map(|class| match class.to_lowercase().as_str() {
            "one" => Some(1),
            "two" => Some(2),
            "three" => Some(3),
            "four" => Some(4),
            "five" => Some(5),
            _ => None,
        })
        .unwrap_or(0)
}
