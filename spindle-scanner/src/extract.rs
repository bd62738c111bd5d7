use crate::result::PageRecord;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Builds a [`PageRecord`] from raw markup.
///
/// Never fails: anything that cannot be found or resolved is left empty.
pub fn extract_page_data(html: &str, page_url: &str) -> PageRecord {
    let document = Html::parse_document(html);
    let base = resolution_base(&document, page_url);

    PageRecord {
        url: page_url.to_string(),
        h1: first_h1(&document),
        first_paragraph: first_paragraph(&document),
        outgoing_links: resolve_attr(&document, "a[href]", "href", base.as_ref()),
        image_urls: resolve_attr(&document, "img[src]", "src", base.as_ref()),
    }
}

pub fn get_h1_from_html(html: &str) -> String {
    first_h1(&Html::parse_document(html))
}

pub fn get_first_paragraph_from_html(html: &str) -> String {
    first_paragraph(&Html::parse_document(html))
}

pub fn get_urls_from_html(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = resolution_base(&document, page_url);
    resolve_attr(&document, "a[href]", "href", base.as_ref())
}

pub fn get_images_from_html(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = resolution_base(&document, page_url);
    resolve_attr(&document, "img[src]", "src", base.as_ref())
}

fn first_h1(document: &Html) -> String {
    let Ok(selector) = Selector::parse("h1") else {
        return String::new();
    };
    let heading = document.select(&selector).next();
    heading.map(element_text).unwrap_or_default()
}

fn first_paragraph(document: &Html) -> String {
    let (Ok(main_selector), Ok(p_selector)) = (Selector::parse("main"), Selector::parse("p"))
    else {
        return String::new();
    };

    let in_main = document
        .select(&main_selector)
        .next()
        .and_then(|main| main.select(&p_selector).next());

    let paragraph = in_main.or_else(|| document.select(&p_selector).next());
    paragraph.map(element_text).unwrap_or_default()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The page address, or the first `<base href>` resolved against it.
fn resolution_base(document: &Html, page_url: &str) -> Option<Url> {
    let page = Url::parse(page_url).ok()?;

    let declared = match Selector::parse("base[href]") {
        Ok(selector) => {
            let href = document
                .select(&selector)
                .next()
                .and_then(|base| base.value().attr("href"));
            href.and_then(|href| page.join(href.trim()).ok())
        }
        Err(_) => None,
    };

    Some(declared.unwrap_or(page))
}

fn resolve_attr(document: &Html, css: &str, attr: &str, base: Option<&Url>) -> Vec<String> {
    let (Some(base), Ok(selector)) = (base, Selector::parse(css)) else {
        return Vec::new();
    };

    let resolved: Vec<String> = document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .filter_map(|value| base.join(value.trim()).ok())
        .map(|url| url.to_string())
        .collect();
    resolved
}
