//! Web page extraction strategies: remote reader proxy, local readability,
//! and the metadata-only last resort.

use async_trait::async_trait;
use readability::extractor;
use scraper::{Html, Selector};
use select::document::Document as SelectDoc;
use select::predicate::{Class as SelClass, Name as SelName};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::core::error::AuditError;
use crate::core::types::{ContentFormat, SourceType};
use crate::extract::{ExtractCtx, Extraction, Extractor};

/// Container classes tried when readability comes back thin.
const CONTENT_CLASSES: &[&str] = &["post-content", "entry-content", "content", "main-content"];

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

// ---------------------------------------------------------------------------
// ReaderProxy
// ---------------------------------------------------------------------------

/// Fetches a remote plaintext rendering of the page. Cheapest strategy, so
/// it runs first for web pages.
pub struct ReaderProxy;

#[async_trait]
impl Extractor for ReaderProxy {
    fn name(&self) -> &'static str {
        "reader_proxy"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(70)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let url = ctx.require_url()?;
        let base = ctx.services.config.reader_proxy_base.trim_end_matches('/');
        let proxied = format!("{base}/{url}");

        let body = ctx.fetcher().get(&proxied, &ctx.cancel).await?;
        let text = body.text();
        if text.trim().is_empty() {
            return Err(AuditError::FetchNetwork(
                "reader proxy returned an empty body".to_string(),
            ));
        }

        Ok(Extraction::new(
            text,
            self.name(),
            SourceType::Blog,
            ContentFormat::Article,
        ))
    }
}

// ---------------------------------------------------------------------------
// ReadabilityLocal
// ---------------------------------------------------------------------------

/// Fetches the page and extracts the main article body locally: a
/// readability pass first, then container selectors, keeping whichever
/// yields more words.
pub struct ReadabilityLocal;

impl ReadabilityLocal {
    fn readability_pass(html: &str, base: &Url) -> String {
        match extractor::extract(&mut html.as_bytes(), base) {
            Ok(product) => html2md::parse_html(&product.content),
            Err(e) => {
                warn!("readability extraction failed: {e}, falling back to selectors");
                String::new()
            }
        }
    }

    fn selector_pass(html: &str) -> String {
        let doc = SelectDoc::from(html);
        let mut best_text = String::new();
        let mut best_words = 0usize;

        let mut consider = |inner_html: String| {
            let text = html2md::parse_html(&inner_html);
            let words = count_words(&text);
            if words > best_words {
                best_words = words;
                best_text = text;
            }
        };

        for node in doc.find(SelName("article")) {
            consider(node.inner_html());
        }
        for class in CONTENT_CLASSES {
            for node in doc.find(SelClass(*class)) {
                consider(node.inner_html());
            }
        }

        best_text
    }
}

#[async_trait]
impl Extractor for ReadabilityLocal {
    fn name(&self) -> &'static str {
        "readability"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(70)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let url = ctx.require_url()?.clone();
        let body = ctx.fetcher().get(url.as_str(), &ctx.cancel).await?;
        if !body.is_html() {
            return Err(AuditError::FetchNetwork(format!(
                "expected HTML, got '{}'",
                body.mime
            )));
        }
        let html = body.text();

        let readable = Self::readability_pass(&html, &url);
        let selected = Self::selector_pass(&html);

        let (text, variant) = if count_words(&selected) > count_words(&readable) + 20 {
            (selected, "selectors")
        } else if !readable.trim().is_empty() {
            (readable, "readability")
        } else if !selected.trim().is_empty() {
            (selected, "selectors")
        } else {
            return Err(AuditError::FetchNetwork(
                "no article body found".to_string(),
            ));
        };
        info!(variant, words = count_words(&text), "local extraction chose pass");

        Ok(Extraction::new(
            text,
            self.name(),
            SourceType::Blog,
            ContentFormat::Article,
        ))
    }
}

// ---------------------------------------------------------------------------
// MetadataOnly
// ---------------------------------------------------------------------------

/// Last-resort degradation: page `<meta>` tags only. When even the fetch is
/// blocked, a minimal title is synthesized from the URL so the audit can
/// still proceed on a best-effort basis.
pub struct MetadataOnly;

impl MetadataOnly {
    pub(crate) fn from_html(html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| document.select(&sel).next())
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| {
                Selector::parse("meta[property=\"og:title\"]")
                    .ok()
                    .and_then(|sel| document.select(&sel).next())
                    .and_then(|el| el.value().attr("content"))
                    .map(|s| s.trim().to_string())
                    .filter(|t| !t.is_empty())
            })?;

        let description = Selector::parse("meta[name=\"description\"]")
            .ok()
            .and_then(|sel| document.select(&sel).next())
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .or_else(|| {
                Selector::parse("meta[property=\"og:description\"]")
                    .ok()
                    .and_then(|sel| document.select(&sel).next())
                    .and_then(|el| el.value().attr("content"))
                    .map(|s| s.trim().to_string())
            })
            .unwrap_or_default();

        Some(format!("Title: {title}; Description: {description}"))
    }

    fn from_url(url: &Url) -> String {
        let slug = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
            .replace(['-', '_'], " ");
        let title = if slug.trim().is_empty() {
            url.host_str().unwrap_or("page").to_string()
        } else {
            slug
        };
        format!(
            "Title: {title}; Description: {}",
            url.host_str().unwrap_or("")
        )
    }
}

#[async_trait]
impl Extractor for MetadataOnly {
    fn name(&self) -> &'static str {
        "metadata_only"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(70)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let url = ctx.require_url()?.clone();

        let text = match ctx.fetcher().get(url.as_str(), &ctx.cancel).await {
            Ok(body) if body.is_html() => {
                Self::from_html(&body.text()).unwrap_or_else(|| Self::from_url(&url))
            }
            Ok(_) => Self::from_url(&url),
            Err(AuditError::Cancelled) => return Err(AuditError::Cancelled),
            Err(e) => {
                warn!("metadata fetch failed ({e}), synthesizing from URL");
                Self::from_url(&url)
            }
        };

        let mut extraction = Extraction::new(
            text,
            self.name(),
            SourceType::Blog,
            ContentFormat::Article,
        );
        extraction.metadata_only = true;
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_from_html_prefers_title_tag() {
        let html = r#"<html><head><title>MiracleTonic — Official</title>
            <meta name="description" content="Cures everything fast"></head><body></body></html>"#;
        let text = MetadataOnly::from_html(html).unwrap();
        assert_eq!(
            text,
            "Title: MiracleTonic — Official; Description: Cures everything fast"
        );
    }

    #[test]
    fn metadata_from_url_uses_slug() {
        let url = Url::parse("https://ads.example.com/products/miracle-tonic-launch").unwrap();
        let text = MetadataOnly::from_url(&url);
        assert!(text.starts_with("Title: miracle tonic launch"));
        assert!(text.contains("ads.example.com"));
    }

    #[test]
    fn selector_pass_finds_article_body() {
        let html = r#"<html><body>
            <nav>Home About Contact</nav>
            <article><p>The tonic advertisement makes strong recovery claims that need review by the compliance team.</p></article>
            </body></html>"#;
        let text = ReadabilityLocal::selector_pass(html);
        assert!(text.contains("strong recovery claims"));
        assert!(!text.contains("Home About"));
    }
}
