//! Headless-browser extraction for JS-heavy pages.
//!
//! Runtime-gated by `ENABLE_HEADLESS_BROWSER`; the pipeline only places this
//! strategy in the web plan when the flag is on and a Chromium-family
//! executable is discoverable. Image, font, and media requests are blocked
//! to keep renders cheap.

use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::network::{BlockPattern, SetBlockedUrLsParams};
use chromiumoxide::Browser;
use futures::StreamExt;
use scraper::{Html, Selector};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::error::AuditError;
use crate::core::types::{ContentFormat, SourceType};
use crate::extract::web::MetadataOnly;
use crate::extract::{ExtractCtx, Extraction, Extractor};

const RENDER_SETTLE_MS: u64 = 2_500;

/// URL patterns blocked during rendering.
const BLOCKED_RESOURCE_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.woff", "*.woff2", "*.ttf",
    "*.otf", "*.mp4", "*.webm", "*.mp3", "*.m4a", "*.avi",
];

/// Elements removed from the rendered DOM before text is read.
const STRIP_SCRIPT: &str = r#"
(function() {
    var selectors = [
        'script', 'style', 'nav', 'header', 'footer', 'aside',
        '.advert', '.ad', '.ads', '.sponsored', '.newsletter',
        '.cookie', '.banner'
    ];
    var removed = 0;
    selectors.forEach(function(sel) {
        document.querySelectorAll(sel).forEach(function(el) {
            if (el.parentNode) { el.parentNode.removeChild(el); removed++; }
        });
    });
    return removed;
})();
"#;

const BLOCK_MARKERS: &[&str] = &[
    "403 forbidden",
    "access denied",
    "verify you are a human",
    "checking your browser",
];

/// Find a usable Chromium-family browser executable: explicit env override
/// first, then a PATH scan.
pub fn find_browser_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }
    for exe in [
        "google-chrome",
        "chromium",
        "chromium-browser",
        "chrome",
        "brave-browser",
    ] {
        if let Ok(found) = which::which(exe) {
            return Some(found.to_string_lossy().to_string());
        }
    }
    None
}

fn build_config(exe: &str) -> Result<BrowserConfig, AuditError> {
    BrowserConfig::builder()
        .chrome_executable(exe)
        .window_size(1280, 900)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .arg("--blink-settings=imagesEnabled=false")
        .build()
        .map_err(|e| AuditError::FetchNetwork(format!("browser config: {e}")))
}

fn container_text(html: &str) -> String {
    let document = Html::parse_document(html);
    for sel_str in ["article", "main", "[role=main]", "#content", ".content", "body"] {
        if let Ok(sel) = Selector::parse(sel_str) {
            if let Some(element) = document.select(&sel).next() {
                let text = element
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.split_whitespace().count() > 30 {
                    return text;
                }
            }
        }
    }
    String::new()
}

fn looks_blocked(html: &str) -> bool {
    let head: String = html.chars().take(4_000).collect::<String>().to_lowercase();
    BLOCK_MARKERS.iter().any(|m| head.contains(m))
}

pub struct HeadlessBrowser;

#[async_trait]
impl Extractor for HeadlessBrowser {
    fn name(&self) -> &'static str {
        "headless_browser"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(90)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let url = ctx.require_url()?.clone();
        let exe = find_browser_executable().ok_or_else(|| {
            AuditError::FetchNetwork(
                "no Chromium-family browser found; set CHROME_EXECUTABLE".to_string(),
            )
        })?;

        info!(url = %url, browser = %exe, "rendering with headless browser");

        let config = build_config(&exe)?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AuditError::FetchNetwork(format!("browser launch: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!("browser handler error: {e}");
                }
            }
        });

        let cancel = ctx.cancel.clone();
        let render = async {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| AuditError::FetchNetwork(format!("browser page: {e}")))?;

            page.execute(
                SetBlockedUrLsParams::builder()
                    .url_patterns(
                        BLOCKED_RESOURCE_PATTERNS
                            .iter()
                            .map(|p| BlockPattern::new(*p, true))
                            .collect::<Vec<_>>(),
                    )
                    .build(),
            )
            .await
            .ok(); // best-effort; rendering still works without blocking

            page.goto(url.as_str())
                .await
                .map_err(|e| AuditError::FetchNetwork(format!("browser navigation: {e}")))?;

            tokio::time::sleep(Duration::from_millis(RENDER_SETTLE_MS)).await;

            if let Err(e) = page.evaluate(STRIP_SCRIPT).await {
                warn!("noise-strip script failed (non-fatal): {e}");
            }

            page.content()
                .await
                .map_err(|e| AuditError::FetchNetwork(format!("browser content: {e}")))
        };

        let html = tokio::select! {
            res = render => res,
            _ = cancel.cancelled() => Err(AuditError::Cancelled),
        };

        browser.close().await.ok();
        handler_task.abort();
        let html = html?;

        if looks_blocked(&html) {
            // Blocked navigation: degrade to whatever metadata the rendered
            // document still carries before giving up.
            if let Some(meta) = MetadataOnly::from_html(&html) {
                warn!(url = %url, "render blocked; falling back to in-browser metadata");
                let mut extraction = Extraction::new(
                    meta,
                    "headless_browser_metadata",
                    SourceType::Blog,
                    ContentFormat::Article,
                );
                extraction.metadata_only = true;
                return Ok(extraction);
            }
            return Err(AuditError::FetchHttp { status: 403 });
        }

        let text = container_text(&html);
        if text.trim().is_empty() {
            return Err(AuditError::FetchNetwork(
                "rendered page had no readable container text".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_text_prefers_article() {
        let html = r#"<html><body>
            <div class="ads">buy buy buy</div>
            <article>
            Paragraph one of the advertisement copy describing the product and the claims it makes to potential buyers.
            Paragraph two continues with pricing information and further persuasive statements about expected results.
            Paragraph three adds closing remarks summarizing the overall pitch for readers who made it this far.
            </article></body></html>"#;
        let text = container_text(html);
        assert!(text.contains("Paragraph one"));
        assert!(!text.contains("buy buy buy"));
    }

    #[test]
    fn block_markers_detected() {
        assert!(looks_blocked("<html><title>403 Forbidden</title></html>"));
        assert!(looks_blocked("<html>Checking your browser before accessing</html>"));
        assert!(!looks_blocked("<html><title>Product page</title></html>"));
    }
}
