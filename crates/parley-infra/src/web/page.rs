//! Fetch a web page and reduce it to readable text.

use async_trait::async_trait;

use parley_core::command::{BoundArgs, Capability};
use parley_core::context::ConversationContext;
use parley_types::command::{ArgKind, ArgSpec};
use parley_types::error::CapabilityError;

/// Elements whose text content counts as page content.
const CONTENT_SELECTOR: &str = "title, h1, h2, h3, h4, h5, h6, p, li, blockquote, pre";

/// `read_website`: download a page and hand its text content to the model.
///
/// Download failures are a normal outcome here, not a capability failure.
/// The model asked for a concrete page; "couldn't read it" is a legitimate
/// answer it can act on.
pub struct ReadWebsite {
    http: reqwest::Client,
}

impl ReadWebsite {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn unreadable(url: &str) -> String {
        format!("Could not read the website `{url}`. This is likely a permanent error.")
    }
}

#[async_trait]
impl Capability for ReadWebsite {
    fn name(&self) -> &'static str {
        "read_website"
    }

    fn description(&self) -> &'static str {
        "Reads the text content of a website"
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required(
            "url",
            ArgKind::String,
            "full URL of the website to read",
        )]
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        _ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let url = args.str("url")?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Ok(Self::unreadable(url));
        }

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url, error = %err, "website fetch failed");
                return Ok(Self::unreadable(url));
            }
        };
        if !response.status().is_success() {
            tracing::warn!(url, status = response.status().as_u16(), "website fetch failed");
            return Ok(Self::unreadable(url));
        }
        let html = match response.text().await {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(url, error = %err, "website body unreadable");
                return Ok(Self::unreadable(url));
            }
        };

        let content = extract_text(&html).map_err(CapabilityError::Internal)?;
        let content = if content.is_empty() {
            "no content".to_string()
        } else {
            content
        };
        Ok(format!(
            "----BEGIN WEBSITE `{url}`---- \n{content}\n----END WEBSITE `{url}` ---- \n"
        ))
    }
}

/// Pull the readable text out of an HTML document, one line per content
/// element, skipping scripts, styles and markup-only elements.
pub fn extract_text(html: &str) -> Result<String, String> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse(CONTENT_SELECTOR)
        .map_err(|err| format!("invalid content selector: {err}"))?;

    let mut lines = Vec::new();
    for element in document.select(&selector) {
        let text = element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            lines.push(text);
        }
    }
    // Nested content elements repeat their parents' text
    lines.dedup();
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_is_extracted_in_document_order() {
        let html = r#"
            <html><head><title>Greeting</title>
            <script>var x = "never shown";</script>
            <style>body { color: red; }</style></head>
            <body><h1>Hello</h1><p>First   paragraph.</p>
            <ul><li>one</li><li>two</li></ul></body></html>"#;
        let text = extract_text(html).unwrap();
        assert_eq!(text, "Greeting\nHello\nFirst paragraph.\none\ntwo");
    }

    #[test]
    fn test_script_and_style_are_skipped() {
        let html = "<script>alert(1)</script><style>p{}</style>";
        assert_eq!(extract_text(html).unwrap(), "");
    }

    #[test]
    fn test_empty_document_extracts_nothing() {
        assert_eq!(extract_text("").unwrap(), "");
    }
}
