//! Web search through the DuckDuckGo HTML endpoint.

use async_trait::async_trait;

use parley_core::command::{BoundArgs, Capability};
use parley_core::context::ConversationContext;
use parley_types::command::{ArgKind, ArgSpec};
use parley_types::error::CapabilityError;

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const SEARCH_UNAVAILABLE: &str = "Sorry, I can't search the web at the moment.";

/// `search_web`: query DuckDuckGo and hand the result list to the model.
pub struct SearchWeb {
    http: reqwest::Client,
}

impl SearchWeb {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Capability for SearchWeb {
    fn name(&self) -> &'static str {
        "search_web"
    }

    fn description(&self) -> &'static str {
        "Searches the web and returns a list of results"
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![
            ArgSpec::required("search_query", ArgKind::String, "the query to search for"),
            ArgSpec::optional(
                "language",
                ArgKind::String,
                "two-letter language code for the results",
            ),
        ]
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let query = args.str("search_query")?;
        let unavailable = |detail: String| CapabilityError::Failed {
            reply: SEARCH_UNAVAILABLE.to_string(),
            detail,
        };

        let mut form = vec![("q", query.to_string())];
        if let Some(language) = args.opt_str("language") {
            // DuckDuckGo regions look like `en-en`
            form.push(("kl", format!("{language}-{language}")));
        }

        let response = self
            .http
            .post(DDG_HTML_URL)
            .form(&form)
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("search endpoint answered {status}")));
        }
        let html = response
            .text()
            .await
            .map_err(|err| unavailable(err.to_string()))?;

        let hits = parse_results(&html, ctx.settings.search_results as usize)
            .map_err(CapabilityError::Internal)?;
        if hits.is_empty() {
            return Ok(format!("No results found for search query `{query}`."));
        }
        Ok(render_results(&hits))
    }
}

/// One search result as extracted from the HTML result page.
#[derive(Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub description: String,
}

/// Extract up to `limit` results from a DuckDuckGo HTML result page.
pub fn parse_results(html: &str, limit: usize) -> Result<Vec<SearchHit>, String> {
    let document = scraper::Html::parse_document(html);
    let result_selector = scraper::Selector::parse(".result")
        .map_err(|err| format!("invalid result selector: {err}"))?;
    let link_selector = scraper::Selector::parse(".result__a")
        .map_err(|err| format!("invalid link selector: {err}"))?;
    let snippet_selector = scraper::Selector::parse(".result__snippet")
        .map_err(|err| format!("invalid snippet selector: {err}"))?;

    let mut hits = Vec::new();
    for element in document.select(&result_selector).take(limit) {
        let Some(link) = element.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let description = element
            .select(&snippet_selector)
            .next()
            .map(|snippet| collapse_whitespace(&snippet.text().collect::<String>()))
            .unwrap_or_default();
        hits.push(SearchHit {
            url: resolve_href(href),
            description,
        });
    }
    Ok(hits)
}

/// DuckDuckGo wraps targets in a redirect of the form
/// `//duckduckgo.com/l/?uddg=<percent-encoded url>&rut=...`.
fn resolve_href(href: &str) -> String {
    if let Some(start) = href.find("uddg=") {
        let encoded = &href[start + "uddg=".len()..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{rest}");
    }
    href.to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_results(hits: &[SearchHit]) -> String {
    let mut out = String::from("--- BEGIN SEARCH RESULTS ---\n");
    for (index, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "- Result: {}: {}: ({})\n",
            index + 1,
            hit.url,
            hit.description
        ));
    }
    out.push_str("--- END SEARCH RESULTS ---");
    out
}
