//! News headlines through the NewsAPI `everything` endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use parley_core::command::{BoundArgs, Capability};
use parley_core::context::ConversationContext;
use parley_types::command::{ArgKind, ArgSpec};
use parley_types::error::CapabilityError;

const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";
const PAGE_SIZE: u32 = 15;

/// `news_api`: fetch recent articles matching a query.
///
/// Requires a NewsAPI key; without one the capability stays registered but
/// every invocation fails with an explanation the model can relay.
pub struct NewsApi {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl NewsApi {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    fn fetch_error(detail: impl Into<String>) -> CapabilityError {
        let detail = detail.into();
        CapabilityError::Failed {
            reply: format!("Error fetching news articles: {detail}"),
            detail,
        }
    }
}

#[async_trait]
impl Capability for NewsApi {
    fn name(&self) -> &'static str {
        "news_api"
    }

    fn description(&self) -> &'static str {
        "Fetches recent news articles for a search query"
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![
            ArgSpec::required("query", ArgKind::String, "the topic to fetch news for"),
            ArgSpec::optional("page", ArgKind::Integer, "result page, starting at 1"),
            ArgSpec::optional(
                "language",
                ArgKind::String,
                "two-letter language code, defaults to en",
            ),
        ]
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        _ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let query = args.str("query")?;
        let page = args.opt_int("page").unwrap_or(1).max(1);
        let language = args.opt_str("language").unwrap_or("en");
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Self::fetch_error("no NewsAPI key configured"));
        };

        let response = self
            .http
            .get(NEWSAPI_URL)
            .query(&[
                ("q", query),
                ("sortBy", "publishedAt"),
                ("language", language),
                ("pageSize", &PAGE_SIZE.to_string()),
                ("page", &page.to_string()),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .map_err(|err| Self::fetch_error(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::fetch_error(format!(
                "news endpoint answered {status}"
            )));
        }
        let envelope: NewsEnvelope = response
            .json()
            .await
            .map_err(|err| Self::fetch_error(err.to_string()))?;

        if envelope.articles.is_empty() {
            return Ok(format!(
                "No news articles found for query `{query}` using news_api."
            ));
        }
        Ok(render_articles(&envelope.articles))
    }
}

#[derive(Debug, Deserialize)]
struct NewsEnvelope {
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: String,
    source: Source,
    published_at: DateTime<Utc>,
    url: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Source {
    name: String,
}

fn render_articles(articles: &[Article]) -> String {
    let mut out = String::new();
    for article in articles {
        let summary = article.description.as_deref().unwrap_or("");
        out.push_str(&format!(
            "- {}: Title: `{}` (Source: `{}`)\nDescription: `{}`\nURL: `{}`\n",
            article.published_at.format("%Y-%m-%d"),
            article.title,
            article.source.name,
            summary,
            article.url
        ));
    }
    out
}
