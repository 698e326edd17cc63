//! Web-facing capabilities: search, page reading, news.
//!
//! These carry their own outbound HTTP and are registered on top of the
//! built-in command set. They fail soft: a network problem becomes a
//! capability failure with a model-safe reply, never a crash.

pub mod news;
pub mod page;
pub mod search;

use std::sync::Arc;

use parley_core::command::CommandRegistry;

pub use news::NewsApi;
pub use page::ReadWebsite;
pub use search::SearchWeb;

/// Browser-like user agent for sites that reject the default one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/89.0.4389.82 Safari/537.36";

/// Build the HTTP client the web capabilities share.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(30))
        .build()
}

/// Register the web capabilities in catalogue order.
pub fn register_web(
    registry: &mut CommandRegistry,
    http: reqwest::Client,
    newsapi_key: Option<String>,
) {
    registry.register(Arc::new(SearchWeb::new(http.clone())));
    registry.register(Arc::new(ReadWebsite::new(http.clone())));
    registry.register(Arc::new(NewsApi::new(http, newsapi_key)));
}
