use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::AgentResult;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetryPolicy;
use crate::sources::upstream::FetchJson;

/// No collection ever requests a page past this one.
pub const MAX_PAGES: u32 = 200;

/// One decoded page: its items in upstream order plus the declared total, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPage {
    pub items: Vec<Value>,
    pub total_declared: Option<u64>,
}

impl DatasetPage {
    /// Accepts a bare array, or an object with an `items` (or `data`) array and
    /// an optional `meta.perTotal`. Anything else is an empty page.
    pub fn from_body(body: Value) -> Self {
        let total_declared = body
            .get("meta")
            .and_then(|meta| meta.get("perTotal"))
            .and_then(Value::as_u64);

        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("items").or_else(|| map.remove("data")) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        Self { items, total_declared }
    }
}

/// Sequential page walker over a [`FetchJson`] source.
#[derive(Debug, Clone)]
pub struct Paginator<F> {
    fetcher: F,
    retry: RetryPolicy,
}

impl<F: FetchJson + Sync> Paginator<F> {
    pub fn new(fetcher: F, retry: RetryPolicy) -> Self {
        Self { fetcher, retry }
    }

    /// Collect every item of `path_template`, pages 1..=[`MAX_PAGES`].
    ///
    /// Stops on the first short page, once the accumulated count reaches the
    /// declared (or estimated) total, or at the page cap. The estimate used when
    /// upstream declares no total only keeps the loop going; it is never reported.
    pub async fn collect_all(&self, path_template: &str, page_size: usize, bearer_token: &str) -> AgentResult<Vec<Value>> {
        let metrics = get_metrics().await;
        let resource = resource_label(path_template);
        let page_size = page_size.max(1);
        let fetcher = &self.fetcher;

        let mut collected: Vec<Value> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let path = render_page_path(path_template, page, page_size);
            let path_ref = path.as_str();
            let body = self
                .retry
                .run_with_retry(move || fetcher.fetch_json(path_ref, bearer_token))
                .await?;
            metrics.pages_fetched.with_label_values(&[resource]).inc();

            let DatasetPage { items, total_declared } = DatasetPage::from_body(body);
            let returned = items.len();
            collected.extend(items);

            let total = match total_declared {
                Some(total) => total as usize,
                None if returned < page_size => collected.len(),
                None => collected.len() + page_size,
            };
            debug!(page, returned, accumulated = collected.len(), total, "page collected from {}", resource);

            if returned < page_size {
                break;
            }
            if collected.len() >= total {
                break;
            }
            if page >= MAX_PAGES {
                warn!("pagination for {} stopped at safety cap of {} pages", resource, MAX_PAGES);
                break;
            }
            page += 1;
        }

        info!("collected {} items from {} in {} pages", collected.len(), resource, page);
        Ok(collected)
    }
}

/// Substitute `{page}` / `{perPage}`, or append them as query parameters.
pub fn render_page_path(template: &str, page: u32, page_size: usize) -> String {
    if template.contains("{page}") || template.contains("{perPage}") {
        return template
            .replace("{page}", &page.to_string())
            .replace("{perPage}", &page_size.to_string());
    }
    let separator = if template.contains('?') { '&' } else { '?' };
    format!("{}{}page={}&perPage={}", template, separator, page, page_size)
}

fn resource_label(path_template: &str) -> &str {
    path_template
        .split('?')
        .next()
        .unwrap_or(path_template)
        .trim_matches('/')
}
