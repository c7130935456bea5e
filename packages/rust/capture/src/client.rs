//! HTTP registry client.
//!
//! Submits the product name to the registry search endpoint, follows the
//! first result row's link and extracts the detail page's visible text.
//! Every way this can come up empty (transport error, timeout, non-success
//! status, no row, no link, blank page) is reported as `NotFound`.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use regreview_shared::{RawEvidence, RegistryConfig, Result, ReviewError};

use crate::text::{page_title, visible_text};
use crate::{CaptureOptions, CaptureReport, EvidenceOutcome, PageSnapshot, RegistrySource};

/// User-Agent string for registry requests.
const USER_AGENT: &str = concat!("regreview/", env!("CARGO_PKG_VERSION"));

/// Registry search client configured from `[registry]`.
pub struct RegistryClient {
    client: Client,
    search_url: Url,
    search_param: String,
    row_selector: Selector,
    link_selector: Selector,
    navigation_timeout: Duration,
    result_timeout: Duration,
}

impl RegistryClient {
    /// Build a client, validating the URL and selectors up front.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let search_url = config.parsed_search_url()?;
        let row_selector = parse_selector(&config.result_row_selector)?;
        let link_selector = parse_selector(&config.result_link_selector)?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ReviewError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            search_url,
            search_param: config.search_param.clone(),
            row_selector,
            link_selector,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            result_timeout: Duration::from_secs(config.result_timeout_secs),
        })
    }

    /// The search endpoint, recorded as traceability when nothing is found.
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    fn search_request_url(&self, product: &str) -> Url {
        let mut url = self.search_url.clone();
        url.set_fragment(None);
        url.query_pairs_mut()
            .append_pair(&self.search_param, product);
        url
    }

    /// Resolve the first result row's link against the search page URL.
    fn first_result_link(&self, html: &str, base: &Url) -> Option<Url> {
        let doc = Html::parse_document(html);
        let row = doc.select(&self.row_selector).next()?;
        let link = row.select(&self.link_selector).next()?;
        let href = link.value().attr("href")?.trim();

        if href.is_empty() || href == "#" || href.starts_with("javascript:") {
            return None;
        }
        base.join(href).ok()
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ReviewError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReviewError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| ReviewError::Network(format!("{url}: failed to read body: {e}")))
    }
}

impl RegistrySource for RegistryClient {
    #[instrument(skip_all, fields(product = %product))]
    async fn capture(&self, product: &str, opts: &CaptureOptions) -> Result<CaptureReport> {
        let mut snapshots = Vec::new();

        let search_url = self.search_request_url(product);
        if opts.show_browser {
            info!(url = %search_url, "opening registry search");
        }

        let search_html = match self.fetch(&search_url, self.result_timeout).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "registry search failed");
                return not_found(snapshots);
            }
        };
        keep_snapshot(opts, &mut snapshots, "search.html", &search_url, &search_html);

        let Some(detail_url) = self.first_result_link(&search_html, &search_url) else {
            warn!("no result row in registry search");
            return not_found(snapshots);
        };

        if opts.show_browser {
            info!(url = %detail_url, "opening first registry result");
        }

        let detail_html = match self.fetch(&detail_url, self.navigation_timeout).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "registry detail page failed");
                return not_found(snapshots);
            }
        };
        keep_snapshot(opts, &mut snapshots, "detail.html", &detail_url, &detail_html);

        let (title, text) = {
            let doc = Html::parse_document(&detail_html);
            (page_title(&doc).unwrap_or_default(), visible_text(&doc))
        };

        if text.is_empty() {
            warn!(url = %detail_url, "registry detail page has no visible text");
            return not_found(snapshots);
        }

        debug!(chars = text.chars().count(), "captured registry evidence");

        Ok(CaptureReport {
            outcome: EvidenceOutcome::Found(RawEvidence {
                source_url: detail_url.to_string(),
                page_title: title,
                access_timestamp: Utc::now(),
                visible_text: text,
                human_verified: false,
            }),
            snapshots,
        })
    }
}

fn not_found(snapshots: Vec<PageSnapshot>) -> Result<CaptureReport> {
    Ok(CaptureReport {
        outcome: EvidenceOutcome::NotFound,
        snapshots,
    })
}

fn keep_snapshot(
    opts: &CaptureOptions,
    snapshots: &mut Vec<PageSnapshot>,
    name: &str,
    url: &Url,
    html: &str,
) {
    if opts.show_browser {
        snapshots.push(PageSnapshot {
            name: name.to_string(),
            url: url.to_string(),
            html: html.to_string(),
        });
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ReviewError::config(format!("invalid CSS selector '{selector}': {e}")))
}
