use crate::config::ClientConfig;
use crate::traits::Corpus;
use crate::{ContentKind, PageContent, PageId, PageOutcome, SearchHits, SearchRequest, WikiError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use url::Url;

/// HTTP client for the MediaWiki `action=query` endpoint.
///
/// Connections are pooled inside the client and released when it is dropped,
/// so a stage that owns one releases them when its task ends.
pub struct WikipediaClient {
    client: Client,
    endpoint: Url,
}

impl WikipediaClient {
    pub fn new(config: &ClientConfig) -> Result<Self, WikiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
        })
    }

    pub fn search_url(&self, request: &SearchRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("action", "query")
                .append_pair("format", "json")
                .append_pair("list", "search")
                .append_pair("srsearch", &request.search_expression())
                .append_pair("srlimit", &request.limit.to_string())
                .append_pair("srsort", "incoming_links_desc");
            if request.offset > 0 {
                pairs.append_pair("sroffset", &request.offset.to_string());
            }
        }
        url
    }

    pub fn content_url(&self, page_ids: &[PageId], kind: ContentKind) -> Url {
        let joined = page_ids
            .iter()
            .map(PageId::to_string)
            .collect::<Vec<_>>()
            .join("|");

        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("action", "query")
                .append_pair("format", "json")
                .append_pair("prop", "extracts|info")
                .append_pair("explaintext", "true")
                .append_pair("inprop", "url")
                .append_pair("pageids", &joined);
            match kind {
                ContentKind::Summary => {
                    pairs.append_pair("exintro", "true");
                }
                ContentKind::Body => {
                    pairs.append_pair("exlimit", "1");
                }
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, WikiError> {
        tracing::debug!(%url, "corpus request");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(WikiError::BackendResponse {
                status: response.status(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Corpus for WikipediaClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchHits, WikiError> {
        let envelope: Envelope<SearchBody> = self.get_json(self.search_url(request)).await?;
        decode_search(envelope)
    }

    async fn fetch_pages(
        &self,
        page_ids: &[PageId],
        kind: ContentKind,
    ) -> Result<Vec<PageOutcome>, WikiError> {
        let envelope: Envelope<PagesBody> =
            self.get_json(self.content_url(page_ids, kind)).await?;
        let pages = envelope
            .query
            .and_then(|query| query.pages)
            .filter(|pages| !pages.is_empty())
            .ok_or(WikiError::MissingField("query.pages"))?;

        Ok(correlate_pages(page_ids, pages))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    query: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    searchinfo: Option<SearchInfo>,
    search: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchInfo {
    #[serde(default)]
    totalhits: u64,
    suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    pageid: PageId,
}

#[derive(Debug, Deserialize)]
struct PagesBody {
    pages: Option<HashMap<String, RawPage>>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    pageid: Option<PageId>,
    #[serde(default)]
    title: String,
    /// Absent when the corpus declined to extract this page, e.g. past `exlimit`.
    extract: Option<String>,
    #[serde(default)]
    fullurl: String,
    missing: Option<Value>,
}

fn decode_search(envelope: Envelope<SearchBody>) -> Result<SearchHits, WikiError> {
    let body = envelope.query.ok_or(WikiError::MissingField("query.search"))?;
    let items = body.search.ok_or(WikiError::MissingField("query.search"))?;

    let mut seen = HashSet::new();
    let page_ids = items
        .into_iter()
        .map(|item| item.pageid)
        .filter(|id| seen.insert(*id))
        .collect();

    let (total_hits, suggestion) = match body.searchinfo {
        Some(info) => (
            info.totalhits,
            info.suggestion.filter(|text| !text.is_empty()),
        ),
        None => (0, None),
    };

    Ok(SearchHits {
        total_hits,
        page_ids,
        suggestion,
    })
}

/// Pages come back keyed by id text in no particular order, so each requested
/// id is looked up by key rather than by position.
fn correlate_pages(page_ids: &[PageId], mut pages: HashMap<String, RawPage>) -> Vec<PageOutcome> {
    page_ids
        .iter()
        .map(|&page_id| match pages.remove(&page_id.to_string()) {
            Some(raw) if raw.missing.is_none() => match raw.extract {
                Some(text) => Ok(PageContent {
                    page_id: raw.pageid.unwrap_or(page_id),
                    title: raw.title,
                    url: raw.fullurl,
                    text,
                }),
                None => {
                    tracing::warn!(page_id, "page returned without an extract");
                    Err(WikiError::MissingExtract { page_id })
                }
            },
            _ => {
                tracing::warn!(page_id, "page absent from batch response");
                Err(WikiError::MissingPage { page_id })
            }
        })
        .collect()
}
