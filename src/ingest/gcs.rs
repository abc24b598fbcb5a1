use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ObjectInfo, ObjectStore};
use crate::error::{IngestError, Result};

/// Largest page the JSON API hands out per listing request.
const MAX_PAGE_SIZE: usize = 1000;

/// Anonymous client for the Google Cloud Storage JSON API.
pub struct GcsClient {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<ListedObject>,
    next_page_token: Option<String>,
}

// The API encodes `size` as a decimal string.
#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    #[serde(default)]
    size: Option<String>,
}

impl From<ListedObject> for ObjectInfo {
    fn from(obj: ListedObject) -> Self {
        ObjectInfo {
            size: obj.size.and_then(|s| s.parse().ok()),
            name: obj.name,
        }
    }
}

impl GcsClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| IngestError::Config(format!("Invalid storage endpoint '{}': {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(IngestError::Config(format!("Storage endpoint '{}' cannot be a base URL", endpoint)));
        }
        Ok(Self { client: reqwest::Client::new(), endpoint })
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| IngestError::Config(format!("Storage endpoint '{}' cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn objects_url(&self, bucket: &str) -> Result<Url> {
        self.url_with(&["storage", "v1", "b", bucket, "o"])
    }

    fn object_url(&self, bucket: &str, name: &str) -> Result<Url> {
        self.url_with(&["storage", "v1", "b", bucket, "o", name])
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn list_objects(&self, bucket: &str, max_results: Option<usize>) -> Result<Vec<ObjectInfo>> {
        let mut objects: Vec<ObjectInfo> = Vec::new();
        if max_results == Some(0) {
            return Ok(objects);
        }

        let mut page_token: Option<String> = None;
        loop {
            let mut params: Vec<(&str, String)> = Vec::new();
            if let Some(max) = max_results {
                let remaining = max.saturating_sub(objects.len());
                params.push(("maxResults", remaining.min(MAX_PAGE_SIZE).to_string()));
            }
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: ListPage = self
                .client
                .get(self.objects_url(bucket)?)
                .query(&params)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            debug!(bucket, page_items = page.items.len(), "Listed object page");
            objects.extend(page.items.into_iter().map(ObjectInfo::from));

            if let Some(max) = max_results {
                if objects.len() >= max {
                    objects.truncate(max);
                    break;
                }
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(bucket, count = objects.len(), "Listed bucket objects");
        Ok(objects)
    }

    async fn fetch(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(self.object_url(bucket, name)?)
            .query(&[("alt", "media")])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
