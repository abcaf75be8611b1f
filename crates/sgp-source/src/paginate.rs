use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::page::PageFetcher;
use crate::records::{is_not_found, Image, QaPair, QaType, Region};

/// Image ids the `images/all` endpoint serves per page.
pub const IDS_PER_PAGE: u64 = 1000;

/// Walks paginated endpoints until the `next` cursor runs out.
#[derive(Clone, Debug)]
pub struct Paginator<F> {
    fetcher: F,
}

impl<F: PageFetcher> Paginator<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Accumulate results from page 1 onward until a page has no `next`.
    pub fn collect_all(&self, url_for: impl Fn(u32) -> String) -> SourceResult<Vec<Value>> {
        self.collect_up_to(url_for, None)
    }

    /// Like [`collect_all`](Self::collect_all), but stops fetching once more
    /// than `limit` results have been gathered and truncates to `limit`.
    pub fn collect_up_to(
        &self,
        url_for: impl Fn(u32) -> String,
        limit: Option<usize>,
    ) -> SourceResult<Vec<Value>> {
        let mut results = Vec::new();
        let mut page = 1;
        loop {
            let url = url_for(page);
            let fetched = self.fetcher.fetch_page(&url)?;
            debug!(url = %url, count = fetched.results.len(), "fetched page");
            results.extend(fetched.results);
            if let Some(limit) = limit {
                if results.len() > limit {
                    results.truncate(limit);
                    break;
                }
            }
            if fetched.next.is_none() {
                break;
            }
            page += 1;
        }
        Ok(results)
    }

    /// Every image id in the dataset.
    pub fn all_image_ids(&self) -> SourceResult<Vec<u64>> {
        let url = "/api/v0/images/all";
        self.collect_all(|page| format!("{url}?page={page}"))?
            .into_iter()
            .map(|value| parse(url, value))
            .collect()
    }

    /// Image ids at positions `start..=end` of the full listing. Only the
    /// pages covering the range are fetched.
    pub fn image_ids_in_range(&self, start: u64, end: u64) -> SourceResult<Vec<u64>> {
        if end < start {
            return Ok(Vec::new());
        }
        let url = "/api/v0/images/all";
        let mut ids = Vec::new();
        for page in start / IDS_PER_PAGE + 1..=end / IDS_PER_PAGE + 1 {
            let fetched = self.fetcher.fetch_page(&format!("{url}?page={page}"))?;
            for value in fetched.results {
                ids.push(parse(url, value)?);
            }
        }
        let skip = (start % IDS_PER_PAGE) as usize;
        let take = usize::try_from(end - start + 1).unwrap_or(usize::MAX);
        Ok(ids.into_iter().skip(skip).take(take).collect())
    }

    /// Metadata for one image; `None` if the API does not know it.
    pub fn image(&self, id: u64) -> SourceResult<Option<Image>> {
        self.lookup(&format!("/api/v0/images/{id}"))
    }

    /// Region descriptions of one image; `None` if the image is unknown.
    pub fn region_descriptions(&self, image_id: u64) -> SourceResult<Option<Vec<Region>>> {
        self.lookup(&format!("/api/v0/images/{image_id}/regions"))
    }

    /// Raw scene graph of one image; `None` if the image is unknown.
    pub fn scene_graph(&self, image_id: u64) -> SourceResult<Option<Value>> {
        self.lookup(&format!("/api/v0/images/{image_id}/graph"))
    }

    /// Raw graph of one region; `None` if the region is unknown.
    pub fn region_graph(&self, image_id: u64, region_id: u64) -> SourceResult<Option<Value>> {
        let graphs: Option<Vec<Value>> =
            self.lookup(&format!("/api/v0/images/{image_id}/regions/{region_id}"))?;
        Ok(graphs.and_then(|graphs| graphs.into_iter().next()))
    }

    /// QA pairs across the dataset, at most `limit` when given.
    pub fn all_qas(&self, limit: Option<usize>) -> SourceResult<Vec<QaPair>> {
        self.qas("/api/v0/qa/all", limit)
    }

    /// QA pairs of one question category.
    pub fn qas_of_type(&self, qtype: QaType, limit: Option<usize>) -> SourceResult<Vec<QaPair>> {
        self.qas(&format!("/api/v0/qa/{qtype}"), limit)
    }

    /// Every QA pair about one image.
    pub fn qas_of_image(&self, image_id: u64) -> SourceResult<Vec<QaPair>> {
        self.qas(&format!("/api/v0/image/{image_id}/qa"), None)
    }

    fn qas(&self, base: &str, limit: Option<usize>) -> SourceResult<Vec<QaPair>> {
        self.collect_up_to(|page| format!("{base}?page={page}"), limit)?
            .into_iter()
            .map(|value| parse(base, value))
            .collect()
    }

    fn lookup<T: DeserializeOwned>(&self, url: &str) -> SourceResult<Option<T>> {
        let value = self.fetcher.fetch(url)?;
        if is_not_found(&value) {
            return Ok(None);
        }
        parse(url, value).map(Some)
    }
}

fn parse<T: DeserializeOwned>(url: &str, value: Value) -> SourceResult<T> {
    serde_json::from_value(value).map_err(|e| SourceError::Malformed {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
