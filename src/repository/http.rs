//! Fetches canonical records from the record service over HTTP.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Result, ServiceError};
use crate::models::Record;
use crate::repository::RecordSource;

/// `GET {base_url}/{collection}/{id}`, e.g. `http://hotels-api:8081/hotels/42`.
pub struct HttpRecordSource<R> {
    client: reqwest::Client,
    base_url: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> HttpRecordSource<R> {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            _record: PhantomData,
        })
    }

    fn url(&self, id: &R::Id) -> String {
        format!("{}/{}/{}", self.base_url, R::COLLECTION, id)
    }
}

#[async_trait]
impl<R: Record> RecordSource<R> for HttpRecordSource<R> {
    async fn fetch(&self, id: &R::Id) -> Result<R> {
        let url = self.url(id);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!(url = %url, status = %status, "record fetch");

        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("{} {}", R::ENTITY, id)));
        }
        if !status.is_success() {
            return Err(ServiceError::Unavailable(format!(
                "record service answered {} for {}",
                status, url
            )));
        }

        let mut record: R = response.json().await?;
        if record.id().is_none() {
            record.set_id(id.clone());
        }
        Ok(record)
    }
}
