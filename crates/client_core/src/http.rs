use std::{marker::PhantomData, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    error::ApiError,
    protocol::{ListQuery, ListResult},
};
use tracing::debug;
use url::Url;

use crate::{
    error::DataSourceError,
    source::{DataSource, ListRecord},
};

/// Pulls list pages from `GET {base_url}/{T::RESOURCE}`.
pub struct HttpDataSource<T> {
    http: Client,
    base_url: Url,
    _record: PhantomData<fn() -> T>,
}

impl<T> HttpDataSource<T>
where
    T: ListRecord + DeserializeOwned,
{
    pub fn new(base_url: &str) -> Result<Self, DataSourceError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, DataSourceError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DataSourceError::Transport(err.to_string()))?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, DataSourceError> {
        let mut base_url = Url::parse(base_url.trim()).map_err(|err| {
            DataSourceError::Validation(format!("bad api url '{base_url}': {err}"))
        })?;
        // Url::join drops the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            _record: PhantomData,
        })
    }

    pub fn endpoint(&self, query: &ListQuery) -> Result<Url, DataSourceError> {
        let mut url = self
            .base_url
            .join(T::RESOURCE)
            .map_err(|err| DataSourceError::Validation(err.to_string()))?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        Ok(url)
    }
}

#[async_trait]
impl<T> DataSource<T> for HttpDataSource<T>
where
    T: ListRecord + DeserializeOwned,
{
    async fn fetch(&self, query: &ListQuery) -> Result<ListResult<T>, DataSourceError> {
        let url = self.endpoint(query)?;
        debug!(%url, "requesting list page");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| DataSourceError::Transport(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        let body = res
            .bytes()
            .await
            .map_err(|err| DataSourceError::Transport(err.to_string()))?;
        serde_json::from_slice(&body).map_err(|err| DataSourceError::Decode(err.to_string()))
    }
}

fn error_from_response(status: StatusCode, body: &str) -> DataSourceError {
    let api_error = serde_json::from_str::<ApiError>(body).ok();
    let is_validation = api_error.as_ref().is_some_and(ApiError::is_validation)
        || status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNPROCESSABLE_ENTITY;

    let message = match api_error {
        Some(api_error) => api_error.message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    if is_validation {
        DataSourceError::Validation(message)
    } else {
        DataSourceError::Backend {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
