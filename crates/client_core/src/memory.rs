use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shared::protocol::{FilterValue, ListQuery, ListResult};

use crate::{
    error::DataSourceError,
    source::{DataSource, ListRecord, SEARCH_FILTER},
};

/// Serves pages out of a fixed record set, applying filters the same way the
/// backend does.
#[derive(Debug, Clone)]
pub struct StaticDataSource<T> {
    records: Vec<T>,
}

impl<T: ListRecord> StaticDataSource<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self { records }
    }

    pub fn from_json(raw: &str) -> Result<Self, DataSourceError>
    where
        T: DeserializeOwned,
    {
        let records: Vec<T> =
            serde_json::from_str(raw).map_err(|err| DataSourceError::Decode(err.to_string()))?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matches(record: &T, query: &ListQuery) -> bool {
        query.filters.iter().all(|(key, value)| {
            if key == SEARCH_FILTER {
                search_matches(record, value)
            } else {
                record.matches_filter(key, value)
            }
        })
    }
}

fn search_matches<T: ListRecord>(record: &T, value: &FilterValue) -> bool {
    let needle = value.to_string().trim().to_lowercase();
    record.search_text().to_lowercase().contains(&needle)
}

#[async_trait]
impl<T: ListRecord> DataSource<T> for StaticDataSource<T> {
    async fn fetch(&self, query: &ListQuery) -> Result<ListResult<T>, DataSourceError> {
        if query.page == 0 || query.page_size == 0 {
            return Err(DataSourceError::Validation(format!(
                "page {} / pageSize {} out of range",
                query.page, query.page_size
            )));
        }

        let matching: Vec<&T> = self
            .records
            .iter()
            .filter(|record| Self::matches(record, query))
            .collect();

        let items = matching
            .iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .map(|record| (*record).clone())
            .collect();

        Ok(ListResult {
            items,
            total_count: matching.len() as u64,
            page: query.page,
            page_size: query.page_size,
        })
    }
}
