//! Paginated, filterable list state shared between a page and its data source.
//!
//! A [`ListController`] owns the current [`ListQuery`], re-fetches whenever
//! the query changes, and publishes a [`ListView`] snapshot after every state
//! transition. Filter edits are debounced. Page and page-size changes fetch
//! immediately. Responses are applied in issue order: every request carries a
//! sequence number and only the latest one may touch the state.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::protocol::{FilterPatch, Filters, ListQuery, ListResult, DEFAULT_PAGE_SIZE};
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    error::{ControllerError, DataSourceError},
    source::DataSource,
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Quiet period after the last `set_filters` before a fetch is issued.
    pub debounce: Duration,
    pub default_page_size: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// What a presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub page_size: u32,
    pub filters: Filters,
    /// A debounced filter change is waiting to be fetched.
    pub filters_pending: bool,
}

struct PendingDebounce {
    generation: u64,
    handle: JoinHandle<()>,
}

struct ControllerState<T> {
    query: ListQuery,
    result: Option<ListResult<T>>,
    loading: bool,
    error: Option<String>,
    /// Sequence number of the most recently issued fetch.
    latest_seq: u64,
    debounce_generation: u64,
    debounce: Option<PendingDebounce>,
    closed: bool,
}

impl<T: Clone> ControllerState<T> {
    fn view(&self) -> ListView<T> {
        // Paging figures follow the last response; the backend may cap the
        // page size below what was requested.
        let (items, total_count, total_pages, page_size) = match &self.result {
            Some(result) => (
                result.items.clone(),
                result.total_count,
                result.total_pages(),
                result.page_size,
            ),
            None => (Vec::new(), 0, 0, self.query.page_size),
        };
        ListView {
            items,
            loading: self.loading,
            error: self.error.clone(),
            page: self.query.page,
            total_pages,
            total_count,
            page_size,
            filters: self.query.filters.clone(),
            filters_pending: self.debounce.is_some(),
        }
    }

    fn cancel_debounce(&mut self) {
        if let Some(pending) = self.debounce.take() {
            pending.handle.abort();
        }
    }
}

struct Shared<T> {
    source: Arc<dyn DataSource<T>>,
    settings: ControllerSettings,
    runtime: Handle,
    state: Mutex<ControllerState<T>>,
    view_tx: watch::Sender<ListView<T>>,
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, ControllerState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &ControllerState<T>) {
        self.view_tx.send_replace(state.view());
    }

    /// Issues a fetch for the query as it stands. Any pending debounce is
    /// superseded since this request already carries the merged filters.
    fn issue_fetch(self: &Arc<Self>, state: &mut ControllerState<T>) {
        state.cancel_debounce();
        state.latest_seq += 1;
        state.loading = true;

        let seq = state.latest_seq;
        let query = state.query.clone();
        debug!(
            seq,
            page = query.page,
            page_size = query.page_size,
            filters = query.filters.len(),
            "issuing list fetch"
        );

        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let outcome = shared.source.fetch(&query).await;
            shared.complete(seq, outcome);
        });
    }

    fn complete(&self, seq: u64, outcome: Result<ListResult<T>, DataSourceError>) {
        let mut state = self.lock();
        if state.closed {
            debug!(seq, "dropping list response after shutdown");
            return;
        }
        if seq != state.latest_seq {
            debug!(seq, latest = state.latest_seq, "discarding stale list response");
            return;
        }

        state.loading = false;
        match outcome {
            Ok(result) => {
                state.result = Some(result);
                state.error = None;
            }
            Err(err) => {
                warn!(seq, error = %err, "list fetch failed");
                state.error = Some(err.to_string());
            }
        }
        self.publish(&state);
    }

    fn fire_debounce(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        let current = state
            .debounce
            .as_ref()
            .is_some_and(|pending| pending.generation == generation);
        if !current {
            return;
        }
        // Own handle; letting the task finish is enough.
        state.debounce = None;
        self.issue_fetch(&mut state);
        self.publish(&state);
    }

    fn schedule_debounce(self: &Arc<Self>, state: &mut ControllerState<T>) {
        state.cancel_debounce();
        state.debounce_generation += 1;

        let generation = state.debounce_generation;
        let delay = self.settings.debounce;
        let shared = Arc::clone(self);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.fire_debounce(generation);
        });
        state.debounce = Some(PendingDebounce { generation, handle });
    }
}

/// Owns one page's list query and its fetch lifecycle.
///
/// Dropping the controller is equivalent to [`ListController::shutdown`].
pub struct ListController<T>
where
    T: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<T>>,
}

impl<T> ListController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Mounts a controller with the default query and issues the first fetch.
    pub fn new<S>(source: S, settings: ControllerSettings) -> Result<Self, ControllerError>
    where
        S: DataSource<T> + 'static,
    {
        let query = ListQuery::new(settings.default_page_size);
        Self::with_query(source, settings, query)
    }

    /// Mounts a controller with a caller-chosen starting query.
    pub fn with_query<S>(
        source: S,
        settings: ControllerSettings,
        query: ListQuery,
    ) -> Result<Self, ControllerError>
    where
        S: DataSource<T> + 'static,
    {
        if query.page == 0 {
            return Err(ControllerError::InvalidPage(0));
        }
        if query.page_size == 0 {
            return Err(ControllerError::InvalidPageSize);
        }
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;

        let state = ControllerState {
            query,
            result: None,
            loading: false,
            error: None,
            latest_seq: 0,
            debounce_generation: 0,
            debounce: None,
            closed: false,
        };
        let (view_tx, _) = watch::channel(state.view());
        let shared = Arc::new(Shared {
            source: Arc::new(source),
            settings,
            runtime,
            state: Mutex::new(state),
            view_tx,
        });

        {
            let mut state = shared.lock();
            shared.issue_fetch(&mut state);
            shared.publish(&state);
        }

        Ok(Self { shared })
    }

    /// Merges `patch` into the filters, returns to page 1 and schedules a
    /// debounced fetch. Calls inside the debounce window coalesce.
    pub fn set_filters(&self, patch: FilterPatch) -> Result<(), ControllerError> {
        let mut state = self.open_state()?;
        state.query.filters.apply(patch);
        state.query.page = 1;
        self.shared.schedule_debounce(&mut state);
        self.shared.publish(&state);
        Ok(())
    }

    /// Requests `page` right away, even past the last known page.
    pub fn set_page(&self, page: u32) -> Result<(), ControllerError> {
        if page == 0 {
            return Err(ControllerError::InvalidPage(page));
        }
        let mut state = self.open_state()?;
        state.query.page = page;
        self.shared.issue_fetch(&mut state);
        self.shared.publish(&state);
        Ok(())
    }

    pub fn set_page_size(&self, size: u32) -> Result<(), ControllerError> {
        if size == 0 {
            return Err(ControllerError::InvalidPageSize);
        }
        let mut state = self.open_state()?;
        state.query.page_size = size;
        state.query.page = 1;
        self.shared.issue_fetch(&mut state);
        self.shared.publish(&state);
        Ok(())
    }

    /// Re-fetches the current query without touching it.
    pub fn refresh(&self) -> Result<(), ControllerError> {
        let mut state = self.open_state()?;
        self.shared.issue_fetch(&mut state);
        self.shared.publish(&state);
        Ok(())
    }

    pub fn clear_error(&self) {
        let mut state = self.shared.lock();
        if state.error.take().is_some() {
            self.shared.publish(&state);
        }
    }

    pub fn query(&self) -> ListQuery {
        self.shared.lock().query.clone()
    }

    pub fn view(&self) -> ListView<T> {
        self.shared.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView<T>> {
        self.shared.view_tx.subscribe()
    }

    /// Waits until no debounce is pending and no fetch is in flight.
    pub async fn settled(&self) -> Result<ListView<T>, ControllerError> {
        let mut rx = self.subscribe();
        let view = rx
            .wait_for(|view| !view.loading && !view.filters_pending)
            .await
            .map_err(|_| ControllerError::Closed)?;
        Ok((*view).clone())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Unmount: cancels the pending debounce and ignores in-flight responses.
    /// Items, error and query are left as they were.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.cancel_debounce();
        state.loading = false;
        debug!(latest = state.latest_seq, "list controller shut down");
        self.shared.publish(&state);
    }

    fn open_state(&self) -> Result<MutexGuard<'_, ControllerState<T>>, ControllerError> {
        let state = self.shared.lock();
        if state.closed {
            return Err(ControllerError::Closed);
        }
        Ok(state)
    }
}

impl<T> Drop for ListController<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
