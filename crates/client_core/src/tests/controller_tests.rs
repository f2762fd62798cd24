use super::*;
use std::collections::HashMap;

use async_trait::async_trait;
use shared::protocol::FilterValue;
use tokio::sync::Mutex;

#[derive(Clone)]
struct Step {
    delay: Duration,
    fail_with: Option<DataSourceError>,
}

impl Step {
    fn delayed(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            fail_with: None,
        }
    }

    fn failing(err: DataSourceError) -> Self {
        Self {
            delay: Duration::ZERO,
            fail_with: Some(err),
        }
    }
}

/// Answers every query with `total` records. Item values are
/// `call_number * 1000 + index`, so a test can tell which response is shown.
struct ScriptedSource {
    total: u64,
    steps: HashMap<usize, Step>,
    calls: Mutex<Vec<ListQuery>>,
}

impl ScriptedSource {
    fn new(total: u64) -> Self {
        Self {
            total,
            steps: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_step(mut self, call_number: usize, step: Step) -> Self {
        self.steps.insert(call_number, step);
        self
    }

    async fn calls(&self) -> Vec<ListQuery> {
        self.calls.lock().await.clone()
    }

    async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl DataSource<u64> for ScriptedSource {
    async fn fetch(&self, query: &ListQuery) -> Result<ListResult<u64>, DataSourceError> {
        let call_number = {
            let mut calls = self.calls.lock().await;
            calls.push(query.clone());
            calls.len()
        };

        let step = self.steps.get(&call_number).cloned();
        if let Some(step) = &step {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            if let Some(err) = &step.fail_with {
                return Err(err.clone());
            }
        }

        let offset = query.offset() as u64;
        let count = self.total.saturating_sub(offset).min(u64::from(query.page_size));
        Ok(ListResult {
            items: (0..count).map(|i| call_number as u64 * 1000 + i).collect(),
            total_count: self.total,
            page: query.page,
            page_size: query.page_size,
        })
    }
}

fn settings(page_size: u32) -> ControllerSettings {
    ControllerSettings {
        debounce: Duration::from_millis(300),
        default_page_size: page_size,
    }
}

fn mount(source: &Arc<ScriptedSource>, page_size: u32) -> ListController<u64> {
    ListController::new(Arc::clone(source), settings(page_size)).expect("mount controller")
}

#[tokio::test(start_paused = true)]
async fn mount_issues_initial_fetch() {
    let source = Arc::new(ScriptedSource::new(45));
    let controller = mount(&source, 20);

    let view = controller.settled().await.expect("settled");
    assert_eq!(view.items.len(), 20);
    assert_eq!(view.total_count, 45);
    assert_eq!(view.total_pages, 3);
    assert_eq!(view.page, 1);
    assert!(view.error.is_none());

    let calls = source.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], ListQuery::new(20));
}

#[tokio::test(start_paused = true)]
async fn rapid_filter_changes_coalesce_into_one_fetch() {
    let source = Arc::new(ScriptedSource::new(45));
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    for text in ["a", "ad", "ada"] {
        controller
            .set_filters(FilterPatch::new().set("search", text))
            .expect("set filters");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(source.call_count().await, 1);
    assert!(controller.view().filters_pending);

    // 299ms after the last keystroke: still quiet.
    tokio::time::sleep(Duration::from_millis(199)).await;
    assert_eq!(source.call_count().await, 1);

    tokio::time::sleep(Duration::from_millis(2)).await;
    controller.settled().await.expect("settled");

    let calls = source.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].page, 1);
    assert_eq!(
        calls[1].filters.get("search"),
        Some(&FilterValue::from("ada"))
    );
}

#[tokio::test(start_paused = true)]
async fn blank_filter_inside_window_drops_the_key() {
    let source = Arc::new(ScriptedSource::new(45));
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    controller
        .set_filters(FilterPatch::new().set("priority", "high"))
        .expect("set filters");
    controller
        .set_filters(FilterPatch::new().set("priority", ""))
        .expect("set filters");
    controller.settled().await.expect("settled");

    let calls = source.calls().await;
    assert_eq!(calls.len(), 2);
    assert!(calls[1].filters.is_empty());
    assert!(!controller.query().filters.contains("priority"));
}

#[tokio::test(start_paused = true)]
async fn set_filters_returns_to_first_page() {
    let source = Arc::new(ScriptedSource::new(100));
    let controller = mount(&source, 20);
    controller.set_page(4).expect("set page");
    controller.settled().await.expect("settled");

    controller
        .set_filters(FilterPatch::new().set("status", "todo"))
        .expect("set filters");
    assert_eq!(controller.query().page, 1);
    assert_eq!(controller.view().page, 1);
}

#[tokio::test(start_paused = true)]
async fn set_page_fetches_immediately_and_tracks_last_value() {
    let source = Arc::new(
        ScriptedSource::new(45)
            .with_step(2, Step::delayed(400))
            .with_step(3, Step::delayed(400)),
    );
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    controller.set_page(2).expect("set page");
    controller.set_page(7).expect("set page");
    assert_eq!(controller.query().page, 7);
    assert!(controller.view().loading);

    tokio::time::sleep(Duration::from_millis(1)).await;
    let pages: Vec<u32> = source.calls().await.iter().map(|q| q.page).collect();
    assert_eq!(pages, vec![1, 2, 7]);

    let view = controller.settled().await.expect("settled");
    assert_eq!(view.page, 7);
    assert!(view.items.is_empty());
    assert_eq!(view.total_count, 45);

    assert_eq!(controller.set_page(0), Err(ControllerError::InvalidPage(0)));
    assert_eq!(controller.query().page, 7);
}

#[tokio::test(start_paused = true)]
async fn late_response_never_overwrites_newer_one() {
    // Call 2 (page 2) resolves after call 3 (page 3).
    let source = Arc::new(
        ScriptedSource::new(100)
            .with_step(2, Step::delayed(500))
            .with_step(3, Step::delayed(50)),
    );
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    controller.set_page(2).expect("set page");
    controller.set_page(3).expect("set page");

    let view = controller.settled().await.expect("settled");
    assert_eq!(view.items.first(), Some(&3000));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(source.call_count().await, 3);

    let view = controller.view();
    assert_eq!(view.page, 3);
    assert_eq!(view.items.first(), Some(&3000));
    assert!(!view.loading);
}

#[tokio::test(start_paused = true)]
async fn loading_stays_on_until_latest_request_finishes() {
    let source = Arc::new(
        ScriptedSource::new(100)
            .with_step(2, Step::delayed(50))
            .with_step(3, Step::delayed(500)),
    );
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    controller.set_page(2).expect("set page");
    controller.set_page(3).expect("set page");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let view = controller.view();
    assert!(view.loading);
    assert_eq!(view.items.first(), Some(&1000));

    let view = controller.settled().await.expect("settled");
    assert_eq!(view.items.first(), Some(&3000));
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_previous_items_until_cleared() {
    let source = Arc::new(ScriptedSource::new(45).with_step(
        2,
        Step::failing(DataSourceError::Transport("connection reset".into())),
    ));
    let controller = mount(&source, 10);
    let before = controller.settled().await.expect("settled");
    assert_eq!(before.items.len(), 10);

    controller.refresh().expect("refresh");
    let view = controller.settled().await.expect("settled");
    assert_eq!(view.items, before.items);
    assert_eq!(
        view.error.as_deref(),
        Some("network error: connection reset")
    );
    assert_eq!(source.calls().await[1], source.calls().await[0]);

    controller.clear_error();
    let view = controller.view();
    assert!(view.error.is_none());
    assert_eq!(view.items, before.items);
    assert_eq!(controller.query(), ListQuery::new(10));
}

#[tokio::test(start_paused = true)]
async fn failure_without_prior_result_stays_empty() {
    let source = Arc::new(ScriptedSource::new(45).with_step(
        1,
        Step::failing(DataSourceError::Validation("unknown filter 'shoeSize'".into())),
    ));
    let controller = mount(&source, 20);

    let view = controller.settled().await.expect("settled");
    assert!(view.items.is_empty());
    assert_eq!(view.total_count, 0);
    assert_eq!(view.total_pages, 0);
    assert_eq!(
        view.error.as_deref(),
        Some("invalid request: unknown filter 'shoeSize'")
    );
}

#[tokio::test(start_paused = true)]
async fn successful_refresh_clears_error() {
    let source = Arc::new(
        ScriptedSource::new(5).with_step(1, Step::failing(DataSourceError::Backend {
            status: 503,
            message: "maintenance".into(),
        })),
    );
    let controller = mount(&source, 20);
    let view = controller.settled().await.expect("settled");
    assert!(view.error.is_some());

    controller.refresh().expect("refresh");
    let view = controller.settled().await.expect("settled");
    assert!(view.error.is_none());
    assert_eq!(view.items.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn empty_result_is_not_an_error() {
    let source = Arc::new(ScriptedSource::new(0));
    let controller = mount(&source, 20);

    let view = controller.settled().await.expect("settled");
    assert!(view.items.is_empty());
    assert!(view.error.is_none());
    assert_eq!(view.total_pages, 0);
}

#[tokio::test(start_paused = true)]
async fn set_page_size_resets_page() {
    let source = Arc::new(ScriptedSource::new(45));
    let controller = mount(&source, 20);
    controller.set_page(3).expect("set page");
    controller.settled().await.expect("settled");

    controller.set_page_size(50).expect("set page size");
    let view = controller.settled().await.expect("settled");
    assert_eq!(view.page, 1);
    assert_eq!(view.page_size, 50);
    assert_eq!(view.total_pages, 1);
    assert_eq!(view.items.len(), 45);

    assert_eq!(
        controller.set_page_size(0),
        Err(ControllerError::InvalidPageSize)
    );
}

/// Serves at most `cap` records per page whatever size was asked for.
struct CappedSource {
    total: u64,
    cap: u32,
}

#[async_trait]
impl DataSource<u64> for CappedSource {
    async fn fetch(&self, query: &ListQuery) -> Result<ListResult<u64>, DataSourceError> {
        let page_size = query.page_size.min(self.cap);
        let offset = u64::from(query.page - 1) * u64::from(page_size);
        let count = self.total.saturating_sub(offset).min(u64::from(page_size));
        Ok(ListResult {
            items: (offset..offset + count).collect(),
            total_count: self.total,
            page: query.page,
            page_size,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn page_count_follows_the_size_the_backend_served() {
    let source = CappedSource { total: 45, cap: 20 };
    let controller = ListController::new(source, settings(50)).expect("mount controller");

    let view = controller.settled().await.expect("settled");
    assert_eq!(view.items.len(), 20);
    assert_eq!(view.total_count, 45);
    assert_eq!(view.page_size, 20);
    assert_eq!(view.total_pages, 3);
    assert_eq!(controller.query().page_size, 50);

    controller.set_page(3).expect("set page");
    let view = controller.settled().await.expect("settled");
    assert_eq!(view.items, (40..45).collect::<Vec<u64>>());
    assert_eq!(view.total_pages, 3);
}

#[tokio::test(start_paused = true)]
async fn immediate_fetch_supersedes_pending_debounce() {
    let source = Arc::new(ScriptedSource::new(45));
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    controller
        .set_filters(FilterPatch::new().set("search", "x"))
        .expect("set filters");
    controller.set_page(2).expect("set page");
    assert!(!controller.view().filters_pending);

    tokio::time::sleep(Duration::from_secs(1)).await;
    let calls = source.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].page, 2);
    assert_eq!(calls[1].filters.get("search"), Some(&FilterValue::from("x")));
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_debounce_issues_no_fetch() {
    let source = Arc::new(ScriptedSource::new(45));
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    controller
        .set_filters(FilterPatch::new().set("search", "late"))
        .expect("set filters");
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.shutdown();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(source.call_count().await, 1);
    assert!(controller.is_closed());
    assert_eq!(
        controller.set_filters(FilterPatch::new()),
        Err(ControllerError::Closed)
    );
    assert_eq!(controller.refresh(), Err(ControllerError::Closed));
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_flight_ignores_the_response() {
    let source = Arc::new(ScriptedSource::new(45).with_step(2, Step::delayed(500)));
    let controller = mount(&source, 20);
    let before = controller.settled().await.expect("settled");

    controller.set_page(2).expect("set page");
    tokio::time::sleep(Duration::from_millis(10)).await;
    controller.shutdown();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(source.call_count().await, 2);

    let after = controller.view();
    assert_eq!(after.items, before.items);
    assert_eq!(after.error, None);
    assert!(!after.loading);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_controller_cancels_pending_debounce() {
    let source = Arc::new(ScriptedSource::new(45));
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    controller
        .set_filters(FilterPatch::new().set("search", "gone"))
        .expect("set filters");
    drop(controller);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(source.call_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_loading_transitions() {
    let source = Arc::new(ScriptedSource::new(45).with_step(2, Step::delayed(100)));
    let controller = mount(&source, 20);
    controller.settled().await.expect("settled");

    let mut rx = controller.subscribe();
    controller.refresh().expect("refresh");
    assert!(rx.borrow_and_update().loading);

    let view = rx.wait_for(|view| !view.loading).await.expect("view");
    assert_eq!(view.items.first(), Some(&2000));
}

#[tokio::test(start_paused = true)]
async fn controllers_do_not_share_filters() {
    let source = Arc::new(ScriptedSource::new(45));
    let first = mount(&source, 20);
    let second = mount(&source, 20);

    first
        .set_filters(FilterPatch::new().set("role", "developer"))
        .expect("set filters");
    assert!(first.query().filters.contains("role"));
    assert!(second.query().filters.is_empty());
}

#[test]
fn rejects_invalid_starting_query() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let _guard = runtime.enter();

    let mut query = ListQuery::new(20);
    query.page = 0;
    let err = ListController::<u64>::with_query(ScriptedSource::new(1), settings(20), query)
        .err()
        .expect("page 0 rejected");
    assert_eq!(err, ControllerError::InvalidPage(0));

    let err = ListController::<u64>::with_query(
        ScriptedSource::new(1),
        settings(20),
        ListQuery::new(0),
    )
    .err()
    .expect("page size 0 rejected");
    assert_eq!(err, ControllerError::InvalidPageSize);
}

#[test]
fn requires_a_runtime() {
    let err = ListController::<u64>::new(ScriptedSource::new(1), settings(20))
        .err()
        .expect("no runtime");
    assert_eq!(err, ControllerError::NoRuntime);
}
