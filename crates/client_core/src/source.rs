use std::sync::Arc;

use async_trait::async_trait;
use shared::protocol::{
    FilterValue, ListQuery, ListResult, Project, Requirement, TaskPlanItem, TeamMember,
};

use crate::error::DataSourceError;

/// Backend capability a [`crate::ListController`] pulls pages from.
#[async_trait]
pub trait DataSource<T>: Send + Sync {
    async fn fetch(&self, query: &ListQuery) -> Result<ListResult<T>, DataSourceError>;
}

#[async_trait]
impl<T, S> DataSource<T> for Arc<S>
where
    S: DataSource<T> + ?Sized,
    T: Send + 'static,
{
    async fn fetch(&self, query: &ListQuery) -> Result<ListResult<T>, DataSourceError> {
        (**self).fetch(query).await
    }
}

/// A record kind the dashboard lists.
///
/// `RESOURCE` is the backend collection path. `matches_filter` backs the
/// in-memory source and must agree with how the backend interprets the same
/// filter key.
pub trait ListRecord: Clone + Send + Sync + 'static {
    const RESOURCE: &'static str;

    /// Text the free-form `search` filter is matched against.
    fn search_text(&self) -> String;

    /// Whether the record passes a single non-search filter. Unknown keys
    /// match nothing.
    fn matches_filter(&self, key: &str, value: &FilterValue) -> bool;
}

pub const SEARCH_FILTER: &str = "search";

fn text_eq(value: &FilterValue, wire: &str) -> bool {
    value
        .as_text()
        .is_some_and(|text| text.trim().eq_ignore_ascii_case(wire))
}

fn number_eq(value: &FilterValue, n: i64) -> bool {
    match value {
        FilterValue::Number(v) => *v == n,
        FilterValue::Text(text) => text.trim().parse::<i64>().is_ok_and(|v| v == n),
    }
}

impl ListRecord for Requirement {
    const RESOURCE: &'static str = "requirements";

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.description,
            self.owner.as_deref().unwrap_or_default()
        )
    }

    fn matches_filter(&self, key: &str, value: &FilterValue) -> bool {
        match key {
            "priority" => text_eq(value, self.priority.as_str()),
            "status" => text_eq(value, self.status.as_str()),
            "projectId" => number_eq(value, self.project_id.0),
            "owner" => self
                .owner
                .as_deref()
                .is_some_and(|owner| text_eq(value, owner)),
            _ => false,
        }
    }
}

impl ListRecord for TaskPlanItem {
    const RESOURCE: &'static str = "task-plans";

    fn search_text(&self) -> String {
        format!(
            "{} {}",
            self.title,
            self.assignee.as_deref().unwrap_or_default()
        )
    }

    fn matches_filter(&self, key: &str, value: &FilterValue) -> bool {
        match key {
            "priority" => text_eq(value, self.priority.as_str()),
            "status" => text_eq(value, self.status.as_str()),
            "projectId" => number_eq(value, self.project_id.0),
            "assignee" => self
                .assignee
                .as_deref()
                .is_some_and(|assignee| text_eq(value, assignee)),
            _ => false,
        }
    }
}

impl ListRecord for TeamMember {
    const RESOURCE: &'static str = "team-members";

    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.email)
    }

    fn matches_filter(&self, key: &str, value: &FilterValue) -> bool {
        match key {
            "role" => text_eq(value, self.role.as_str()),
            "department" => text_eq(value, self.role.department().as_str()),
            "projectId" => self.project_id.is_some_and(|id| number_eq(value, id.0)),
            _ => false,
        }
    }
}

impl ListRecord for Project {
    const RESOURCE: &'static str = "projects";

    fn search_text(&self) -> String {
        format!(
            "{} {}",
            self.name,
            self.manager.as_deref().unwrap_or_default()
        )
    }

    fn matches_filter(&self, key: &str, value: &FilterValue) -> bool {
        match key {
            "status" => text_eq(value, self.status.as_str()),
            "manager" => self
                .manager
                .as_deref()
                .is_some_and(|manager| text_eq(value, manager)),
            _ => false,
        }
    }
}
