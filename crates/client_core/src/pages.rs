//! Typed filter forms and controllers for the dashboard's list pages.
//!
//! Every form produces a patch that mentions all of its fields, so an unset
//! field clears the corresponding filter instead of leaving a stale one.

use std::time::Duration;

use shared::{
    domain::{Department, Priority, ProjectId, ProjectStatus, RequirementStatus, Role, TaskStatus},
    protocol::{FilterPatch, ListQuery, Project, Requirement, TaskPlanItem, TeamMember},
};

use crate::{
    controller::{ControllerSettings, ListController},
    error::{ControllerError, DataSourceError},
    http::HttpDataSource,
    source::{DataSource, ListRecord, SEARCH_FILTER},
};

pub type RequirementsController = ListController<Requirement>;
pub type TaskPlanController = ListController<TaskPlanItem>;
pub type TeamController = ListController<TeamMember>;
pub type ProjectsController = ListController<Project>;

pub trait FilterForm {
    type Record: ListRecord;

    fn to_patch(&self) -> FilterPatch;
}

fn search_value(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementFilters {
    pub search: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<RequirementStatus>,
    pub project_id: Option<ProjectId>,
}

impl FilterForm for RequirementFilters {
    type Record = Requirement;

    fn to_patch(&self) -> FilterPatch {
        FilterPatch::new()
            .set_opt(SEARCH_FILTER, search_value(&self.search))
            .set_opt("priority", self.priority)
            .set_opt("status", self.status)
            .set_opt("projectId", self.project_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPlanFilters {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub project_id: Option<ProjectId>,
}

impl FilterForm for TaskPlanFilters {
    type Record = TaskPlanItem;

    fn to_patch(&self) -> FilterPatch {
        FilterPatch::new()
            .set_opt(SEARCH_FILTER, search_value(&self.search))
            .set_opt("status", self.status)
            .set_opt("priority", self.priority)
            .set_opt("assignee", self.assignee.clone())
            .set_opt("projectId", self.project_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamMemberFilters {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub department: Option<Department>,
    pub project_id: Option<ProjectId>,
}

impl FilterForm for TeamMemberFilters {
    type Record = TeamMember;

    fn to_patch(&self) -> FilterPatch {
        FilterPatch::new()
            .set_opt(SEARCH_FILTER, search_value(&self.search))
            .set_opt("role", self.role)
            .set_opt("department", self.department)
            .set_opt("projectId", self.project_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilters {
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
    pub manager: Option<String>,
}

impl FilterForm for ProjectFilters {
    type Record = Project;

    fn to_patch(&self) -> FilterPatch {
        FilterPatch::new()
            .set_opt(SEARCH_FILTER, search_value(&self.search))
            .set_opt("status", self.status)
            .set_opt("manager", self.manager.clone())
    }
}

impl<T> ListController<T>
where
    T: ListRecord,
{
    /// Replaces the page's filters with the form's state (debounced).
    pub fn apply_form<F>(&self, form: &F) -> Result<(), ControllerError>
    where
        F: FilterForm<Record = T>,
    {
        self.set_filters(form.to_patch())
    }
}

/// Mounts an independent controller for one page.
pub fn mount_page<T, S>(
    source: S,
    settings: ControllerSettings,
) -> Result<ListController<T>, ControllerError>
where
    T: ListRecord,
    S: DataSource<T> + 'static,
{
    ListController::new(source, settings)
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error(transparent)]
    Source(#[from] DataSourceError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// Mounts a page controller backed by the HTTP API, starting at `query`.
pub fn mount_http_page<T>(
    base_url: &str,
    request_timeout: Duration,
    settings: ControllerSettings,
    query: ListQuery,
) -> Result<ListController<T>, MountError>
where
    T: ListRecord + serde::de::DeserializeOwned,
{
    let source = HttpDataSource::<T>::with_timeout(base_url, request_timeout)?;
    Ok(ListController::with_query(source, settings, query)?)
}
