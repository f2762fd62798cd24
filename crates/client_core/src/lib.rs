//! Client-side list data layer for the admin dashboard.
//!
//! Pages mount a [`ListController`] over a [`DataSource`] and render the
//! [`ListView`] it publishes.

pub mod controller;
pub mod error;
pub mod http;
pub mod memory;
pub mod pages;
pub mod source;

pub use controller::{ControllerSettings, ListController, ListView, DEFAULT_DEBOUNCE};
pub use error::{ControllerError, DataSourceError};
pub use http::HttpDataSource;
pub use memory::StaticDataSource;
pub use pages::{
    mount_http_page, mount_page, FilterForm, MountError, ProjectFilters, ProjectsController,
    RequirementFilters, RequirementsController, TaskPlanController, TaskPlanFilters,
    TeamController, TeamMemberFilters,
};
pub use source::{DataSource, ListRecord, SEARCH_FILTER};
