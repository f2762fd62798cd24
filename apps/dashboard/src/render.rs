//! Plain-text rendering of a list page.

use std::fmt::Write as _;

use client_core::ListView;
use shared::{
    domain::Tone,
    protocol::{Project, Requirement, TaskPlanItem, TeamMember},
};

pub trait Row {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

fn badge(label: &str, tone: Tone) -> String {
    match tone {
        Tone::Neutral => label.to_string(),
        Tone::Info => format!("{label} (i)"),
        Tone::Success => format!("{label} (ok)"),
        Tone::Warning => format!("{label} (!)"),
        Tone::Danger => format!("{label} (!!)"),
    }
}

fn or_dash(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl Row for Requirement {
    const HEADERS: &'static [&'static str] = &["ID", "TITLE", "PRIORITY", "STATUS", "OWNER"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            badge(self.priority.as_str(), self.priority.tone()),
            badge(self.status.as_str(), self.status.tone()),
            or_dash(self.owner.as_deref()),
        ]
    }
}

impl Row for TaskPlanItem {
    const HEADERS: &'static [&'static str] =
        &["ID", "TITLE", "STATUS", "PRIORITY", "ASSIGNEE", "DUE"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            badge(self.status.as_str(), self.status.tone()),
            badge(self.priority.as_str(), self.priority.tone()),
            or_dash(self.assignee.as_deref()),
            or_dash(self.due_date),
        ]
    }
}

impl Row for TeamMember {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "EMAIL", "ROLE", "DEPARTMENT"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.email.clone(),
            self.role.to_string(),
            self.role.department().to_string(),
        ]
    }
}

impl Row for Project {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "STATUS", "MANAGER", "MEMBERS"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            badge(self.status.as_str(), self.status.tone()),
            or_dash(self.manager.as_deref()),
            self.member_count.to_string(),
        ]
    }
}

pub fn render_page<T: Row>(view: &ListView<T>) -> String {
    let mut out = String::new();

    if view.items.is_empty() {
        out.push_str("(no records)\n");
    } else {
        let rows: Vec<Vec<String>> = view.items.iter().map(T::cells).collect();
        let mut widths: Vec<usize> = T::HEADERS.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let headers: Vec<String> = T::HEADERS.iter().map(|h| h.to_string()).collect();
        push_row(&mut out, &headers, &widths);
        for row in &rows {
            push_row(&mut out, row, &widths);
        }
    }

    let _ = writeln!(
        out,
        "page {} of {} ({} records, {} per page)",
        view.page,
        view.total_pages.max(1),
        view.total_count,
        view.page_size
    );
    if !view.filters.is_empty() {
        let filters: Vec<String> = view
            .filters
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        let _ = writeln!(out, "filters: {}", filters.join(", "));
    }
    if view.loading || view.filters_pending {
        out.push_str("loading...\n");
    }
    if let Some(error) = &view.error {
        let _ = writeln!(out, "error: {error}");
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use shared::{
        domain::{MemberId, Role},
        protocol::{FilterPatch, Filters},
    };

    use super::*;

    fn view(items: Vec<TeamMember>, total_count: u64) -> ListView<TeamMember> {
        let mut filters = Filters::default();
        filters.apply(FilterPatch::new().set("role", Role::Tester));
        ListView {
            items,
            loading: false,
            error: Some("network error: timed out".to_string()),
            page: 2,
            total_pages: 3,
            total_count,
            page_size: 20,
            filters,
            filters_pending: false,
        }
    }

    #[test]
    fn renders_aligned_rows_and_footer() {
        let member = TeamMember {
            id: MemberId(12),
            name: "Barbara".to_string(),
            email: "barbara@example.com".to_string(),
            role: Role::Tester,
            project_id: None,
            joined_at: None,
        };

        let out = render_page(&view(vec![member], 45));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "ID  NAME     EMAIL                ROLE    DEPARTMENT"
        );
        assert_eq!(
            lines[1],
            "12  Barbara  barbara@example.com  tester  quality_assurance"
        );
        assert_eq!(lines[2], "page 2 of 3 (45 records, 20 per page)");
        assert_eq!(lines[3], "filters: role=tester");
        assert_eq!(lines[4], "error: network error: timed out");
    }

    #[test]
    fn empty_page_says_so() {
        let out = render_page(&view(Vec::new(), 0));
        assert!(out.starts_with("(no records)\n"));
    }
}
