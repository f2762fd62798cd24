use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ProjectId);
id_newtype!(RequirementId);
id_newtype!(TaskId);
id_newtype!(MemberId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of wire values with `as_str`, `ALL`, `Display`
/// and `FromStr`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum! {
    Priority, "priority" {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

wire_enum! {
    RequirementStatus, "requirement status" {
        Draft => "draft",
        InReview => "in_review",
        Approved => "approved",
        Implemented => "implemented",
        Rejected => "rejected",
    }
}

wire_enum! {
    TaskStatus, "task status" {
        Todo => "todo",
        InProgress => "in_progress",
        Blocked => "blocked",
        Done => "done",
    }
}

wire_enum! {
    ProjectStatus, "project status" {
        Planning => "planning",
        Active => "active",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

wire_enum! {
    /// Team roles as stored by the backend.
    Role, "role" {
        ProjectManager => "project_manager",
        ProductOwner => "product_owner",
        BusinessAnalyst => "business_analyst",
        Architect => "architect",
        Developer => "developer",
        Tester => "tester",
        Designer => "designer",
        DevOps => "devops",
    }
}

wire_enum! {
    Department, "department" {
        Management => "management",
        Product => "product",
        Engineering => "engineering",
        QualityAssurance => "quality_assurance",
        Design => "design",
        Operations => "operations",
    }
}

/// Visual emphasis a presentation layer attaches to a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

impl Role {
    pub fn department(self) -> Department {
        match self {
            Role::ProjectManager => Department::Management,
            Role::ProductOwner | Role::BusinessAnalyst => Department::Product,
            Role::Architect | Role::Developer => Department::Engineering,
            Role::Tester => Department::QualityAssurance,
            Role::Designer => Department::Design,
            Role::DevOps => Department::Operations,
        }
    }
}

impl Priority {
    pub fn tone(self) -> Tone {
        match self {
            Priority::Low => Tone::Neutral,
            Priority::Medium => Tone::Info,
            Priority::High => Tone::Warning,
            Priority::Critical => Tone::Danger,
        }
    }
}

impl RequirementStatus {
    pub fn tone(self) -> Tone {
        match self {
            RequirementStatus::Draft => Tone::Neutral,
            RequirementStatus::InReview => Tone::Info,
            RequirementStatus::Approved => Tone::Success,
            RequirementStatus::Implemented => Tone::Success,
            RequirementStatus::Rejected => Tone::Danger,
        }
    }
}

impl TaskStatus {
    pub fn tone(self) -> Tone {
        match self {
            TaskStatus::Todo => Tone::Neutral,
            TaskStatus::InProgress => Tone::Info,
            TaskStatus::Blocked => Tone::Danger,
            TaskStatus::Done => Tone::Success,
        }
    }
}

impl ProjectStatus {
    pub fn tone(self) -> Tone {
        match self {
            ProjectStatus::Planning => Tone::Neutral,
            ProjectStatus::Active => Tone::Info,
            ProjectStatus::OnHold => Tone::Warning,
            ProjectStatus::Completed => Tone::Success,
            ProjectStatus::Cancelled => Tone::Danger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_has_a_department() {
        let engineering: Vec<Role> = Role::ALL
            .iter()
            .copied()
            .filter(|r| r.department() == Department::Engineering)
            .collect();
        assert_eq!(engineering, vec![Role::Architect, Role::Developer]);
        assert_eq!(Role::Tester.department(), Department::QualityAssurance);
        assert_eq!(Role::DevOps.department(), Department::Operations);
    }

    #[test]
    fn priority_tones_escalate() {
        let tones: Vec<Tone> = Priority::ALL.iter().map(|p| p.tone()).collect();
        assert_eq!(
            tones,
            vec![Tone::Neutral, Tone::Info, Tone::Warning, Tone::Danger]
        );
    }

    #[test]
    fn parses_wire_values_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(
            " in_progress ".parse::<TaskStatus>(),
            Ok(TaskStatus::InProgress)
        );
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err.to_string(), "unknown priority value 'urgent'");
    }

    #[test]
    fn serde_uses_wire_spelling() {
        let json = serde_json::to_string(&RequirementStatus::InReview).expect("serialize");
        assert_eq!(json, "\"in_review\"");
        let role: Role = serde_json::from_str("\"devops\"").expect("deserialize");
        assert_eq!(role, Role::DevOps);
    }
}
