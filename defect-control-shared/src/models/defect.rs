//! Defect records and the defect creation form
//!
//! Defects belong to a project and carry their own attachments and comments.
//! The assignee arrives either as a bare user id or as an embedded identity,
//! depending on whether the server preloaded the relation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::attachment::Attachment;
use super::comment::Comment;
use super::project::ProjectId;
use super::user::{Identity, UserId};
use crate::validation::non_blank;

/// Defect identifier as issued by the API
pub type DefectId = u64;

/// Date layouts accepted for due dates, tried in order
const DUE_DATE_LAYOUTS: [&str; 3] = ["%Y-%m-%d", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Defect priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum Priority {
    /// Low priority
    Low,

    /// Medium priority (form default)
    #[default]
    Medium,

    /// High priority
    High,

    /// Server sent no recognizable priority
    #[serde(rename = "")]
    Unset,
}

impl Priority {
    /// Converts priority to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Unset => "-",
        }
    }

    /// Whether the server sent no recognizable priority
    pub fn is_unset(&self) -> bool {
        matches!(self, Priority::Unset)
    }
}

impl From<Option<String>> for Priority {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => Priority::Low,
            Some("medium") => Priority::Medium,
            Some("high") => Priority::High,
            _ => Priority::Unset,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Priority::from(Some(s.to_string())) {
            Priority::Unset => Err(format!("Unknown priority: {}", s.trim())),
            priority => Ok(priority),
        }
    }
}

/// Defect assignee as delivered by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Assignee {
    /// Bare user id
    Id(UserId),

    /// Embedded user record
    User(Identity),
}

impl Assignee {
    /// User id of the assignee
    pub fn id(&self) -> UserId {
        match self {
            Assignee::Id(id) => *id,
            Assignee::User(identity) => identity.id,
        }
    }
}

/// Defect record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    /// Unique defect ID
    pub id: DefectId,

    /// Owning project
    #[serde(default)]
    pub project_id: Option<ProjectId>,

    /// Short title
    #[serde(default)]
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Priority
    #[serde(default, skip_serializing_if = "Priority::is_unset")]
    pub priority: Priority,

    /// Severity label, when set
    #[serde(default)]
    pub severity: Option<String>,

    /// Workflow status label, when set
    #[serde(default)]
    pub status: Option<String>,

    /// Assignee, as id or embedded record
    #[serde(default)]
    pub assignee: Option<Assignee>,

    /// Assignee id, when delivered as a separate field
    #[serde(default)]
    pub assignee_id: Option<UserId>,

    /// Due date
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<NaiveDate>,

    /// Attachments, when embedded
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,

    /// Comments, when embedded
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<Comment>,

    /// When the defect was reported
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Defect {
    /// Human-readable assignee: name if embedded, `#id` otherwise, `-` if unassigned
    pub fn assignee_label(&self) -> String {
        match (&self.assignee, &self.assignee_id) {
            (Some(Assignee::User(identity)), _) => identity.label(),
            (Some(Assignee::Id(id)), _) | (None, Some(id)) => format!("#{}", id),
            (None, None) => "-".to_string(),
        }
    }
}

/// Defect creation form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CreateDefect {
    /// Short title
    #[validate(custom(function = "non_blank"))]
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Priority
    #[serde(skip_serializing_if = "Priority::is_unset")]
    pub priority: Priority,

    /// Assignee user id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,

    /// Due date, sent as `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Parses a due date in any of the accepted layouts
///
/// Accepts RFC 3339 timestamps, plain dates and naive date-times.
pub fn parse_due_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.date_naive());
    }

    DUE_DATE_LAYOUTS.iter().find_map(|layout| {
        NaiveDate::parse_from_str(trimmed, layout)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(trimmed, layout).ok().map(|dt| dt.date()))
    })
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_due_date))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::validation::validate_form;

    #[test]
    fn test_priority_decoding() {
        let p: Priority = serde_json::from_str(r#""high""#).unwrap();
        assert_eq!(p, Priority::High);

        let p: Priority = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(p, Priority::Unset);

        let p: Priority = serde_json::from_str("null").unwrap();
        assert_eq!(p, Priority::Unset);

        assert_eq!(serde_json::to_value(Priority::Low).unwrap(), "low");
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_defect_with_embedded_assignee() {
        let defect: Defect = serde_json::from_str(
            r#"{
                "id": 4,
                "project_id": 2,
                "title": "Cracked tile",
                "priority": "medium",
                "assignee_id": 5,
                "assignee": {"id": 5, "name": "Olga", "email": "o@x.ru", "role": "engineer"},
                "due_date": "2025-03-01T00:00:00Z",
                "attachments": null
            }"#,
        )
        .unwrap();

        assert_eq!(defect.assignee.as_ref().map(Assignee::id), Some(5));
        assert_eq!(defect.assignee_label(), "Olga");
        assert_eq!(defect.due_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert!(defect.attachments.is_empty());
        assert!(matches!(
            defect.assignee,
            Some(Assignee::User(Identity { role: Role::Engineer, .. }))
        ));
    }

    #[test]
    fn test_defect_with_bare_assignee_id() {
        let defect: Defect =
            serde_json::from_str(r#"{"id":1,"title":"Leak","assignee":12}"#).unwrap();
        assert_eq!(defect.assignee, Some(Assignee::Id(12)));
        assert_eq!(defect.assignee_label(), "#12");

        let unassigned: Defect = serde_json::from_str(r#"{"id":2,"title":"Gap"}"#).unwrap();
        assert_eq!(unassigned.assignee_label(), "-");
        assert_eq!(unassigned.priority, Priority::Medium);
    }

    #[test]
    fn test_parse_due_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 12, 31);
        assert_eq!(parse_due_date("2024-12-31"), expected);
        assert_eq!(parse_due_date("2024-12-31T10:00:00"), expected);
        assert_eq!(parse_due_date("2024-12-31 10:00:00"), expected);
        assert_eq!(parse_due_date("2024-12-31T10:00:00+03:00"), expected);
        assert_eq!(parse_due_date("31.12.2024"), None);
        assert_eq!(parse_due_date(""), None);
    }

    #[test]
    fn test_create_defect_body() {
        let form = CreateDefect {
            title: "Crack".to_string(),
            description: "North wall".to_string(),
            priority: Priority::High,
            assignee_id: Some(3),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 15),
        };

        assert!(validate_form(&form).is_ok());
        assert_eq!(
            serde_json::to_value(&form).unwrap(),
            serde_json::json!({
                "title": "Crack",
                "description": "North wall",
                "priority": "high",
                "assignee_id": 3,
                "due_date": "2025-01-15"
            })
        );

        let blank = CreateDefect::default();
        assert_eq!(validate_form(&blank).unwrap_err()[0].field, "title");
    }

    #[test]
    fn test_unset_priority_not_serialized() {
        let form = CreateDefect {
            title: "Crack".to_string(),
            priority: Priority::Unset,
            ..CreateDefect::default()
        };
        let body = serde_json::to_value(&form).unwrap();
        assert!(body.get("priority").is_none());

        let defect: Defect = serde_json::from_str(r#"{"id":3,"title":"Gap","priority":"urgent"}"#).unwrap();
        assert!(defect.priority.is_unset());
        assert!(serde_json::to_value(&defect).unwrap().get("priority").is_none());
    }

    #[test]
    fn test_untitled_defect_keeps_list_decodable() {
        let defects: Vec<Defect> =
            serde_json::from_str(r#"[{"id":1,"title":"Leak"},{"id":2,"description":"no title"}]"#).unwrap();

        assert_eq!(defects.len(), 2);
        assert_eq!(defects[1].title, "");
        assert_eq!(defects[1].description, "no title");
    }
}
