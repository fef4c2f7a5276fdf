//! Defect comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::{Identity, UserId};
use crate::validation::non_blank;

/// Comment identifier as issued by the API
pub type CommentId = u64;

/// Comment on a defect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique comment ID
    pub id: CommentId,

    /// Author, when the server embeds the record
    #[serde(default)]
    pub author: Option<Identity>,

    /// Author id
    #[serde(default)]
    pub author_id: Option<UserId>,

    /// Comment text
    #[serde(default)]
    pub body: String,

    /// When the comment was posted
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Author name, `#id`, or `anonymous`
    pub fn author_label(&self) -> String {
        match (&self.author, self.author_id) {
            (Some(author), _) => author.label(),
            (None, Some(id)) => format!("#{}", id),
            (None, None) => "anonymous".to_string(),
        }
    }
}

/// New comment form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateComment {
    /// Comment text
    #[validate(custom(function = "non_blank"))]
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_form;

    #[test]
    fn test_author_label() {
        let comment: Comment = serde_json::from_str(
            r#"{"id":1,"author_id":3,"author":{"id":3,"name":"Petr","role":"manager"},"body":"ok"}"#,
        )
        .unwrap();
        assert_eq!(comment.author_label(), "Petr");

        let bare: Comment = serde_json::from_str(r#"{"id":2,"author_id":8,"body":"x"}"#).unwrap();
        assert_eq!(bare.author_label(), "#8");

        let orphan: Comment = serde_json::from_str(r#"{"id":3,"author":null,"body":"x"}"#).unwrap();
        assert_eq!(orphan.author_label(), "anonymous");
    }

    #[test]
    fn test_blank_comment_rejected() {
        let form = CreateComment {
            body: "\n  ".to_string(),
        };
        assert!(validate_form(&form).is_err());
    }
}
