//! Scanned mail items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Physical state of a mail item in the mailroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailItemStatus {
    Received,
    Forwarded,
    Destroyed,
}

impl MailItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailItemStatus::Received => "received",
            MailItemStatus::Forwarded => "forwarded",
            MailItemStatus::Destroyed => "destroyed",
        }
    }

    /// Only items still held in the mailroom can be forwarded or destroyed.
    pub fn is_on_hand(&self) -> bool {
        *self == MailItemStatus::Received
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MailItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sender_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_url: Option<String>,
    pub status: MailItemStatus,
    pub is_read: bool,
    pub archived: bool,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for the customer inbox.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListMailItemsQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_archived: bool,
}

/// One page of the inbox.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MailItemPage {
    pub items: Vec<MailItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Customer edits to an item. Absent fields are left unchanged;
/// an empty `tag` clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateMailItemRequest {
    #[validate(length(max = 50, message = "Tag must be at most 50 characters"))]
    pub tag: Option<String>,
    pub is_read: Option<bool>,
    pub archived: Option<bool>,
}

impl UpdateMailItemRequest {
    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.is_read.is_none() && self.archived.is_none()
    }
}

/// Mailroom intake of a newly scanned item.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateMailItemRequest {
    pub user_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Sender name must be 1-200 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub sender_name: String,

    #[validate(length(max = 300, message = "Subject must be at most 300 characters"))]
    pub subject: Option<String>,

    #[validate(length(max = 50, message = "Tag must be at most 50 characters"))]
    pub tag: Option<String>,

    #[validate(custom(function = "shared::validation::validate_https_url"))]
    pub scan_url: Option<String>,

    pub received_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_received_is_on_hand() {
        assert!(MailItemStatus::Received.is_on_hand());
        assert!(!MailItemStatus::Forwarded.is_on_hand());
        assert!(!MailItemStatus::Destroyed.is_on_hand());
    }

    #[test]
    fn test_update_request_is_empty() {
        assert!(UpdateMailItemRequest::default().is_empty());
        let req: UpdateMailItemRequest = serde_json::from_str(r#"{"is_read":true}"#).unwrap();
        assert!(!req.is_empty());
    }

    #[test]
    fn test_create_request_requires_https_scan() {
        let req = CreateMailItemRequest {
            user_id: Uuid::new_v4(),
            sender_name: "HMRC".to_string(),
            subject: None,
            tag: Some("tax".to_string()),
            scan_url: Some("http://insecure.example.com/scan.pdf".to_string()),
            received_at: None,
        };
        assert!(req.validate().is_err());

        let req = CreateMailItemRequest {
            scan_url: Some("https://scans.example.com/scan.pdf".to_string()),
            ..req
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_list_query_defaults() {
        let q: ListMailItemsQuery = serde_json::from_str("{}").unwrap();
        assert!(q.cursor.is_none());
        assert!(!q.include_archived);
    }
}
