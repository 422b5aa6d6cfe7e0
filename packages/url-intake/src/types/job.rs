//! Messages exchanged with the external extraction worker.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::types::content::ContentItem;
use crate::types::identity::UrlIdentity;
use crate::types::request::{ExtractionRequest, RequestId};

/// Job handed to the worker when a new request is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescription {
    pub request_id: RequestId,
    pub identity: UrlIdentity,
    pub raw_url: String,
    pub requested_at: DateTime<Utc>,
}

impl JobDescription {
    pub fn for_request(request: &ExtractionRequest, raw_url: impl Into<String>) -> Self {
        Self {
            request_id: request.id(),
            identity: request.identity().clone(),
            raw_url: raw_url.into(),
            requested_at: Utc::now(),
        }
    }
}

/// Worker notification that it picked a job up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStarted {
    pub request_id: RequestId,
}

/// Worker report of a finished job. Delivered at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub request_id: RequestId,
    pub success: bool,

    /// Present if `success`
    #[serde(default)]
    pub title: Option<String>,

    /// Present if `success`
    #[serde(default)]
    pub items: Option<Vec<ReportedItem>>,

    /// Present if not `success`
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobOutcome {
    pub fn succeeded(
        request_id: RequestId,
        title: impl Into<String>,
        items: Vec<ReportedItem>,
    ) -> Self {
        Self {
            request_id,
            success: true,
            title: Some(title.into()),
            items: Some(items),
            error_message: None,
        }
    }

    pub fn failed(request_id: RequestId, error_message: impl Into<String>) -> Self {
        Self {
            request_id,
            success: false,
            title: None,
            items: None,
            error_message: Some(error_message.into()),
        }
    }

    /// Reported items converted to content items.
    ///
    /// Items without a usable label are dropped.
    pub fn content_items(&self) -> Vec<ContentItem> {
        self.items
            .iter()
            .flatten()
            .filter_map(|item| item.to_content_item(self.request_id))
            .collect()
    }
}

/// Item as reported by the worker; the amount is free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedItem {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub label: String,
}

impl ReportedItem {
    pub fn new(amount: Option<&str>, unit: Option<&str>, label: impl Into<String>) -> Self {
        Self {
            amount: amount.map(str::to_string),
            unit: unit.map(str::to_string),
            label: label.into(),
        }
    }

    fn to_content_item(&self, request_id: RequestId) -> Option<ContentItem> {
        let amount = self
            .amount
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .and_then(|a| match Decimal::from_str(a) {
                Ok(amount) => Some(amount),
                Err(_) => {
                    debug!(request_id = %request_id, amount = %a, "Could not parse item amount");
                    None
                }
            });

        match ContentItem::new(amount, self.unit.clone(), self.label.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Dropping reported item");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_items_parse_amounts() {
        let outcome = JobOutcome::succeeded(
            RequestId::new(),
            "Pancakes",
            vec![
                ReportedItem::new(Some("1.5"), Some("cups"), "flour"),
                ReportedItem::new(Some("a pinch"), None, "salt"),
                ReportedItem::new(None, None, "butter"),
            ],
        );

        let items = outcome.content_items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].amount, Some(Decimal::from_str("1.5").unwrap()));
        assert_eq!(items[0].unit.as_deref(), Some("cups"));
        assert_eq!(items[1].amount, None);
        assert_eq!(items[1].label, "salt");
        assert_eq!(items[2].amount, None);
    }

    #[test]
    fn test_blank_labels_dropped() {
        let outcome = JobOutcome::succeeded(
            RequestId::new(),
            "Soup",
            vec![
                ReportedItem::new(Some("2"), None, "  "),
                ReportedItem::new(None, None, "water"),
            ],
        );

        let items = outcome.content_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "water");
    }

    #[test]
    fn test_outcome_deserializes_with_missing_optionals() {
        let id = RequestId::new();
        let json = format!(r#"{{"request_id":"{}","success":false}}"#, id);
        let outcome: JobOutcome = serde_json::from_str(&json).unwrap();

        assert_eq!(outcome.request_id, id);
        assert!(!outcome.success);
        assert!(outcome.error_message.is_none());
        assert!(outcome.content_items().is_empty());
    }
}
