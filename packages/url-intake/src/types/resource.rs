//! Resource - the stored mapping from an identity back to its URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::identity::UrlIdentity;

/// A known URL.
///
/// The identity digest is not reversible, so the submitted URL is kept here
/// for the job payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub identity: UrlIdentity,
    pub raw_url: String,
    pub first_seen_at: DateTime<Utc>,
}

impl Resource {
    /// Create a resource for a raw URL, computing its identity.
    pub fn from_url(raw_url: &str) -> Result<Self, ValidationError> {
        let identity = UrlIdentity::from_url(raw_url)?;
        Ok(Self {
            identity,
            raw_url: raw_url.trim().to_string(),
            first_seen_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_trims() {
        let resource = Resource::from_url("  https://example.com/stew  ").unwrap();
        assert_eq!(resource.raw_url, "https://example.com/stew");
        assert_eq!(
            resource.identity,
            UrlIdentity::from_url("https://example.com/stew").unwrap()
        );
    }

    #[test]
    fn test_blank_rejected() {
        assert_eq!(Resource::from_url(" "), Err(ValidationError::BlankUrl));
    }
}
