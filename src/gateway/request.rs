//! Requests accepted by the gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::correlation::PendingKind;
use crate::error::BridgeError;

/// Content of a REQUEST asking the primary provider for its whole catalog.
pub const LIST_ALL_PRIMARY: &str = "LIST_ALL_PRIMARY";
/// Content of a REQUEST asking the secondary provider for its whole catalog.
pub const LIST_ALL_SECONDARY: &str = "LIST_ALL_SECONDARY";

/// Whether `title` collides with a listing sentinel. Providers would serve
/// such a title as a listing, so the gateway refuses to search for it.
pub fn is_reserved_title(title: &str) -> bool {
    title == LIST_ALL_PRIMARY || title == LIST_ALL_SECONDARY
}

/// Which backend(s) a listing is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Primary,
    Secondary,
    Both,
}

impl Source {
    /// The list sentinel for a single-source listing. `None` for [`Source::Both`].
    pub fn list_sentinel(self) -> Option<&'static str> {
        match self {
            Source::Primary => Some(LIST_ALL_PRIMARY),
            Source::Secondary => Some(LIST_ALL_SECONDARY),
            Source::Both => None,
        }
    }

    fn id_kind(self) -> &'static str {
        match self {
            Source::Primary => "listPrimary",
            Source::Secondary => "listSecondary",
            Source::Both => "listBoth",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::Primary => "primary",
            Source::Secondary => "secondary",
            Source::Both => "both",
        };
        f.write_str(s)
    }
}

impl FromStr for Source {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Source::Primary),
            "secondary" => Ok(Source::Secondary),
            "both" => Ok(Source::Both),
            other => Err(BridgeError::Config(format!("unknown source '{}'", other))),
        }
    }
}

/// A unit of work handed to the gateway by an external caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayRequest {
    /// Look up one record by title, with provider fallback.
    SearchByTitle { title: String },
    /// List every record of one or both sources.
    ListAll { source: Source },
}

impl GatewayRequest {
    pub fn search(title: impl Into<String>) -> Self {
        GatewayRequest::SearchByTitle {
            title: title.into(),
        }
    }

    pub fn list(source: Source) -> Self {
        GatewayRequest::ListAll { source }
    }

    /// Prefix used when minting the correlation id for this request.
    pub fn id_kind(&self) -> &'static str {
        match self {
            GatewayRequest::SearchByTitle { .. } => "search",
            GatewayRequest::ListAll { source } => source.id_kind(),
        }
    }

    /// Rejects requests the providers would misread.
    ///
    /// # Errors
    /// `BridgeError::InvalidRequest` for a search whose title is a listing
    /// sentinel.
    pub fn validate(&self) -> Result<(), BridgeError> {
        match self {
            GatewayRequest::SearchByTitle { title } if is_reserved_title(title) => Err(
                BridgeError::InvalidRequest(format!("'{}' is not a searchable title", title)),
            ),
            _ => Ok(()),
        }
    }

    /// How the pending entry for this request is resolved.
    pub fn pending_kind(&self) -> PendingKind {
        match self {
            GatewayRequest::ListAll {
                source: Source::Both,
            } => PendingKind::Join,
            _ => PendingKind::Single,
        }
    }
}

/// A request paired with the correlation id it was registered under.
#[derive(Debug, Clone)]
pub(crate) struct Submission {
    pub id: String,
    pub request: GatewayRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!("primary".parse::<Source>().unwrap(), Source::Primary);
        assert_eq!(" BOTH ".parse::<Source>().unwrap(), Source::Both);
        assert!("tertiary".parse::<Source>().is_err());
    }

    #[test]
    fn test_source_display_roundtrip() {
        for source in [Source::Primary, Source::Secondary, Source::Both] {
            assert_eq!(source.to_string().parse::<Source>().unwrap(), source);
        }
    }

    #[test]
    fn test_list_sentinels() {
        assert_eq!(Source::Primary.list_sentinel(), Some(LIST_ALL_PRIMARY));
        assert_eq!(Source::Secondary.list_sentinel(), Some(LIST_ALL_SECONDARY));
        assert_eq!(Source::Both.list_sentinel(), None);
    }

    #[test]
    fn test_id_kinds() {
        assert_eq!(GatewayRequest::search("x").id_kind(), "search");
        assert_eq!(GatewayRequest::list(Source::Primary).id_kind(), "listPrimary");
        assert_eq!(GatewayRequest::list(Source::Secondary).id_kind(), "listSecondary");
        assert_eq!(GatewayRequest::list(Source::Both).id_kind(), "listBoth");
    }

    #[test]
    fn test_only_both_joins() {
        assert_eq!(GatewayRequest::search("x").pending_kind(), PendingKind::Single);
        assert_eq!(
            GatewayRequest::list(Source::Secondary).pending_kind(),
            PendingKind::Single
        );
        assert_eq!(
            GatewayRequest::list(Source::Both).pending_kind(),
            PendingKind::Join
        );
    }

    #[test]
    fn test_sentinel_titles_rejected() {
        assert!(is_reserved_title(LIST_ALL_PRIMARY));
        assert!(is_reserved_title(LIST_ALL_SECONDARY));
        assert!(!is_reserved_title("list_all_primary"));
        assert!(matches!(
            GatewayRequest::search(LIST_ALL_SECONDARY).validate(),
            Err(BridgeError::InvalidRequest(_))
        ));
        assert!(GatewayRequest::search("Elden Ring").validate().is_ok());
        assert!(GatewayRequest::list(Source::Primary).validate().is_ok());
    }

    #[test]
    fn test_request_serde() {
        let json = serde_json::to_string(&GatewayRequest::list(Source::Both)).unwrap();
        assert_eq!(json, r#"{"type":"list_all","source":"both"}"#);
        let back: GatewayRequest =
            serde_json::from_str(r#"{"type":"search_by_title","title":"Hollow Knight"}"#).unwrap();
        assert_eq!(back, GatewayRequest::search("Hollow Knight"));
    }
}
