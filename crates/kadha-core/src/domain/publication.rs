//! Publication lifecycle of a post.
//!
//! ```text
//!   create ──► Published ◄──toggle──► Unpublished
//!                 ▲
//!   Draft ──toggle┘
//! ```
//!
//! There is no terminal state: unpublishing is the soft delete and can be
//! reverted indefinitely.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    /// Content exists but is not publicly listed.
    Draft,
    /// Publicly listed and readable.
    Published,
    /// Soft-deleted: retained and owner-visible, excluded from public listings.
    Unpublished,
}

impl PublicationState {
    /// State a freshly created post starts in.
    pub fn initial() -> Self {
        PublicationState::Published
    }

    /// Result of the single publish/unpublish toggle action.
    pub fn toggled(self) -> Self {
        match self {
            PublicationState::Published => PublicationState::Unpublished,
            PublicationState::Unpublished | PublicationState::Draft => PublicationState::Published,
        }
    }

    /// Whether posts in this state appear in public listings.
    pub fn is_public(self) -> bool {
        self == PublicationState::Published
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PublicationState::Draft => "draft",
            PublicationState::Published => "published",
            PublicationState::Unpublished => "unpublished",
        }
    }
}

impl fmt::Display for PublicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PublicationState::Draft),
            "published" => Ok(PublicationState::Published),
            "unpublished" => Ok(PublicationState::Unpublished),
            other => Err(format!("unknown publication state '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_posts_are_published() {
        assert_eq!(PublicationState::initial(), PublicationState::Published);
        assert!(PublicationState::initial().is_public());
    }

    #[test]
    fn test_toggle_is_reversible() {
        let start = PublicationState::Published;
        let once = start.toggled();
        assert_eq!(once, PublicationState::Unpublished);
        assert!(!once.is_public());
        assert_eq!(once.toggled(), start);
    }

    #[test]
    fn test_draft_toggles_to_published() {
        assert_eq!(
            PublicationState::Draft.toggled(),
            PublicationState::Published
        );
    }

    #[test]
    fn test_parse_round_trips_storage_names() {
        for state in [
            PublicationState::Draft,
            PublicationState::Published,
            PublicationState::Unpublished,
        ] {
            assert_eq!(state.as_str().parse::<PublicationState>(), Ok(state));
        }
        assert!("deleted".parse::<PublicationState>().is_err());
    }
}
