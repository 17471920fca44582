use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PublicationState, Tag};
use crate::error::DomainError;

/// Post entity - a blog entry without its markdown body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub state: PublicationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post owned by `owner_id`.
    ///
    /// Ids are UUIDv7 so that ordering by id follows insertion order,
    /// which the catalog uses as the tie-breaker after `created_at`.
    pub fn new(owner_id: Uuid, title: String, image_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id,
            title,
            image_url,
            state: PublicationState::initial(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Fails with `Forbidden` unless `caller` owns this post.
    pub fn ensure_owner(&self, caller: Uuid) -> Result<(), DomainError> {
        if self.is_owned_by(caller) {
            Ok(())
        } else {
            Err(DomainError::Forbidden {
                entity_type: "post",
                id: self.id,
            })
        }
    }

    /// Owner-gated publish/unpublish toggle. Returns the new state.
    pub fn toggle_publication(&mut self, caller: Uuid) -> Result<PublicationState, DomainError> {
        self.ensure_owner(caller)?;
        self.state = self.state.toggled();
        self.updated_at = Utc::now();
        Ok(self.state)
    }

    /// Published posts are visible to everyone, other states only to the owner.
    pub fn is_visible_to(&self, caller: Option<Uuid>) -> bool {
        self.state.is_public() || caller.is_some_and(|id| self.is_owned_by(id))
    }
}

/// Catalog projection of a post: the row plus its flattened tag names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub post: Post,
    pub tag_names: Vec<String>,
}

/// Full post as returned by detail retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    pub content: String,
    pub tags: Vec<Tag>,
}

/// Everything persisted atomically when a post is created.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub post: Post,
    pub content: String,
    pub tag_ids: BTreeSet<Uuid>,
}

/// Replacement values for an edit; tags are reconciled, not replaced.
#[derive(Debug, Clone)]
pub struct PostRevision {
    pub title: String,
    pub image_url: Option<String>,
    pub content: String,
    pub tag_ids: BTreeSet<Uuid>,
    pub updated_at: DateTime<Utc>,
}
