use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{CatalogFilter, PageRequest};
use crate::domain::{Post, PostDetail, PostDraft, PostRevision, PostSummary, Tag, User};
use crate::error::RepoError;
use crate::reconcile::TagDelta;

/// Generic repository trait defining the shared row operations.
///
/// Writes are entity specific (posts are only ever created together with
/// their content, and only ever change through guarded operations), so they
/// live on the individual repository traits.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Insert a new user. A taken email surfaces as `RepoError::Constraint`.
    async fn insert(&self, user: User) -> Result<User, RepoError>;
}

/// Post repository: catalog queries plus the transactional post mutations.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// One page of summaries matching `filter`, newest first.
    async fn find_page(
        &self,
        filter: &CatalogFilter,
        page: PageRequest,
    ) -> Result<Vec<PostSummary>, RepoError>;

    /// Number of posts matching `filter`.
    async fn count(&self, filter: &CatalogFilter) -> Result<u64, RepoError>;

    /// Post joined with its content and tags.
    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError>;

    /// Persist post, content and tag links as one atomic unit.
    ///
    /// Unknown tag ids surface as `RepoError::InvalidReference` and nothing is written.
    async fn create_with_content(&self, draft: PostDraft) -> Result<Post, RepoError>;

    /// Replace title, image and content and reconcile tag links as one atomic unit.
    ///
    /// The current links are read inside the same unit; the applied delta is returned.
    async fn revise(&self, id: Uuid, revision: PostRevision) -> Result<TagDelta, RepoError>;

    /// Flip the publication state of a post owned by `caller` as one atomic unit.
    ///
    /// Only the state and `updated_at` are written, so a concurrent revision is never undone.
    async fn toggle_state(&self, id: Uuid, caller: Uuid) -> Result<PublicationToggle, RepoError>;
}

/// Outcome of an owner-gated publication toggle.
#[derive(Debug, Clone, PartialEq)]
pub enum PublicationToggle {
    Toggled(Post),
    NotOwner,
    NotFound,
}

/// Outcome of a guarded tag deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRemoval {
    Deleted,
    InUse { posts: u64 },
    NotFound,
}

/// Tag repository.
#[async_trait]
pub trait TagRepository: BaseRepository<Tag, Uuid> {
    /// All tags ordered by name.
    async fn list(&self) -> Result<Vec<Tag>, RepoError>;

    /// Find a tag by its unique name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, RepoError>;

    /// Insert a new tag. A taken name surfaces as `RepoError::Constraint`.
    async fn insert(&self, tag: Tag) -> Result<Tag, RepoError>;

    /// Delete a tag only when no post links to it.
    async fn delete_unused(&self, id: Uuid) -> Result<TagRemoval, RepoError>;
}
