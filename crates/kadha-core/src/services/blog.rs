//! Catalog reads and the owner-gated post and tag mutations.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::catalog::{CatalogPage, CatalogParams, CatalogQuery, CatalogSettings, Pagination};
use crate::domain::{Post, PostDetail, PostDraft, PostRevision, Tag};
use crate::error::{DomainError, RepoError};
use crate::ports::{PostRepository, PublicationToggle, TagRemoval, TagRepository};

pub const MAX_TITLE_LENGTH: usize = 200;

/// Who may read a post that is not published by fetching it by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnpublishedReadPolicy {
    /// Anyone holding the id (shareable preview links).
    #[default]
    Public,
    /// Only the owner; everyone else gets `NotFound`.
    OwnerOnly,
}

impl FromStr for UnpublishedReadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(UnpublishedReadPolicy::Public),
            "owner" | "owner_only" => Ok(UnpublishedReadPolicy::OwnerOnly),
            other => Err(format!("unknown unpublished read policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlogSettings {
    pub catalog: CatalogSettings,
    pub unpublished_reads: UnpublishedReadPolicy,
}

/// Post form shared by create and edit.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub content: Option<String>,
    pub tag_ids: Vec<Uuid>,
}

struct ValidPost {
    title: String,
    image_url: Option<String>,
    content: String,
    tag_ids: BTreeSet<Uuid>,
}

impl PostInput {
    fn validate(self) -> Result<ValidPost, DomainError> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DomainError::Validation("Title is required".to_string()))?;
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(DomainError::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        // Markdown is stored verbatim; only an all-blank body is rejected.
        let content = self
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| DomainError::Validation("Content is required".to_string()))?;

        let image_url = self
            .image_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        Ok(ValidPost {
            title,
            image_url,
            content,
            tag_ids: self.tag_ids.into_iter().collect(),
        })
    }
}

/// Blog operations over the post and tag stores.
#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostRepository>,
    tags: Arc<dyn TagRepository>,
    settings: BlogSettings,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        tags: Arc<dyn TagRepository>,
        settings: BlogSettings,
    ) -> Self {
        Self {
            posts,
            tags,
            settings,
        }
    }

    pub fn settings(&self) -> &BlogSettings {
        &self.settings
    }

    /// Paginated catalog listing.
    pub async fn list(
        &self,
        params: &CatalogParams,
        include_unpublished: bool,
    ) -> Result<CatalogPage, DomainError> {
        let query = CatalogQuery::from_params(params, include_unpublished, &self.settings.catalog);
        self.query(&query).await
    }

    /// Author listing: every state, narrowed to the caller's own unpublished
    /// posts under the owner-only read policy.
    pub async fn list_for_author(
        &self,
        params: &CatalogParams,
        caller: Uuid,
    ) -> Result<CatalogPage, DomainError> {
        let mut query = CatalogQuery::from_params(params, true, &self.settings.catalog);
        if self.settings.unpublished_reads == UnpublishedReadPolicy::OwnerOnly {
            query.filter = query.filter.including_unpublished_of(caller);
        }
        self.query(&query).await
    }

    /// Run a normalised catalog query: the count and the page share one filter.
    pub async fn query(&self, query: &CatalogQuery) -> Result<CatalogPage, DomainError> {
        let total = self.posts.count(&query.filter).await?;
        let pagination = Pagination::new(query.page, total);

        let posts = if query.page.offset() >= total {
            Vec::new()
        } else {
            self.posts.find_page(&query.filter, query.page).await?
        };

        tracing::debug!(
            page = pagination.current_page,
            total_count = total,
            returned = posts.len(),
            "Catalog page served"
        );
        Ok(CatalogPage { posts, pagination })
    }

    /// Detail retrieval, subject to the unpublished read policy.
    pub async fn get(&self, id: Uuid, caller: Option<Uuid>) -> Result<PostDetail, DomainError> {
        let detail = self
            .posts
            .find_detail(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))?;

        if self.settings.unpublished_reads == UnpublishedReadPolicy::OwnerOnly
            && !detail.post.is_visible_to(caller)
        {
            return Err(DomainError::not_found("post", id));
        }
        Ok(detail)
    }

    /// Create a post with its content and tags in one atomic unit. New posts are published.
    pub async fn create(&self, owner: Uuid, input: PostInput) -> Result<PostDetail, DomainError> {
        let valid = input.validate()?;
        let draft = PostDraft {
            post: Post::new(owner, valid.title, valid.image_url),
            content: valid.content,
            tag_ids: valid.tag_ids,
        };

        let post = self
            .posts
            .create_with_content(draft)
            .await
            .map_err(unknown_tag_as_validation)?;

        tracing::info!(post_id = %post.id, owner_id = %owner, "Post created");
        self.reload(post.id).await
    }

    /// Owner-only edit: replaces fields and content, reconciles tags.
    pub async fn edit(
        &self,
        caller: Uuid,
        id: Uuid,
        input: PostInput,
    ) -> Result<PostDetail, DomainError> {
        self.owned_post(caller, id).await?;
        let valid = input.validate()?;

        let revision = PostRevision {
            title: valid.title,
            image_url: valid.image_url,
            content: valid.content,
            tag_ids: valid.tag_ids,
            updated_at: Utc::now(),
        };

        let delta = self
            .posts
            .revise(id, revision)
            .await
            .map_err(|e| match e {
                RepoError::NotFound => DomainError::not_found("post", id),
                other => unknown_tag_as_validation(other),
            })?;

        tracing::info!(
            post_id = %id,
            tags_added = delta.to_add.len(),
            tags_removed = delta.to_remove.len(),
            "Post edited"
        );
        self.reload(id).await
    }

    /// Owner-only publish/unpublish toggle; this is also the soft delete.
    pub async fn toggle_publication(&self, caller: Uuid, id: Uuid) -> Result<Post, DomainError> {
        match self.posts.toggle_state(id, caller).await? {
            PublicationToggle::Toggled(post) => {
                tracing::info!(post_id = %id, state = %post.state, "Publication toggled");
                Ok(post)
            }
            PublicationToggle::NotOwner => Err(DomainError::Forbidden {
                entity_type: "post",
                id,
            }),
            PublicationToggle::NotFound => Err(DomainError::not_found("post", id)),
        }
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, DomainError> {
        Ok(self.tags.list().await?)
    }

    /// Idempotent by name. A concurrent insert of the same name is resolved by re-reading.
    pub async fn find_or_create_tag(&self, raw_name: &str) -> Result<Tag, DomainError> {
        let name = Tag::normalize_name(raw_name)
            .ok_or_else(|| DomainError::Validation("Tag name cannot be blank".to_string()))?;

        if let Some(tag) = self.tags.find_by_name(&name).await? {
            return Ok(tag);
        }

        match self.tags.insert(Tag::new(name.clone())).await {
            Ok(tag) => {
                tracing::info!(tag_id = %tag.id, tag_name = %tag.name, "Tag created");
                Ok(tag)
            }
            Err(RepoError::Constraint(_)) => {
                tracing::debug!(tag_name = %name, "Tag created concurrently, re-reading");
                self.tags.find_by_name(&name).await?.ok_or_else(|| {
                    DomainError::Internal(format!("tag '{}' vanished after conflict", name))
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Bulk find-or-create. Results follow the order of first appearance.
    pub async fn create_tags(&self, names: &[String]) -> Result<Vec<Tag>, DomainError> {
        let mut seen = BTreeSet::new();
        let wanted: Vec<String> = names
            .iter()
            .filter_map(|n| Tag::normalize_name(n))
            .filter(|n| seen.insert(n.clone()))
            .collect();

        if wanted.is_empty() {
            return Err(DomainError::Validation(
                "At least one tag name is required".to_string(),
            ));
        }

        let mut tags = Vec::with_capacity(wanted.len());
        for name in &wanted {
            tags.push(self.find_or_create_tag(name).await?);
        }
        Ok(tags)
    }

    /// Delete a tag that no post links to.
    pub async fn delete_tag(&self, id: Uuid) -> Result<(), DomainError> {
        match self.tags.delete_unused(id).await? {
            TagRemoval::Deleted => {
                tracing::info!(tag_id = %id, "Tag deleted");
                Ok(())
            }
            TagRemoval::InUse { posts } => Err(DomainError::TagInUse { id, posts }),
            TagRemoval::NotFound => Err(DomainError::not_found("tag", id)),
        }
    }

    async fn owned_post(&self, caller: Uuid, id: Uuid) -> Result<Post, DomainError> {
        let post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))?;
        post.ensure_owner(caller)?;
        Ok(post)
    }

    async fn reload(&self, id: Uuid) -> Result<PostDetail, DomainError> {
        self.posts
            .find_detail(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }
}

fn unknown_tag_as_validation(err: RepoError) -> DomainError {
    match err {
        RepoError::InvalidReference(detail) => {
            DomainError::Validation(format!("Unknown tag id: {}", detail))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::catalog::{CatalogFilter, PageRequest};
    use crate::domain::PostSummary;
    use crate::ports::BaseRepository;
    use crate::reconcile::TagDelta;

    /// Post store for tests that never reach it.
    struct NoPosts;

    #[async_trait]
    impl BaseRepository<Post, Uuid> for NoPosts {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Post>, RepoError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl PostRepository for NoPosts {
        async fn find_page(
            &self,
            _filter: &CatalogFilter,
            _page: PageRequest,
        ) -> Result<Vec<PostSummary>, RepoError> {
            Ok(Vec::new())
        }

        async fn count(&self, _filter: &CatalogFilter) -> Result<u64, RepoError> {
            Ok(0)
        }

        async fn find_detail(&self, _id: Uuid) -> Result<Option<PostDetail>, RepoError> {
            Ok(None)
        }

        async fn create_with_content(&self, _draft: PostDraft) -> Result<Post, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn revise(&self, _id: Uuid, _rev: PostRevision) -> Result<TagDelta, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn toggle_state(
            &self,
            _id: Uuid,
            _caller: Uuid,
        ) -> Result<PublicationToggle, RepoError> {
            Ok(PublicationToggle::NotFound)
        }
    }

    /// Tag store that loses every insert race: the first lookup misses, the
    /// insert hits the unique constraint, later lookups return `winner`.
    struct RacedTags {
        winner: Option<Tag>,
        lookups: Mutex<u32>,
    }

    #[async_trait]
    impl BaseRepository<Tag, Uuid> for RacedTags {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Tag>, RepoError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl TagRepository for RacedTags {
        async fn list(&self) -> Result<Vec<Tag>, RepoError> {
            Ok(self.winner.iter().cloned().collect())
        }

        async fn find_by_name(&self, _name: &str) -> Result<Option<Tag>, RepoError> {
            let mut lookups = self.lookups.lock().unwrap();
            *lookups += 1;
            Ok(if *lookups == 1 { None } else { self.winner.clone() })
        }

        async fn insert(&self, _tag: Tag) -> Result<Tag, RepoError> {
            Err(RepoError::Constraint("tags.name".to_string()))
        }

        async fn delete_unused(&self, _id: Uuid) -> Result<TagRemoval, RepoError> {
            Ok(TagRemoval::NotFound)
        }
    }

    fn raced(winner: Option<Tag>) -> BlogService {
        let tags = RacedTags {
            winner,
            lookups: Mutex::new(0),
        };
        BlogService::new(Arc::new(NoPosts), Arc::new(tags), BlogSettings::default())
    }

    #[tokio::test]
    async fn test_tag_insert_conflict_returns_existing_tag() {
        let existing = Tag::new("rust");
        let blog = raced(Some(existing.clone()));

        assert_eq!(blog.find_or_create_tag(" rust ").await.unwrap(), existing);
    }

    #[tokio::test]
    async fn test_tag_insert_conflict_without_reread_is_internal() {
        let blog = raced(None);

        assert!(matches!(
            blog.find_or_create_tag("rust").await,
            Err(DomainError::Internal(_))
        ));
    }

    fn input(title: Option<&str>, content: Option<&str>) -> PostInput {
        PostInput {
            title: title.map(str::to_string),
            content: content.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_and_content_required() {
        assert!(matches!(
            input(None, Some("body")).validate(),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            input(Some("   "), Some("body")).validate(),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            input(Some("Title"), Some("\n  \n")).validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_content_kept_verbatim_and_tags_deduplicated() {
        let tag = Uuid::new_v4();
        let valid = PostInput {
            title: Some("  Hello ".to_string()),
            image_url: Some("   ".to_string()),
            content: Some("# Heading\n\n  indented\n".to_string()),
            tag_ids: vec![tag, tag],
        }
        .validate()
        .unwrap();

        assert_eq!(valid.title, "Hello");
        assert_eq!(valid.image_url, None);
        assert_eq!(valid.content, "# Heading\n\n  indented\n");
        assert_eq!(valid.tag_ids.len(), 1);
    }

    #[test]
    fn test_read_policy_parsing() {
        assert_eq!(
            "owner".parse::<UnpublishedReadPolicy>(),
            Ok(UnpublishedReadPolicy::OwnerOnly)
        );
        assert_eq!(
            " Public ".parse::<UnpublishedReadPolicy>(),
            Ok(UnpublishedReadPolicy::Public)
        );
        assert!("everyone".parse::<UnpublishedReadPolicy>().is_err());
    }
}
