//! In-memory store - used when no database is configured, and in tests.
//!
//! Every logical operation runs under a single write (or read) guard, which
//! gives it the same all-or-nothing behaviour as a database transaction.
//! Note: Data is lost on process restart.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use kadha_core::catalog::{CatalogFilter, PageRequest, newest_first};
use kadha_core::domain::{Post, PostDetail, PostDraft, PostRevision, PostSummary, Tag, User};
use kadha_core::error::RepoError;
use kadha_core::ports::{
    BaseRepository, PostRepository, PublicationToggle, TagRemoval, TagRepository, UserRepository,
};
use kadha_core::reconcile::TagDelta;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    contents: HashMap<Uuid, String>,
    tags: HashMap<Uuid, Tag>,
    /// (post_id, tag_id); a set, so a pair can appear at most once.
    links: BTreeSet<(Uuid, Uuid)>,
}

impl Tables {
    fn tag_ids_of(&self, post_id: Uuid) -> BTreeSet<Uuid> {
        self.links
            .iter()
            .filter(|(post, _)| *post == post_id)
            .map(|(_, tag)| *tag)
            .collect()
    }

    fn tags_of(&self, post_id: Uuid) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .tag_ids_of(post_id)
            .into_iter()
            .filter_map(|id| self.tags.get(&id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn tag_names_of(&self, post_id: Uuid) -> Vec<String> {
        self.tags_of(post_id).into_iter().map(|t| t.name).collect()
    }

    fn check_tags_exist(&self, ids: &BTreeSet<Uuid>) -> Result<(), RepoError> {
        match ids.iter().find(|id| !self.tags.contains_key(id)) {
            Some(missing) => Err(RepoError::InvalidReference(missing.to_string())),
            None => Ok(()),
        }
    }

    fn matching(&self, filter: &CatalogFilter) -> Vec<&Post> {
        self.posts
            .values()
            .filter(|post| filter.matches(post, &self.tag_names_of(post.id)))
            .collect()
    }
}

/// In-memory implementation of every repository port.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of (post, tag) links currently stored.
    pub async fn link_count(&self) -> usize {
        self.tables.read().await.links.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Constraint("users.email".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_page(
        &self,
        filter: &CatalogFilter,
        page: PageRequest,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let tables = self.tables.read().await;
        let mut rows = tables.matching(filter);
        rows.sort_by(|a, b| newest_first(a, b));

        Ok(rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|post| PostSummary {
                post: post.clone(),
                tag_names: tables.tag_names_of(post.id),
            })
            .collect())
    }

    async fn count(&self, filter: &CatalogFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.matching(filter).len() as u64)
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError> {
        let tables = self.tables.read().await;
        let Some(post) = tables.posts.get(&id) else {
            return Ok(None);
        };
        Ok(Some(PostDetail {
            post: post.clone(),
            content: tables.contents.get(&id).cloned().unwrap_or_default(),
            tags: tables.tags_of(id),
        }))
    }

    async fn create_with_content(&self, draft: PostDraft) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_tags_exist(&draft.tag_ids)?;
        if tables.posts.contains_key(&draft.post.id) {
            return Err(RepoError::Constraint("posts.id".to_string()));
        }

        let post = draft.post;
        tables.posts.insert(post.id, post.clone());
        tables.contents.insert(post.id, draft.content);
        for tag_id in draft.tag_ids {
            tables.links.insert((post.id, tag_id));
        }
        Ok(post)
    }

    async fn revise(&self, id: Uuid, revision: PostRevision) -> Result<TagDelta, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        tables.check_tags_exist(&revision.tag_ids)?;

        let current = tables.tag_ids_of(id);
        let delta = TagDelta::between(&current, &revision.tag_ids);
        for tag_id in &delta.to_remove {
            tables.links.remove(&(id, *tag_id));
        }
        for tag_id in &delta.to_add {
            tables.links.insert((id, *tag_id));
        }

        if let Some(post) = tables.posts.get_mut(&id) {
            post.title = revision.title;
            post.image_url = revision.image_url;
            post.updated_at = revision.updated_at;
        }
        tables.contents.insert(id, revision.content);
        Ok(delta)
    }

    async fn toggle_state(&self, id: Uuid, caller: Uuid) -> Result<PublicationToggle, RepoError> {
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.get_mut(&id) else {
            return Ok(PublicationToggle::NotFound);
        };
        if post.toggle_publication(caller).is_err() {
            return Ok(PublicationToggle::NotOwner);
        }
        Ok(PublicationToggle::Toggled(post.clone()))
    }
}

#[async_trait]
impl BaseRepository<Tag, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tag>, RepoError> {
        Ok(self.tables.read().await.tags.get(&id).cloned())
    }
}

#[async_trait]
impl TagRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Tag>, RepoError> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().find(|t| t.name == name).cloned())
    }

    async fn insert(&self, tag: Tag) -> Result<Tag, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.tags.values().any(|t| t.name == tag.name) {
            return Err(RepoError::Constraint("tags.name".to_string()));
        }
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn delete_unused(&self, id: Uuid) -> Result<TagRemoval, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.tags.contains_key(&id) {
            return Ok(TagRemoval::NotFound);
        }
        let posts = tables.links.iter().filter(|(_, tag)| *tag == id).count() as u64;
        if posts > 0 {
            return Ok(TagRemoval::InUse { posts });
        }
        tables.tags.remove(&id);
        Ok(TagRemoval::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kadha_core::domain::PublicationState;

    async fn tag(store: &InMemoryStore, name: &str) -> Tag {
        TagRepository::insert(store, Tag::new(name)).await.unwrap()
    }

    async fn post_with_tags(store: &InMemoryStore, title: &str, tags: &[&Tag]) -> Post {
        let draft = PostDraft {
            post: Post::new(Uuid::new_v4(), title.to_string(), None),
            content: format!("# {}", title),
            tag_ids: tags.iter().map(|t| t.id).collect(),
        };
        store.create_with_content(draft).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_stores_content_and_links() {
        let store = InMemoryStore::new();
        let rust = tag(&store, "rust").await;
        let post = post_with_tags(&store, "Hello", &[&rust]).await;

        let detail = store.find_detail(post.id).await.unwrap().unwrap();
        assert_eq!(detail.content, "# Hello");
        assert_eq!(detail.tags, vec![rust]);
    }

    #[tokio::test]
    async fn test_unknown_tag_aborts_create() {
        let store = InMemoryStore::new();
        let ghost = Tag::new("ghost");
        let draft = PostDraft {
            post: Post::new(Uuid::new_v4(), "x".to_string(), None),
            content: "body".to_string(),
            tag_ids: [ghost.id].into_iter().collect(),
        };
        let id = draft.post.id;

        let err = store.create_with_content(draft).await.unwrap_err();

        assert!(matches!(err, RepoError::InvalidReference(_)));
        assert!(store.find_detail(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_page_and_count_share_filter() {
        let store = InMemoryStore::new();
        let a = tag(&store, "a").await;
        let b = tag(&store, "b").await;
        let c = tag(&store, "c").await;
        post_with_tags(&store, "first", &[&a]).await;
        post_with_tags(&store, "second", &[&b]).await;
        post_with_tags(&store, "third", &[&c]).await;

        let filter = CatalogFilter::public().with_tags(["a", "b"]);
        let page = store.find_page(&filter, PageRequest::new(1, 10)).await.unwrap();

        assert_eq!(store.count(&filter).await.unwrap(), 2);
        let titles: Vec<_> = page.iter().map(|s| s.post.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_unpublished_excluded_from_public_listing() {
        let store = InMemoryStore::new();
        let post = post_with_tags(&store, "hidden", &[]).await;
        store.toggle_state(post.id, post.owner_id).await.unwrap();

        assert_eq!(store.count(&CatalogFilter::public()).await.unwrap(), 0);
        assert_eq!(
            store
                .count(&CatalogFilter::public().including_unpublished())
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_toggle_state_is_owner_gated() {
        let store = InMemoryStore::new();
        let post = post_with_tags(&store, "toggled", &[]).await;

        assert_eq!(
            store.toggle_state(post.id, Uuid::new_v4()).await.unwrap(),
            PublicationToggle::NotOwner
        );
        assert_eq!(
            store.toggle_state(Uuid::new_v4(), post.owner_id).await.unwrap(),
            PublicationToggle::NotFound
        );

        let PublicationToggle::Toggled(hidden) =
            store.toggle_state(post.id, post.owner_id).await.unwrap()
        else {
            panic!("owner toggle was refused");
        };
        assert_eq!(hidden.state, PublicationState::Unpublished);
        assert_eq!(hidden.title, "toggled");
        assert!(hidden.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn test_revise_applies_minimal_delta() {
        let store = InMemoryStore::new();
        let t1 = tag(&store, "t1").await;
        let t2 = tag(&store, "t2").await;
        let t3 = tag(&store, "t3").await;
        let post = post_with_tags(&store, "post", &[&t1, &t2]).await;

        let revision = PostRevision {
            title: "post v2".to_string(),
            image_url: None,
            content: "new body".to_string(),
            tag_ids: [t2.id, t3.id].into_iter().collect(),
            updated_at: chrono::Utc::now(),
        };
        let delta = store.revise(post.id, revision.clone()).await.unwrap();

        assert_eq!(delta.to_remove, [t1.id].into_iter().collect());
        assert_eq!(delta.to_add, [t3.id].into_iter().collect());
        assert_eq!(store.link_count().await, 2);

        let again = store.revise(post.id, revision).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(store.link_count().await, 2);
    }

    #[tokio::test]
    async fn test_delete_unused_tag() {
        let store = InMemoryStore::new();
        let used = tag(&store, "used").await;
        let free = tag(&store, "free").await;
        post_with_tags(&store, "p", &[&used]).await;

        assert_eq!(
            store.delete_unused(used.id).await.unwrap(),
            TagRemoval::InUse { posts: 1 }
        );
        assert_eq!(
            store.delete_unused(free.id).await.unwrap(),
            TagRemoval::Deleted
        );
        assert_eq!(
            store.delete_unused(free.id).await.unwrap(),
            TagRemoval::NotFound
        );
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let store = InMemoryStore::new();
        tag(&store, "rust").await;

        let err = TagRepository::insert(&store, Tag::new("rust"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }
}
