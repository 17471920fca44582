//! PostgreSQL repository implementations.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use kadha_core::catalog::{CatalogFilter, PageRequest};
use kadha_core::domain::{Post, PostDetail, PostDraft, PostRevision, PostSummary, Tag, User};
use kadha_core::error::RepoError;
use kadha_core::ports::{
    PostRepository, PublicationToggle, TagRemoval, TagRepository, UserRepository,
};
use kadha_core::reconcile::TagDelta;

use super::entity::post::{self, Entity as PostEntity, PostState};
use super::entity::post_content::{self, Entity as PostContentEntity};
use super::entity::post_tag::{self, Entity as PostTagEntity};
use super::entity::tag::{self, Entity as TagEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL tag repository.
pub type PostgresTagRepository = PostgresBaseRepository<TagEntity>;

/// Mask the local part of an email to keep PII out of logs.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) if local.chars().count() > 1 => format!("{}***@{}", first, domain),
            _ => format!("***@{}", domain),
        },
        None => "***".to_string(),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        self.bounded(async {
            let result = UserEntity::find()
                .filter(user::Column::Email.eq(email))
                .one(&self.db)
                .await
                .map_err(db_err)?;
            Ok(result.map(Into::into))
        })
        .await
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let model: user::ActiveModel = user.into();
        self.bounded(async {
            let inserted = model.insert(&self.db).await.map_err(db_err)?;
            Ok(inserted.into())
        })
        .await
    }
}

/// Escape LIKE metacharacters so user text only ever matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SQL rendition of `CatalogFilter::matches`.
fn filtered(filter: &CatalogFilter) -> Select<PostEntity> {
    let mut select = PostEntity::find();

    if !filter.include_unpublished() {
        let mut visible = Condition::any().add(post::Column::State.eq(PostState::Published));
        if let Some(owner) = filter.unpublished_owner() {
            visible = visible.add(post::Column::OwnerId.eq(owner));
        }
        select = select.filter(visible);
    }

    if let Some(text) = filter.text() {
        let pattern = format!("%{}%", escape_like(text));
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(post::Column::Title)))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }

    if !filter.tag_names().is_empty() {
        let tagged = Query::select()
            .column((PostTagEntity, post_tag::Column::PostId))
            .from(PostTagEntity)
            .inner_join(
                TagEntity,
                Expr::col((TagEntity, tag::Column::Id))
                    .equals((PostTagEntity, post_tag::Column::TagId)),
            )
            .and_where(
                Expr::col((TagEntity, tag::Column::Name))
                    .is_in(filter.tag_names().iter().cloned()),
            )
            .to_owned();
        select = select.filter(post::Column::Id.in_subquery(tagged));
    }

    select
}

/// Tags attached to each of `post_ids`, sorted by name.
async fn tags_by_post<C>(db: &C, post_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>, RepoError>
where
    C: ConnectionTrait,
{
    let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    if post_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = PostTagEntity::find()
        .filter(post_tag::Column::PostId.is_in(post_ids.iter().copied()))
        .find_also_related(TagEntity)
        .all(db)
        .await
        .map_err(db_err)?;

    for (link, tag) in rows {
        if let Some(tag) = tag {
            grouped.entry(link.post_id).or_default().push(tag.into());
        }
    }
    for tags in grouped.values_mut() {
        tags.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(grouped)
}

/// Insert `(post_id, tag_id)` links; pairs that already exist are skipped.
async fn insert_links<C>(db: &C, post_id: Uuid, tag_ids: &BTreeSet<Uuid>) -> Result<(), RepoError>
where
    C: ConnectionTrait,
{
    if tag_ids.is_empty() {
        return Ok(());
    }

    let links = tag_ids.iter().map(|tag_id| post_tag::ActiveModel {
        post_id: Set(post_id),
        tag_id: Set(*tag_id),
    });

    PostTagEntity::insert_many(links)
        .on_conflict(
            OnConflict::columns([post_tag::Column::PostId, post_tag::Column::TagId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_page(
        &self,
        filter: &CatalogFilter,
        page: PageRequest,
    ) -> Result<Vec<PostSummary>, RepoError> {
        self.bounded(async {
            let posts = filtered(filter)
                .order_by_desc(post::Column::CreatedAt)
                .order_by_desc(post::Column::Id)
                .offset(page.offset())
                .limit(page.limit())
                .all(&self.db)
                .await
                .map_err(db_err)?;

            let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
            let mut tags = tags_by_post(&self.db, &ids).await?;

            Ok(posts
                .into_iter()
                .map(|model| {
                    let tag_names = tags
                        .remove(&model.id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|t| t.name)
                        .collect();
                    PostSummary {
                        post: model.into(),
                        tag_names,
                    }
                })
                .collect())
        })
        .await
    }

    async fn count(&self, filter: &CatalogFilter) -> Result<u64, RepoError> {
        self.bounded(async { filtered(filter).count(&self.db).await.map_err(db_err) })
            .await
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError> {
        self.bounded(async {
            let Some(model) = PostEntity::find_by_id(id)
                .one(&self.db)
                .await
                .map_err(db_err)?
            else {
                return Ok(None);
            };

            let content = PostContentEntity::find_by_id(id)
                .one(&self.db)
                .await
                .map_err(db_err)?
                .map(|c| c.body)
                .unwrap_or_default();
            let tags = tags_by_post(&self.db, &[id])
                .await?
                .remove(&id)
                .unwrap_or_default();

            Ok(Some(PostDetail {
                post: model.into(),
                content,
                tags,
            }))
        })
        .await
    }

    async fn create_with_content(&self, draft: PostDraft) -> Result<Post, RepoError> {
        let PostDraft {
            post,
            content,
            tag_ids,
        } = draft;

        self.bounded(async {
            let txn = self.db.begin().await.map_err(db_err)?;

            let row: post::ActiveModel = post.into();
            let inserted = row.insert(&txn).await.map_err(db_err)?;

            post_content::ActiveModel {
                post_id: Set(inserted.id),
                body: Set(content),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;

            insert_links(&txn, inserted.id, &tag_ids).await?;

            txn.commit().await.map_err(db_err)?;
            tracing::debug!(post_id = %inserted.id, tags = tag_ids.len(), "Post persisted");
            Ok(inserted.into())
        })
        .await
    }

    async fn revise(&self, id: Uuid, revision: PostRevision) -> Result<TagDelta, RepoError> {
        self.bounded(async {
            let txn = self.db.begin().await.map_err(db_err)?;

            // Row lock serialises concurrent edits of the same post.
            PostEntity::find_by_id(id)
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(db_err)?
                .ok_or(RepoError::NotFound)?;

            let current: BTreeSet<Uuid> = PostTagEntity::find()
                .filter(post_tag::Column::PostId.eq(id))
                .all(&txn)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(|link| link.tag_id)
                .collect();
            let delta = TagDelta::between(&current, &revision.tag_ids);

            if !delta.to_remove.is_empty() {
                PostTagEntity::delete_many()
                    .filter(post_tag::Column::PostId.eq(id))
                    .filter(post_tag::Column::TagId.is_in(delta.to_remove.iter().copied()))
                    .exec(&txn)
                    .await
                    .map_err(db_err)?;
            }
            insert_links(&txn, id, &delta.to_add).await?;

            post::ActiveModel {
                id: ActiveValue::Unchanged(id),
                title: Set(revision.title),
                image_url: Set(revision.image_url),
                updated_at: Set(revision.updated_at.into()),
                ..Default::default()
            }
            .update(&txn)
            .await
            .map_err(db_err)?;

            post_content::ActiveModel {
                post_id: ActiveValue::Unchanged(id),
                body: Set(revision.content),
            }
            .update(&txn)
            .await
            .map_err(db_err)?;

            txn.commit().await.map_err(db_err)?;
            Ok(delta)
        })
        .await
    }

    async fn toggle_state(&self, id: Uuid, caller: Uuid) -> Result<PublicationToggle, RepoError> {
        self.bounded(async {
            let txn = self.db.begin().await.map_err(db_err)?;

            // Same row lock as `revise`, so a toggle and an edit never interleave.
            let Some(row) = PostEntity::find_by_id(id)
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(db_err)?
            else {
                return Ok(PublicationToggle::NotFound);
            };

            let mut post: Post = row.into();
            if post.toggle_publication(caller).is_err() {
                return Ok(PublicationToggle::NotOwner);
            }

            let updated = post::ActiveModel {
                id: ActiveValue::Unchanged(id),
                state: Set(post.state.into()),
                updated_at: Set(post.updated_at.into()),
                ..Default::default()
            }
            .update(&txn)
            .await
            .map_err(db_err)?;

            txn.commit().await.map_err(db_err)?;
            Ok(PublicationToggle::Toggled(updated.into()))
        })
        .await
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn list(&self) -> Result<Vec<Tag>, RepoError> {
        self.bounded(async {
            let tags = TagEntity::find()
                .order_by_asc(tag::Column::Name)
                .all(&self.db)
                .await
                .map_err(db_err)?;
            Ok(tags.into_iter().map(Into::into).collect())
        })
        .await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, RepoError> {
        self.bounded(async {
            let tag = TagEntity::find()
                .filter(tag::Column::Name.eq(name))
                .one(&self.db)
                .await
                .map_err(db_err)?;
            Ok(tag.map(Into::into))
        })
        .await
    }

    async fn insert(&self, tag: Tag) -> Result<Tag, RepoError> {
        let model: tag::ActiveModel = tag.into();
        self.bounded(async {
            let inserted = model.insert(&self.db).await.map_err(db_err)?;
            Ok(inserted.into())
        })
        .await
    }

    async fn delete_unused(&self, id: Uuid) -> Result<TagRemoval, RepoError> {
        self.bounded(async {
            let txn = self.db.begin().await.map_err(db_err)?;

            // Locking the tag row blocks concurrent link inserts until we finish.
            let exists = TagEntity::find_by_id(id)
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(db_err)?
                .is_some();
            if !exists {
                return Ok(TagRemoval::NotFound);
            }

            let posts = PostTagEntity::find()
                .filter(post_tag::Column::TagId.eq(id))
                .count(&txn)
                .await
                .map_err(db_err)?;
            if posts > 0 {
                return Ok(TagRemoval::InUse { posts });
            }

            TagEntity::delete_by_id(id)
                .exec(&txn)
                .await
                .map_err(db_err)?;
            txn.commit().await.map_err(db_err)?;
            Ok(TagRemoval::Deleted)
        })
        .await
    }
}
