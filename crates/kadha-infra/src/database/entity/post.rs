//! Post entity for SeaORM.
//!
//! The markdown body lives in `post_contents` so catalog scans never read it.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use kadha_core::domain::PublicationState;

/// Stored form of [`PublicationState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PostState {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "unpublished")]
    Unpublished,
}

impl From<PublicationState> for PostState {
    fn from(state: PublicationState) -> Self {
        match state {
            PublicationState::Draft => PostState::Draft,
            PublicationState::Published => PostState::Published,
            PublicationState::Unpublished => PostState::Unpublished,
        }
    }
}

impl From<PostState> for PublicationState {
    fn from(state: PostState) -> Self {
        match state {
            PostState::Draft => PublicationState::Draft,
            PostState::Published => PublicationState::Published,
            PostState::Unpublished => PublicationState::Unpublished,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub state: PostState,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_one = "super::post_content::Entity")]
    PostContent,
    #[sea_orm(has_many = "super::post_tag::Entity")]
    PostTag,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::post_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PostContent.def()
    }
}

impl Related<super::post_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PostTag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for kadha_core::domain::Post {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            title: model.title,
            image_url: model.image_url,
            state: model.state.into(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<kadha_core::domain::Post> for ActiveModel {
    fn from(post: kadha_core::domain::Post) -> Self {
        Self {
            id: Set(post.id),
            owner_id: Set(post.owner_id),
            title: Set(post.title),
            image_url: Set(post.image_url),
            state: Set(post.state.into()),
            created_at: Set(post.created_at.into()),
            updated_at: Set(post.updated_at.into()),
        }
    }
}
