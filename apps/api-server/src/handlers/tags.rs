//! Tag handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use kadha_core::domain::Tag;
use kadha_shared::dto::{CreateTagsRequest, MessageResponse, TagListResponse, TagResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn tag_list(tags: Vec<Tag>) -> TagListResponse {
    TagListResponse {
        tags: tags
            .into_iter()
            .map(|t| TagResponse {
                id: t.id,
                name: t.name,
            })
            .collect(),
    }
}

/// GET /blog/tags
pub async fn list_tags(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let tags = state.blog.list_tags().await?;
    Ok(HttpResponse::Ok().json(tag_list(tags)))
}

/// POST /blog/tags/create - find-or-create by name.
pub async fn create_tags(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreateTagsRequest>,
) -> AppResult<HttpResponse> {
    let tags = state.blog.create_tags(&body.tags).await?;
    tracing::debug!(user_id = %identity.user_id, count = tags.len(), "Tags ensured");
    Ok(HttpResponse::Created().json(tag_list(tags)))
}

/// DELETE /blog/tags/{id} - refused while any post still uses the tag.
pub async fn delete_tag(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.blog.delete_tag(id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("Tag {} deleted", id),
    }))
}
