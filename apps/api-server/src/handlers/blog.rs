//! Post handlers: catalog, detail, create, edit and the publication toggle.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use kadha_core::catalog::{CatalogPage, CatalogParams};
use kadha_core::domain::{Post, PostDetail, PostSummary};
use kadha_core::services::PostInput;
use kadha_shared::dto::{
    PaginationResponse, PostDetailResponse, PostListResponse, PostSummaryResponse,
    PublicationResponse, UpsertPostRequest,
};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn summary_response(summary: PostSummary) -> PostSummaryResponse {
    let PostSummary { post, tag_names } = summary;
    PostSummaryResponse {
        id: post.id,
        title: post.title,
        image_url: post.image_url,
        owner_id: post.owner_id,
        state: post.state.to_string(),
        published: post.state.is_public(),
        created_at: post.created_at,
        updated_at: post.updated_at,
        tags: tag_names,
    }
}

fn detail_response(detail: PostDetail) -> PostDetailResponse {
    let PostDetail {
        post,
        content,
        tags,
    } = detail;
    let tag_ids = tags.iter().map(|t| t.id).collect();
    PostDetailResponse {
        id: post.id,
        title: post.title,
        image_url: post.image_url,
        owner_id: post.owner_id,
        state: post.state.to_string(),
        published: post.state.is_public(),
        created_at: post.created_at,
        updated_at: post.updated_at,
        markdown_content: content,
        tags: tags.into_iter().map(|t| t.name).collect(),
        tag_ids,
    }
}

fn list_response(page: CatalogPage) -> PostListResponse {
    PostListResponse {
        posts: page.posts.into_iter().map(summary_response).collect(),
        pagination: PaginationResponse {
            current_page: page.pagination.current_page,
            total_pages: page.pagination.total_pages,
            total_count: page.pagination.total_count,
        },
    }
}

fn post_input(req: UpsertPostRequest) -> PostInput {
    PostInput {
        title: req.title,
        image_url: req.image_url,
        content: req.content,
        tag_ids: req.tag_ids,
    }
}

/// GET /blog/getall - published posts only.
pub async fn list_published(
    state: web::Data<AppState>,
    params: web::Query<CatalogParams>,
) -> AppResult<HttpResponse> {
    let page = state.blog.list(&params, false).await?;
    Ok(HttpResponse::Ok().json(list_response(page)))
}

/// GET /blog/getallForadmin - every state, for signed-in authors.
pub async fn list_all(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<CatalogParams>,
) -> AppResult<HttpResponse> {
    let page = state
        .blog
        .list_for_author(&params, identity.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(list_response(page)))
}

/// GET /blog/get/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let detail = state.blog.get(path.into_inner(), caller.user_id()).await?;
    Ok(HttpResponse::Ok().json(detail_response(detail)))
}

/// POST /blog/add
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpsertPostRequest>,
) -> AppResult<HttpResponse> {
    let detail = state
        .blog
        .create(identity.user_id, post_input(body.into_inner()))
        .await?;
    Ok(HttpResponse::Created().json(detail_response(detail)))
}

/// PUT /blog/edit/{id} - owner only.
pub async fn edit_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpsertPostRequest>,
) -> AppResult<HttpResponse> {
    let detail = state
        .blog
        .edit(identity.user_id, path.into_inner(), post_input(body.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(detail_response(detail)))
}

/// DELETE /blog/delete/{id} - flips published and unpublished; nothing is removed.
pub async fn toggle_publication(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post: Post = state
        .blog
        .toggle_publication(identity.user_id, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(PublicationResponse {
        id: post.id,
        state: post.state.to_string(),
        published: post.state.is_public(),
    }))
}
