//! HTTP handlers and route configuration.

mod blog;
mod health;
mod tags;
mod user;

use actix_web::web;

use crate::middleware::auth::AuthGate;
use crate::middleware::error::{json_config, path_config, query_config};

/// Configure all application routes.
///
/// Gated resources are wrapped in `AuthGate`, so requests without a valid
/// bearer token never reach their handlers.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/user")
                .route("/signup", web::post().to(user::signup))
                .route("/signin", web::post().to(user::signin)),
        )
        .service(
            web::scope("/blog")
                // Public routes
                .route("/getall", web::get().to(blog::list_published))
                .route("/get/{id}", web::get().to(blog::get_post))
                .route("/tags", web::get().to(tags::list_tags))
                // Authenticated routes
                .service(
                    web::resource("/getallForadmin")
                        .wrap(AuthGate)
                        .route(web::get().to(blog::list_all)),
                )
                .service(
                    web::resource("/add")
                        .wrap(AuthGate)
                        .route(web::post().to(blog::create_post)),
                )
                .service(
                    web::resource("/edit/{id}")
                        .wrap(AuthGate)
                        .route(web::put().to(blog::edit_post)),
                )
                .service(
                    web::resource("/delete/{id}")
                        .wrap(AuthGate)
                        .route(web::delete().to(blog::toggle_publication)),
                )
                .service(
                    web::resource("/tags/create")
                        .wrap(AuthGate)
                        .route(web::post().to(tags::create_tags)),
                )
                .service(
                    web::resource("/tags/{id}")
                        .wrap(AuthGate)
                        .route(web::delete().to(tags::delete_tag)),
                ),
        );
}
