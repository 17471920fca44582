//! Domain entities - the core business objects.

mod post;
mod publication;
mod tag;
mod user;

pub use post::{Post, PostDetail, PostDraft, PostRevision, PostSummary};
pub use publication::PublicationState;
pub use tag::Tag;
pub use user::User;
