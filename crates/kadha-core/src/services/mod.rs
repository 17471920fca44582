//! Application services - orchestrate ports into the use cases served over HTTP.

mod account;
mod blog;

pub use account::{AccountService, IssuedToken, SignupInput};
pub use blog::{BlogService, BlogSettings, PostInput, UnpublishedReadPolicy};
