pub mod article_repository;
pub mod attachment_repository;
pub mod comment_repository;
pub mod engagement_repository;
pub mod post_repository;
pub mod thread_repository;
pub mod user_repository;
