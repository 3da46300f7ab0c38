pub mod article_handlers;
pub mod attachment_handlers;
pub mod engagement_handlers;
pub mod post_handlers;
pub mod thread_handlers;
pub mod user_handlers;

use crate::{
    error::{ForumError, ForumResult},
    models::ContentKind,
};

/// Rejects ids whose prefix names another kind than the route serves.
pub(crate) fn expect_kind(id: &str, expected: ContentKind) -> ForumResult<()> {
    let kind = ContentKind::of_id(id)?;
    if kind == expected {
        Ok(())
    } else {
        Err(ForumError::validation(format!("{} is not a {} id", id, expected)))
    }
}
