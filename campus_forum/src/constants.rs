// Content limits
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_BODY_LENGTH: usize = 20_000;
pub const PREVIEW_LENGTH: usize = 150;

/// Display name shown in place of the author of anonymous content.
pub const ANONYMOUS_NAME: &str = "Anonymous";

// Default karma awards, overridable through `Config`.
pub const CREATE_THREAD_PTS: i64 = 10;
pub const CREATE_POST_PTS: i64 = 5;
pub const CREATE_ARTICLE_PTS: i64 = 10;
pub const CREATE_COMMENT_PTS: i64 = 2;
pub const LIKE_PTS: i64 = 1;

pub const DEFAULT_TOP_KARMA_LIMIT: i64 = 10;
pub const MAX_TOP_KARMA_LIMIT: i64 = 100;

// Attachments
pub const MAX_ATTACHMENT_SIZE_MB: u64 = 10;
pub const MAX_ATTACHMENT_SIZE_BYTES: u64 = MAX_ATTACHMENT_SIZE_MB * 1024 * 1024;
