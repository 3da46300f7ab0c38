use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::constants::ANONYMOUS_NAME;
use crate::error::ForumError;

/// Role attached to a caller by the identity resolver.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
    Admin,
}

impl Role {
    /// Staff and admins may edit or delete content they did not write.
    pub fn can_moderate(self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ForumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(ForumError::validation(format!("unknown role '{}'", other))),
        }
    }
}

/// Verified identity of the user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    /// Owners and moderators may change a content item.
    pub fn may_modify(&self, author_id: &str) -> bool {
        self.id == author_id || self.role.can_moderate()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Thread,
    Post,
    Article,
    Comment,
}

impl ContentKind {
    pub fn prefix(self) -> char {
        match self {
            ContentKind::Thread => 't',
            ContentKind::Post => 'p',
            ContentKind::Article => 'a',
            ContentKind::Comment => 'c',
        }
    }

    /// Recovers the kind of a content item from its id prefix.
    pub fn of_id(id: &str) -> Result<Self, ForumError> {
        match id.chars().next() {
            Some('t') => Ok(ContentKind::Thread),
            Some('p') => Ok(ContentKind::Post),
            Some('a') => Ok(ContentKind::Article),
            Some('c') => Ok(ContentKind::Comment),
            _ => Err(ForumError::validation(format!("malformed content id '{}'", id))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ContentKind::Thread => "thread",
            ContentKind::Post => "post",
            ContentKind::Article => "article",
            ContentKind::Comment => "comment",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentKind {
    type Err = ForumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thread" => Ok(ContentKind::Thread),
            "post" => Ok(ContentKind::Post),
            "article" => Ok(ContentKind::Article),
            "comment" => Ok(ContentKind::Comment),
            other => Err(ForumError::validation(format!("unknown content kind '{}'", other))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Unverified,
    Validated,
    Refuted,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Unverified => "unverified",
            ValidationStatus::Validated => "validated",
            ValidationStatus::Refuted => "refuted",
        }
    }
}

impl FromStr for ValidationStatus {
    type Err = ForumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(ValidationStatus::Unverified),
            "validated" => Ok(ValidationStatus::Validated),
            "refuted" => Ok(ValidationStatus::Refuted),
            other => Err(ForumError::validation(format!(
                "unknown validation status '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ValidationStatus {
    type Error = ForumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A discussion thread. Title and preview mirror its header post.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Thread {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub preview: String,
    pub anonymous: bool,
    pub views: i64,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Post {
    pub id: String,
    pub thread_id: String,
    pub author_id: String,
    pub title: Option<String>,
    pub body: String,
    pub reply_to: Option<String>,
    pub is_header: bool,
    #[sqlx(try_from = "String")]
    pub validation_status: ValidationStatus,
    pub anonymous: bool,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Article {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub anonymous: bool,
    pub views: i64,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Comment {
    pub id: String,
    pub article_id: String,
    pub author_id: String,
    pub body: String,
    pub anonymous: bool,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Thread listing entry joined with engagement state for one viewer.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct ThreadSummary {
    pub id: String,
    pub author_id: Option<String>,
    pub author_name: String,
    pub title: String,
    pub preview: String,
    pub anonymous: bool,
    pub views: i64,
    pub num_replies: i64,
    pub num_likes: i64,
    pub is_liked: bool,
    pub is_favorited: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct PostView {
    pub id: String,
    pub thread_id: String,
    pub author_id: Option<String>,
    pub author_name: String,
    pub title: Option<String>,
    pub body: String,
    pub reply_to: Option<String>,
    pub is_header: bool,
    #[sqlx(try_from = "String")]
    pub validation_status: ValidationStatus,
    pub anonymous: bool,
    pub num_likes: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ThreadDetail {
    pub thread: ThreadSummary,
    pub posts: Vec<PostView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct ArticleSummary {
    pub id: String,
    pub author_id: Option<String>,
    pub author_name: String,
    pub title: String,
    pub body: String,
    pub anonymous: bool,
    pub views: i64,
    pub num_replies: i64,
    pub num_likes: i64,
    pub is_liked: bool,
    pub is_favorited: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct CommentView {
    pub id: String,
    pub article_id: String,
    pub author_id: Option<String>,
    pub author_name: String,
    pub body: String,
    pub anonymous: bool,
    pub num_likes: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ArticleDetail {
    pub article: ArticleSummary,
    pub comments: Vec<CommentView>,
}

/// Hides the author of anonymous content behind a fixed placeholder.
pub trait Anonymize {
    fn anonymize(self) -> Self;
}

macro_rules! impl_anonymize {
    ($($ty:ty),*) => {
        $(impl Anonymize for $ty {
            fn anonymize(mut self) -> Self {
                if self.anonymous {
                    self.author_id = None;
                    self.author_name = ANONYMOUS_NAME.to_string();
                }
                self
            }
        })*
    };
}

impl_anonymize!(ThreadSummary, PostView, ArticleSummary, CommentView);

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct FavoriteItem {
    pub content_id: String,
    pub title: String,
    pub favorited_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct KarmaRank {
    pub user_id: String,
    pub display_name: String,
    pub balance: i64,
}

/// Metadata pointer to a file held by the attachment store.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub owner_id: String,
    pub content_id: Option<String>,
    pub file_url: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
