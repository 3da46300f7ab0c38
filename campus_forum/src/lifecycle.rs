//! Content lifecycle and karma accounting.
//!
//! Every write that changes whether a content item exists or is visible, and
//! every karma adjustment, goes through [`LifecycleEngine`]. Multi-row
//! operations run in one transaction; dropping an operation's future before
//! it commits rolls the transaction back.
//!
//! Lock order is always parent before child (thread → posts, article →
//! comments), then engagement rows, then the karma ledger in ascending user
//! id order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};

use crate::{
    constants::{CREATE_ARTICLE_PTS, CREATE_COMMENT_PTS, CREATE_POST_PTS, CREATE_THREAD_PTS, LIKE_PTS},
    error::{ForumError, ForumResult},
    models::{Article, Attachment, Caller, Comment, ContentKind, Post, Thread, ValidationStatus},
    repositories::{
        article_repository,
        attachment_repository::{self, NewAttachment},
        comment_repository, engagement_repository,
        post_repository::{self, InsertPost},
        thread_repository, user_repository,
    },
    utils::{generate_id, make_preview, validate_body, validate_title},
};

/// Karma awarded per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KarmaPoints {
    pub create_thread: i64,
    pub create_post: i64,
    pub create_article: i64,
    pub create_comment: i64,
    pub like: i64,
}

impl Default for KarmaPoints {
    fn default() -> Self {
        Self {
            create_thread: CREATE_THREAD_PTS,
            create_post: CREATE_POST_PTS,
            create_article: CREATE_ARTICLE_PTS,
            create_comment: CREATE_COMMENT_PTS,
            like: LIKE_PTS,
        }
    }
}

impl KarmaPoints {
    pub fn for_creation(&self, kind: ContentKind) -> i64 {
        match kind {
            ContentKind::Thread => self.create_thread,
            ContentKind::Post => self.create_post,
            ContentKind::Article => self.create_article,
            ContentKind::Comment => self.create_comment,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReply {
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub body: String,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
}

/// A file already written to the attachment store.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub url: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedThread {
    pub thread: Thread,
    pub header_post: Post,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "item", rename_all = "lowercase")]
pub enum UpdatedContent {
    Thread(Thread),
    Post(Post),
    Article(Article),
    Comment(Comment),
}

/// Whether an idempotent write changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Unchanged,
}

impl Outcome {
    fn from_applied(applied: bool) -> Self {
        if applied {
            Outcome::Applied
        } else {
            Outcome::Unchanged
        }
    }
}

#[derive(Clone)]
pub struct LifecycleEngine {
    pool: PgPool,
    points: KarmaPoints,
}

impl LifecycleEngine {
    pub fn new(pool: PgPool, points: KarmaPoints) -> Self {
        Self { pool, points }
    }

    pub fn points(&self) -> KarmaPoints {
        self.points
    }

    /// Creates a thread together with its header post and awards the author.
    pub async fn create_thread(&self, author: &Caller, input: NewThread) -> ForumResult<CreatedThread> {
        let title = validate_title(&input.title)?;
        let body = validate_body(&input.body)?;

        let mut tx = self.pool.begin().await?;
        let thread_id = generate_id(ContentKind::Thread.prefix());
        let post_id = generate_id(ContentKind::Post.prefix());

        let thread = thread_repository::insert_thread(
            &mut tx,
            &thread_id,
            &author.id,
            &title,
            &make_preview(&body),
            input.anonymous,
        )
        .await?;
        let header_post = post_repository::insert_post(
            &mut tx,
            InsertPost {
                id: &post_id,
                thread_id: &thread_id,
                author_id: &author.id,
                title: Some(&title),
                body: &body,
                reply_to: None,
                is_header: true,
                anonymous: input.anonymous,
            },
        )
        .await?;
        let balance = user_repository::adjust_karma(&mut tx, &author.id, self.points.create_thread).await?;
        tx.commit().await?;

        info!(thread_id = %thread.id, post_id = %header_post.id, author_id = %author.id, karma = balance, "Created thread");
        Ok(CreatedThread { thread, header_post })
    }

    /// Adds a reply to an available thread.
    pub async fn create_reply(&self, author: &Caller, thread_id: &str, input: NewReply) -> ForumResult<Post> {
        let body = validate_body(&input.body)?;
        let title = input.title.as_deref().map(validate_title).transpose()?;

        let mut tx = self.pool.begin().await?;
        require_available(&mut tx, ContentKind::Thread, thread_id).await?;

        if let Some(reply_to) = input.reply_to.as_deref() {
            if !post_repository::is_available_in_thread(&mut tx, reply_to, thread_id).await? {
                return Err(ForumError::validation(format!(
                    "reply target {} is not an available post of thread {}",
                    reply_to, thread_id
                )));
            }
        }

        let post_id = generate_id(ContentKind::Post.prefix());
        let post = post_repository::insert_post(
            &mut tx,
            InsertPost {
                id: &post_id,
                thread_id,
                author_id: &author.id,
                title: title.as_deref(),
                body: &body,
                reply_to: input.reply_to.as_deref(),
                is_header: false,
                anonymous: input.anonymous,
            },
        )
        .await?;
        thread_repository::touch_activity(&mut tx, thread_id).await?;
        let balance = user_repository::adjust_karma(&mut tx, &author.id, self.points.create_post).await?;
        tx.commit().await?;

        info!(post_id = %post.id, thread_id = %thread_id, author_id = %author.id, karma = balance, "Created reply");
        Ok(post)
    }

    pub async fn create_article(&self, author: &Caller, input: NewArticle) -> ForumResult<Article> {
        let title = validate_title(&input.title)?;
        let body = validate_body(&input.body)?;

        let mut tx = self.pool.begin().await?;
        let article_id = generate_id(ContentKind::Article.prefix());
        let article =
            article_repository::insert_article(&mut tx, &article_id, &author.id, &title, &body, input.anonymous)
                .await?;
        let balance = user_repository::adjust_karma(&mut tx, &author.id, self.points.create_article).await?;
        tx.commit().await?;

        info!(article_id = %article.id, author_id = %author.id, karma = balance, "Created article");
        Ok(article)
    }

    pub async fn create_comment(&self, author: &Caller, article_id: &str, input: NewComment) -> ForumResult<Comment> {
        let body = validate_body(&input.body)?;

        let mut tx = self.pool.begin().await?;
        require_available(&mut tx, ContentKind::Article, article_id).await?;

        let comment_id = generate_id(ContentKind::Comment.prefix());
        let comment =
            comment_repository::insert_comment(&mut tx, &comment_id, article_id, &author.id, &body, input.anonymous)
                .await?;
        article_repository::touch_activity(&mut tx, article_id).await?;
        let balance = user_repository::adjust_karma(&mut tx, &author.id, self.points.create_comment).await?;
        tx.commit().await?;

        info!(comment_id = %comment.id, article_id = %article_id, author_id = %author.id, karma = balance, "Created comment");
        Ok(comment)
    }

    /// Edits a content item. Editing a thread edits its header post and the
    /// other way round.
    pub async fn update_content(
        &self,
        caller: &Caller,
        item_id: &str,
        update: ContentUpdate,
    ) -> ForumResult<UpdatedContent> {
        let kind = ContentKind::of_id(item_id)?;
        let body = validate_body(&update.body)?;
        let title = update.title.as_deref().map(validate_title).transpose()?;

        let mut tx = self.pool.begin().await?;
        let updated = match kind {
            ContentKind::Thread => {
                let thread = lock_available_thread(&mut tx, item_id).await?;
                authorize(caller, &thread.author_id, "edit this thread")?;
                let header = post_repository::lock_header(&mut tx, item_id)
                    .await?
                    .ok_or_else(|| ForumError::not_found("post", format!("header of {}", item_id)))?;
                post_repository::update_post(&mut tx, &header.id, title.as_deref(), &body).await?;
                let new_title = title.unwrap_or(thread.title);
                let thread =
                    thread_repository::update_from_header(&mut tx, item_id, &new_title, &make_preview(&body)).await?;
                UpdatedContent::Thread(thread)
            }
            ContentKind::Post => {
                let thread_id = post_repository::thread_of(&mut tx, item_id)
                    .await?
                    .ok_or_else(|| ForumError::not_found("post", item_id))?;
                // Thread first to keep the parent-before-child lock order.
                thread_repository::lock_thread(&mut tx, &thread_id).await?;
                let post = post_repository::lock_post(&mut tx, item_id)
                    .await?
                    .filter(|p| p.available)
                    .ok_or_else(|| ForumError::not_found("post", item_id))?;
                authorize(caller, &post.author_id, "edit this post")?;
                let post = post_repository::update_post(&mut tx, item_id, title.as_deref(), &body).await?;
                if post.is_header {
                    let header_title = post.title.clone().unwrap_or_default();
                    thread_repository::update_from_header(&mut tx, &thread_id, &header_title, &make_preview(&body))
                        .await?;
                } else {
                    thread_repository::touch_activity(&mut tx, &thread_id).await?;
                }
                UpdatedContent::Post(post)
            }
            ContentKind::Article => {
                let article = article_repository::lock_article(&mut tx, item_id)
                    .await?
                    .filter(|a| a.available)
                    .ok_or_else(|| ForumError::not_found("article", item_id))?;
                authorize(caller, &article.author_id, "edit this article")?;
                let article = article_repository::update_article(&mut tx, item_id, title.as_deref(), &body).await?;
                UpdatedContent::Article(article)
            }
            ContentKind::Comment => {
                require_parent_article(&mut tx, item_id).await?;
                let comment = comment_repository::lock_comment(&mut tx, item_id)
                    .await?
                    .filter(|c| c.available)
                    .ok_or_else(|| ForumError::not_found("comment", item_id))?;
                authorize(caller, &comment.author_id, "edit this comment")?;
                let comment = comment_repository::update_comment(&mut tx, item_id, &body).await?;
                UpdatedContent::Comment(comment)
            }
        };
        tx.commit().await?;

        info!(item_id = %item_id, edited_by = %caller.id, "Updated content");
        Ok(updated)
    }

    /// Soft-deletes a content item, purges its engagement rows and reverses
    /// the karma its creation awarded. Deleting a thread, or its header
    /// post, cascades to every post in the thread. Deleting an item that is
    /// already unavailable succeeds without changes.
    pub async fn delete_content(&self, caller: &Caller, item_id: &str) -> ForumResult<Outcome> {
        let kind = ContentKind::of_id(item_id)?;

        let mut tx = self.pool.begin().await?;
        let outcome = match kind {
            ContentKind::Thread => self.delete_thread_cascade(&mut tx, caller, item_id).await?,
            ContentKind::Post => {
                let thread_id = post_repository::thread_of(&mut tx, item_id)
                    .await?
                    .ok_or_else(|| ForumError::not_found("post", item_id))?;
                thread_repository::lock_thread(&mut tx, &thread_id).await?;
                let post = post_repository::lock_post(&mut tx, item_id)
                    .await?
                    .ok_or_else(|| ForumError::not_found("post", item_id))?;
                authorize(caller, &post.author_id, "delete this post")?;
                if post.is_header {
                    self.delete_thread_cascade(&mut tx, caller, &thread_id).await?
                } else if post_repository::mark_unavailable(&mut tx, item_id).await? == 0 {
                    Outcome::Unchanged
                } else {
                    let likes = engagement_repository::purge_for_content(&mut tx, item_id).await?;
                    user_repository::adjust_karma(&mut tx, &post.author_id, -self.points.create_post).await?;
                    debug!(post_id = %item_id, purged_likes = likes, "Post soft-deleted");
                    Outcome::Applied
                }
            }
            ContentKind::Article => {
                let article = article_repository::lock_article(&mut tx, item_id)
                    .await?
                    .ok_or_else(|| ForumError::not_found("article", item_id))?;
                authorize(caller, &article.author_id, "delete this article")?;
                if article_repository::mark_unavailable(&mut tx, item_id).await? == 0 {
                    Outcome::Unchanged
                } else {
                    let likes = engagement_repository::purge_for_content(&mut tx, item_id).await?;
                    user_repository::adjust_karma(&mut tx, &article.author_id, -self.points.create_article).await?;
                    debug!(article_id = %item_id, purged_likes = likes, "Article soft-deleted");
                    Outcome::Applied
                }
            }
            ContentKind::Comment => {
                let comment = comment_repository::lock_comment(&mut tx, item_id)
                    .await?
                    .ok_or_else(|| ForumError::not_found("comment", item_id))?;
                authorize(caller, &comment.author_id, "delete this comment")?;
                if comment_repository::mark_unavailable(&mut tx, item_id).await? == 0 {
                    Outcome::Unchanged
                } else {
                    let likes = engagement_repository::purge_for_content(&mut tx, item_id).await?;
                    user_repository::adjust_karma(&mut tx, &comment.author_id, -self.points.create_comment).await?;
                    debug!(comment_id = %item_id, purged_likes = likes, "Comment soft-deleted");
                    Outcome::Applied
                }
            }
        };
        tx.commit().await?;

        match outcome {
            Outcome::Applied => info!(item_id = %item_id, deleted_by = %caller.id, "Deleted content"),
            Outcome::Unchanged => debug!(item_id = %item_id, deleted_by = %caller.id, "Content already deleted"),
        }
        Ok(outcome)
    }

    /// Thread flag first, then posts, then engagement rows, karma last.
    /// Like-derived karma earned inside the thread is kept.
    async fn delete_thread_cascade(
        &self,
        conn: &mut PgConnection,
        caller: &Caller,
        thread_id: &str,
    ) -> ForumResult<Outcome> {
        let thread = thread_repository::lock_thread(conn, thread_id)
            .await?
            .ok_or_else(|| ForumError::not_found("thread", thread_id))?;
        authorize(caller, &thread.author_id, "delete this thread")?;

        if thread_repository::mark_unavailable(conn, thread_id).await? == 0 {
            return Ok(Outcome::Unchanged);
        }
        let posts = post_repository::mark_thread_posts_unavailable(conn, thread_id).await?;
        let likes = engagement_repository::purge_for_thread(conn, thread_id).await?;

        // Header karma is covered by the thread's own award.
        let mut reversals: BTreeMap<&str, i64> = BTreeMap::new();
        *reversals.entry(thread.author_id.as_str()).or_default() -= self.points.create_thread;
        for post in posts.iter().filter(|p| !p.is_header) {
            *reversals.entry(post.author_id.as_str()).or_default() -= self.points.create_post;
        }
        for (user_id, delta) in &reversals {
            if *delta != 0 {
                user_repository::adjust_karma(conn, user_id, *delta).await?;
            }
        }

        info!(
            thread_id = %thread_id,
            posts = posts.len(),
            purged_likes = likes,
            authors = reversals.len(),
            "Cascaded thread deletion"
        );
        Ok(Outcome::Applied)
    }

    /// Likes a content item. The author earns karma on the first like only;
    /// liking your own content earns nothing.
    pub async fn like(&self, actor: &Caller, content_id: &str) -> ForumResult<Outcome> {
        let kind = ContentKind::of_id(content_id)?;

        let mut tx = self.pool.begin().await?;
        let author_id = require_available(&mut tx, kind, content_id).await?;
        let inserted = match engagement_repository::insert_like(&mut tx, &actor.id, content_id).await {
            Ok(inserted) => inserted,
            Err(e) => {
                let err = ForumError::from(e);
                if err.is_conflict() {
                    warn!(content_id = %content_id, actor_id = %actor.id, "Concurrent duplicate like treated as no-op");
                    return Ok(Outcome::Unchanged);
                }
                return Err(err);
            }
        };
        if inserted && author_id != actor.id {
            user_repository::adjust_karma(&mut tx, &author_id, self.points.like).await?;
        }
        tx.commit().await?;

        debug!(content_id = %content_id, actor_id = %actor.id, inserted, "Processed like");
        Ok(Outcome::from_applied(inserted))
    }

    /// Removes a like and reverses the karma it awarded.
    pub async fn unlike(&self, actor: &Caller, content_id: &str) -> ForumResult<Outcome> {
        let kind = ContentKind::of_id(content_id)?;

        let mut tx = self.pool.begin().await?;
        let head = engagement_repository::share_lock_head(&mut tx, kind, content_id)
            .await?
            .ok_or_else(|| ForumError::not_found(kind.name(), content_id))?;
        let removed = engagement_repository::delete_like(&mut tx, &actor.id, content_id).await?;
        if removed && head.author_id != actor.id {
            user_repository::adjust_karma(&mut tx, &head.author_id, -self.points.like).await?;
        }
        tx.commit().await?;

        debug!(content_id = %content_id, actor_id = %actor.id, removed, "Processed unlike");
        Ok(Outcome::from_applied(removed))
    }

    pub async fn favorite(&self, actor: &Caller, content_id: &str) -> ForumResult<Outcome> {
        let kind = ContentKind::of_id(content_id)?;

        let mut tx = self.pool.begin().await?;
        require_available(&mut tx, kind, content_id).await?;
        let inserted = match engagement_repository::insert_favorite(&mut tx, &actor.id, content_id).await {
            Ok(inserted) => inserted,
            Err(e) => {
                let err = ForumError::from(e);
                if err.is_conflict() {
                    return Ok(Outcome::Unchanged);
                }
                return Err(err);
            }
        };
        tx.commit().await?;
        Ok(Outcome::from_applied(inserted))
    }

    pub async fn unfavorite(&self, actor: &Caller, content_id: &str) -> ForumResult<Outcome> {
        let kind = ContentKind::of_id(content_id)?;

        let mut tx = self.pool.begin().await?;
        engagement_repository::share_lock_head(&mut tx, kind, content_id)
            .await?
            .ok_or_else(|| ForumError::not_found(kind.name(), content_id))?;
        let removed = engagement_repository::delete_favorite(&mut tx, &actor.id, content_id).await?;
        tx.commit().await?;
        Ok(Outcome::from_applied(removed))
    }

    /// Marks a post as validated or refuted. Staff and admins only.
    pub async fn set_validation_status(&self, caller: &Caller, post_id: &str, status: &str) -> ForumResult<Post> {
        let status: ValidationStatus = status.parse()?;
        if !caller.role.can_moderate() {
            warn!(post_id = %post_id, caller_id = %caller.id, "Non-staff attempted to change validation status");
            return Err(ForumError::unauthorized("change validation status"));
        }
        if ContentKind::of_id(post_id)? != ContentKind::Post {
            return Err(ForumError::validation(format!("{} is not a post id", post_id)));
        }

        let post = post_repository::set_validation_status(&self.pool, post_id, status)
            .await?
            .ok_or_else(|| ForumError::not_found("post", post_id))?;
        info!(post_id = %post_id, status = status.as_str(), changed_by = %caller.id, "Updated validation status");
        Ok(post)
    }

    /// Records attachment metadata. When a content item is named it must be
    /// available and the caller must be allowed to modify it.
    pub async fn record_attachment(
        &self,
        owner: &Caller,
        content_id: Option<&str>,
        file: &StoredFile,
    ) -> ForumResult<Attachment> {
        let mut tx = self.pool.begin().await?;
        if let Some(content_id) = content_id {
            let kind = ContentKind::of_id(content_id)?;
            let author_id = require_available(&mut tx, kind, content_id).await?;
            authorize(owner, &author_id, "attach files to this item")?;
        }
        let attachment = attachment_repository::insert_attachment(
            &mut tx,
            NewAttachment {
                owner_id: &owner.id,
                content_id,
                file_url: &file.url,
                file_name: file.file_name.as_deref(),
                mime_type: file.mime_type.as_deref(),
                size_bytes: file.size_bytes,
            },
        )
        .await?;
        tx.commit().await?;

        info!(attachment_id = %attachment.id, owner_id = %owner.id, size_bytes = file.size_bytes, "Recorded attachment");
        Ok(attachment)
    }
}

fn authorize(caller: &Caller, author_id: &str, action: &'static str) -> ForumResult<()> {
    if caller.may_modify(author_id) {
        Ok(())
    } else {
        warn!(caller_id = %caller.id, author_id = %author_id, action, "Permission denied");
        Err(ForumError::unauthorized(action))
    }
}

/// Share-locks an available content item and returns its author. A comment
/// also needs its article to be available.
async fn require_available(conn: &mut PgConnection, kind: ContentKind, content_id: &str) -> ForumResult<String> {
    if kind == ContentKind::Comment {
        require_parent_article(conn, content_id).await?;
    }
    engagement_repository::share_lock_head(conn, kind, content_id)
        .await?
        .filter(|head| head.available)
        .map(|head| head.author_id)
        .ok_or_else(|| ForumError::not_found(kind.name(), content_id))
}

/// Share-locks the article of a comment, before the comment itself.
/// Comments under a deleted article are reported as not found.
async fn require_parent_article(conn: &mut PgConnection, comment_id: &str) -> ForumResult<()> {
    let article_id = comment_repository::article_of(conn, comment_id)
        .await?
        .ok_or_else(|| ForumError::not_found("comment", comment_id))?;
    let article_available = engagement_repository::share_lock_head(conn, ContentKind::Article, &article_id)
        .await?
        .is_some_and(|head| head.available);
    if article_available {
        Ok(())
    } else {
        Err(ForumError::not_found("comment", comment_id))
    }
}

async fn lock_available_thread(conn: &mut PgConnection, thread_id: &str) -> ForumResult<Thread> {
    thread_repository::lock_thread(conn, thread_id)
        .await?
        .filter(|t| t.available)
        .ok_or_else(|| ForumError::not_found("thread", thread_id))
}
