//! Read-only projections joined with per-viewer engagement state.
//!
//! Nothing here mutates content, engagement or karma, except the view
//! counters, which are bumped at most once per viewer.

use sqlx::PgPool;
use tracing::debug;

use crate::{
    constants::{DEFAULT_TOP_KARMA_LIMIT, MAX_TOP_KARMA_LIMIT},
    error::{ForumError, ForumResult},
    models::{
        Anonymize, ArticleDetail, ArticleSummary, Attachment, ContentKind, FavoriteItem, KarmaRank, ThreadDetail,
        ThreadSummary,
    },
    repositories::{
        article_repository, attachment_repository, comment_repository, engagement_repository, post_repository,
        thread_repository, user_repository,
    },
    utils::{Page, PaginationParams},
};

#[derive(Clone)]
pub struct QueryEngine {
    pool: PgPool,
}

impl QueryEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_threads(&self, viewer_id: &str, params: &PaginationParams) -> ForumResult<Page<ThreadSummary>> {
        let total = thread_repository::count_available(&self.pool).await?;
        let items = thread_repository::list_summaries(&self.pool, viewer_id, params)
            .await?
            .into_iter()
            .map(Anonymize::anonymize)
            .collect();
        Ok(Page::new(items, total, params))
    }

    /// Fetches a thread with its available posts and counts the view.
    pub async fn get_thread(&self, thread_id: &str, viewer_id: &str) -> ForumResult<ThreadDetail> {
        self.record_view(ContentKind::Thread, thread_id, viewer_id).await?;

        let thread = thread_repository::get_summary(&self.pool, thread_id, viewer_id)
            .await?
            .ok_or_else(|| ForumError::not_found("thread", thread_id))?
            .anonymize();
        let posts = post_repository::list_views_for_thread(&self.pool, thread_id, viewer_id)
            .await?
            .into_iter()
            .map(Anonymize::anonymize)
            .collect();
        Ok(ThreadDetail { thread, posts })
    }

    pub async fn list_articles(&self, viewer_id: &str, params: &PaginationParams) -> ForumResult<Page<ArticleSummary>> {
        let total = article_repository::count_available(&self.pool).await?;
        let items = article_repository::list_summaries(&self.pool, viewer_id, params)
            .await?
            .into_iter()
            .map(Anonymize::anonymize)
            .collect();
        Ok(Page::new(items, total, params))
    }

    pub async fn get_article(&self, article_id: &str, viewer_id: &str) -> ForumResult<ArticleDetail> {
        self.record_view(ContentKind::Article, article_id, viewer_id).await?;

        let article = article_repository::get_summary(&self.pool, article_id, viewer_id)
            .await?
            .ok_or_else(|| ForumError::not_found("article", article_id))?
            .anonymize();
        let comments = comment_repository::list_views_for_article(&self.pool, article_id, viewer_id)
            .await?
            .into_iter()
            .map(Anonymize::anonymize)
            .collect();
        Ok(ArticleDetail { article, comments })
    }

    pub async fn list_favorites(&self, viewer_id: &str, kind: ContentKind) -> ForumResult<Vec<FavoriteItem>> {
        Ok(engagement_repository::list_favorites(&self.pool, viewer_id, kind).await?)
    }

    pub async fn top_karma(&self, semester: &str, limit: Option<i64>) -> ForumResult<Vec<KarmaRank>> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_TOP_KARMA_LIMIT)
            .min(MAX_TOP_KARMA_LIMIT);
        Ok(user_repository::top_karma(&self.pool, semester, limit).await?)
    }

    pub async fn karma_of(&self, user_id: &str) -> ForumResult<i64> {
        Ok(user_repository::get_karma(&self.pool, user_id).await?)
    }

    /// Attachments of an available content item.
    pub async fn list_attachments(&self, content_id: &str) -> ForumResult<Vec<Attachment>> {
        let kind = ContentKind::of_id(content_id)?;
        let mut conn = self.pool.acquire().await?;
        let available = engagement_repository::share_lock_head(&mut conn, kind, content_id)
            .await?
            .is_some_and(|head| head.available);
        if !available {
            return Err(ForumError::not_found(kind.name(), content_id));
        }
        Ok(attachment_repository::list_for_content(&self.pool, content_id).await?)
    }

    /// Counts a view the first time a viewer opens an available item.
    /// The "insert if absent" and the counter bump commit together.
    async fn record_view(&self, kind: ContentKind, content_id: &str, viewer_id: &str) -> ForumResult<()> {
        let mut tx = self.pool.begin().await?;
        let available = engagement_repository::share_lock_head(&mut tx, kind, content_id)
            .await?
            .map(|head| head.available)
            .unwrap_or(false);
        if !available {
            return Err(ForumError::not_found(kind.name(), content_id));
        }
        if engagement_repository::record_view(&mut tx, viewer_id, content_id).await? {
            match kind {
                ContentKind::Article => article_repository::increment_views(&mut tx, content_id).await?,
                _ => thread_repository::increment_views(&mut tx, content_id).await?,
            }
            debug!(content_id = %content_id, viewer_id = %viewer_id, "Recorded first view");
        }
        tx.commit().await?;
        Ok(())
    }
}
