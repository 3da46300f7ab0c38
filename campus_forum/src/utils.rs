use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_BODY_LENGTH, MAX_TITLE_LENGTH, PREVIEW_LENGTH};
use crate::error::{ForumError, ForumResult};

// Default page size
const DEFAULT_PAGE_SIZE: u64 = 25;
// Max page size to prevent excessive requests
const MAX_PAGE_SIZE: u64 = 100;

const ID_SUFFIX_LENGTH: usize = 16;

/// Sort keys accepted by the listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    TimeCreated,
    LastActivity,
    Views,
    Likes,
    Replies,
}

impl SortColumn {
    /// Unrecognised keys fall back to creation time.
    pub fn parse(key: Option<&str>) -> Self {
        match key.map(str::trim) {
            Some("last_activity") => SortColumn::LastActivity,
            Some("views") => SortColumn::Views,
            Some("likes") => SortColumn::Likes,
            Some("replies") => SortColumn::Replies,
            _ => SortColumn::TimeCreated,
        }
    }

    /// Column expression of the aggregated listing query.
    pub fn sql(self) -> &'static str {
        match self {
            SortColumn::TimeCreated => "created_at",
            SortColumn::LastActivity => "last_activity_at",
            SortColumn::Views => "views",
            SortColumn::Likes => "num_likes",
            SortColumn::Replies => "num_replies",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    // Default for u64 is 0, which means "unset".
    #[serde(default)]
    page: u64,
    #[serde(default)]
    page_size: u64,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    descending: Option<bool>,
}

impl PaginationParams {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, sort: &str, descending: bool) -> Self {
        self.sort = Some(sort.to_string());
        self.descending = Some(descending);
        self
    }

    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn page_size(&self) -> u64 {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        }
    }

    /// Row limit as bound into the listing query.
    pub fn limit(&self) -> i64 {
        i64::try_from(self.page_size()).unwrap_or(i64::MAX)
    }

    /// Rows to skip. Pages past what `i64` can address saturate, which
    /// yields an empty page rather than an invalid OFFSET.
    pub fn offset(&self) -> i64 {
        (self.page() - 1)
            .checked_mul(self.page_size())
            .and_then(|offset| i64::try_from(offset).ok())
            .unwrap_or(i64::MAX)
    }

    pub fn sort_column(&self) -> SortColumn {
        SortColumn::parse(self.sort.as_deref())
    }

    /// Newest first unless the caller asks otherwise.
    pub fn descending(&self) -> bool {
        self.descending.unwrap_or(true)
    }
}

/// One page of a listing together with the size of the whole result set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, params: &PaginationParams) -> Self {
        let page_size = params.page_size();
        let total = total_count.max(0) as u64;
        Self {
            items,
            total_count,
            page: params.page(),
            page_size,
            total_pages: total.div_ceil(page_size),
        }
    }
}

/// Builds a content id: one-letter kind prefix followed by a random suffix.
pub fn generate_id(prefix: char) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{}", prefix, suffix)
}

pub fn make_preview(body: &str) -> String {
    body.trim().chars().take(PREVIEW_LENGTH).collect()
}

pub fn validate_title(title: &str) -> ForumResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ForumError::validation("title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ForumError::validation(format!(
            "title exceeds maximum length of {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

pub fn validate_body(body: &str) -> ForumResult<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ForumError::validation("body cannot be empty"));
    }
    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(ForumError::validation(format!(
            "body exceeds maximum length of {} characters",
            MAX_BODY_LENGTH
        )));
    }
    Ok(body.to_string())
}
