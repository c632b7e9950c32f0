//! Repository traits describing persistence adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{PostRecord, TagRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// A post as returned by a ranking query: the record, its author's username
/// and the number of likes, all from a single grouped query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPost {
    pub post: PostRecord,
    pub author: String,
    pub likes_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagWithCount {
    pub id: Uuid,
    pub title: String,
    pub posts_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub text: String,
    pub published_at: OffsetDateTime,
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearCount {
    pub year: i32,
    pub posts_count: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostQueryFilter {
    pub tag_id: Option<Uuid>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts ordered by like count, most liked first.
    async fn list_popular(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
    ) -> Result<Vec<RankedPost>, RepoError>;

    /// Posts ordered by publication time, newest first.
    async fn list_fresh(&self, limit: u32) -> Result<Vec<RankedPost>, RepoError>;

    /// Posts published in `[start, end)`, oldest first.
    async fn list_published_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<RankedPost>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<RankedPost>, RepoError>;

    /// Comment counts for the given posts in one grouped lookup. Every
    /// requested id is present in the result; posts without comments map to 0.
    async fn comment_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError>;

    async fn list_years(&self) -> Result<Vec<YearCount>, RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// Tags ordered by the number of posts carrying them, then by title.
    async fn list_popular(&self, limit: Option<u32>) -> Result<Vec<TagWithCount>, RepoError>;

    async fn find_by_title(&self, title: &str) -> Result<Option<TagRecord>, RepoError>;

    /// Tags of each requested post, ranked like [`TagsRepo::list_popular`].
    /// Posts without tags are absent from the map.
    async fn tags_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<TagWithCount>>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments of a post, oldest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
