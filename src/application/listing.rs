//! Attaching comment counts and tags to ranked posts.
//!
//! A ranking query already yields the like count of every post. Comment
//! counts are looked up afterwards in a single grouped query keyed by post id
//! and merged in memory: counting likes and comments over the same join would
//! multiply rows and inflate both numbers. Tags are fetched the same way, so a
//! listing of any length costs three queries.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{PostsRepo, RankedPost, RepoError, TagWithCount, TagsRepo};
use crate::domain::entities::PostRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub post: PostRecord,
    pub author: String,
    pub likes_count: u64,
    pub comments_count: u64,
    pub tags: Vec<TagWithCount>,
}

impl PostSummary {
    pub fn first_tag(&self) -> Option<&TagWithCount> {
        self.tags.first()
    }
}

#[derive(Clone)]
pub struct ListingAssembler {
    posts: Arc<dyn PostsRepo>,
    tags: Arc<dyn TagsRepo>,
}

impl ListingAssembler {
    pub fn new(posts: Arc<dyn PostsRepo>, tags: Arc<dyn TagsRepo>) -> Self {
        Self { posts, tags }
    }

    /// Complete ranked posts with comment counts and tags, keeping their order.
    pub async fn assemble(&self, ranked: Vec<RankedPost>) -> Result<Vec<PostSummary>, RepoError> {
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = ranked.iter().map(|entry| entry.post.id).collect();
        let comment_counts = self.posts.comment_counts(&ids).await?;
        let tags = self.tags.tags_for_posts(&ids).await?;
        debug!(
            target = "quill::listing",
            posts = ids.len(),
            "attached comment counts and tags"
        );

        Ok(merge_counts(ranked, &comment_counts, tags))
    }
}

/// Merge lookups keyed by post id into the ranked rows.
pub fn merge_counts(
    ranked: Vec<RankedPost>,
    comment_counts: &HashMap<Uuid, u64>,
    mut tags: HashMap<Uuid, Vec<TagWithCount>>,
) -> Vec<PostSummary> {
    ranked
        .into_iter()
        .map(|entry| {
            let id = entry.post.id;
            PostSummary {
                comments_count: comment_counts.get(&id).copied().unwrap_or(0),
                tags: tags.remove(&id).unwrap_or_default(),
                post: entry.post,
                author: entry.author,
                likes_count: entry.likes_count,
            }
        })
        .collect()
}
