//! Page assembly for the public blog: index, post detail, tag filter and the
//! yearly archive.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::listing::{ListingAssembler, PostSummary};
use crate::application::repos::{
    CommentWithAuthor, CommentsRepo, PostQueryFilter, PostsRepo, RankedPost, RepoError,
    TagWithCount, TagsRepo, YearCount,
};
use crate::domain::error::DomainError;
use crate::domain::{posts, tags};
use crate::presentation::views::{
    CommentView, IndexContext, PostCard, PostDetailContext, PostDetailView, PostsListContext,
    SidebarView, TagView, YearLink,
};

pub const POPULAR_POSTS_LIMIT: u32 = 5;
pub const FRESH_POSTS_LIMIT: u32 = 5;
pub const POPULAR_TAGS_LIMIT: u32 = 5;
pub const TAG_FILTER_POSTS_LIMIT: u32 = 20;

pub const MEDIA_ROUTE_PREFIX: &str = "/media";

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("invalid year `{0}`")]
    InvalidYear(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostsRepo>,
    tags: Arc<dyn TagsRepo>,
    comments: Arc<dyn CommentsRepo>,
    listing: ListingAssembler,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        tags: Arc<dyn TagsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        let listing = ListingAssembler::new(posts.clone(), tags.clone());
        Self {
            posts,
            tags,
            comments,
            listing,
        }
    }

    pub async fn index(&self) -> Result<IndexContext, BlogError> {
        let popular = self
            .posts
            .list_popular(&PostQueryFilter::default(), POPULAR_POSTS_LIMIT)
            .await?;
        let fresh = self.posts.list_fresh(FRESH_POSTS_LIMIT).await?;
        let popular_tags = self.tags.list_popular(Some(POPULAR_TAGS_LIMIT)).await?;
        let years = self.posts.list_years().await?;

        Ok(IndexContext {
            most_popular_posts: self.cards(popular).await?,
            page_posts: self.cards(fresh).await?,
            popular_tags: popular_tags.iter().map(serialize_tag).collect(),
            years: year_links(&years, None),
        })
    }

    pub async fn post_detail(&self, slug: &str) -> Result<Option<PostDetailContext>, BlogError> {
        let Some(ranked) = self.posts.find_by_slug(slug).await? else {
            return Ok(None);
        };

        let comments = self.comments.list_for_post(ranked.post.id).await?;
        let mut related = self.tags.tags_for_posts(&[ranked.post.id]).await?;
        let related_tags = related.remove(&ranked.post.id).unwrap_or_default();

        let post = serialize_detail(&ranked, &comments, &related_tags);
        let sidebar = self.sidebar(None).await?;
        Ok(Some(PostDetailContext { post, sidebar }))
    }

    /// Most popular posts carrying the tag; `None` when the tag does not exist.
    pub async fn tag_filter(&self, raw_title: &str) -> Result<Option<PostsListContext>, BlogError> {
        let title = match tags::normalize_title(raw_title) {
            Ok(title) => title,
            Err(_) => return Ok(None),
        };
        let Some(tag) = self.tags.find_by_title(&title).await? else {
            return Ok(None);
        };

        let filter = PostQueryFilter {
            tag_id: Some(tag.id),
        };
        let related = self
            .posts
            .list_popular(&filter, TAG_FILTER_POSTS_LIMIT)
            .await?;
        debug!(
            target = "quill::blog",
            tag = %tag.title,
            posts = related.len(),
            "tag filter"
        );

        Ok(Some(PostsListContext {
            heading: format!("#{}", tag.title),
            posts: self.cards(related).await?,
            tag: Some(tag.title),
            sidebar: self.sidebar(None).await?,
        }))
    }

    pub async fn year_archive(&self, raw_year: &str) -> Result<PostsListContext, BlogError> {
        let year: i32 = raw_year
            .trim()
            .parse()
            .map_err(|_| BlogError::InvalidYear(raw_year.to_string()))?;
        let ranked = match posts::year_bounds(year) {
            Some((start, end)) => self.posts.list_published_between(start, end).await?,
            None => Vec::new(),
        };

        Ok(PostsListContext {
            heading: format!("Posts of {year}"),
            tag: None,
            posts: self.cards(ranked).await?,
            sidebar: self.sidebar(Some(year)).await?,
        })
    }

    pub async fn sidebar(&self, active_year: Option<i32>) -> Result<SidebarView, BlogError> {
        let popular_tags = self.tags.list_popular(Some(POPULAR_TAGS_LIMIT)).await?;
        let popular = self
            .posts
            .list_popular(&PostQueryFilter::default(), POPULAR_POSTS_LIMIT)
            .await?;
        let years = self.posts.list_years().await?;

        Ok(SidebarView {
            popular_tags: popular_tags.iter().map(serialize_tag).collect(),
            most_popular_posts: self.cards(popular).await?,
            years: year_links(&years, active_year),
        })
    }

    async fn cards(&self, ranked: Vec<RankedPost>) -> Result<Vec<PostCard>, BlogError> {
        let summaries = self.listing.assemble(ranked).await?;
        Ok(summaries.iter().map(serialize_post).collect())
    }
}

pub fn post_href(slug: &str) -> String {
    format!("/post/{slug}")
}

pub fn tag_href(title: &str) -> String {
    format!("/tag/{title}")
}

pub fn year_href(year: i32) -> String {
    format!("/archive/{year}")
}

pub fn media_url(path: &str) -> String {
    format!("{MEDIA_ROUTE_PREFIX}/{}", path.trim_start_matches('/'))
}

pub fn serialize_tag(tag: &TagWithCount) -> TagView {
    TagView {
        title: tag.title.clone(),
        posts_with_tag: tag.posts_count,
        href: tag_href(&tag.title),
    }
}

pub fn serialize_post(summary: &PostSummary) -> PostCard {
    let post = &summary.post;
    PostCard {
        title: post.title.clone(),
        teaser_text: posts::teaser(&post.text).to_string(),
        author: summary.author.clone(),
        comments_amount: summary.comments_count,
        likes_amount: summary.likes_count,
        image_url: post.image_path.as_deref().map(media_url),
        published_at: posts::format_human_datetime(post.published_at),
        published_iso: posts::format_iso_datetime(post.published_at),
        slug: post.slug.clone(),
        href: post_href(&post.slug),
        tags: summary.tags.iter().map(serialize_tag).collect(),
        first_tag_title: summary.first_tag().map(|tag| tag.title.clone()),
    }
}

fn serialize_detail(
    ranked: &RankedPost,
    comments: &[CommentWithAuthor],
    related_tags: &[TagWithCount],
) -> PostDetailView {
    let post = &ranked.post;
    PostDetailView {
        title: post.title.clone(),
        text: post.text.clone(),
        author: ranked.author.clone(),
        comments: comments
            .iter()
            .map(|comment| CommentView {
                text: comment.text.clone(),
                published_at: posts::format_human_datetime(comment.published_at),
                published_iso: posts::format_iso_datetime(comment.published_at),
                author: comment.author.clone(),
            })
            .collect(),
        likes_amount: ranked.likes_count,
        image_url: post.image_path.as_deref().map(media_url),
        published_at: posts::format_human_datetime(post.published_at),
        published_iso: posts::format_iso_datetime(post.published_at),
        slug: post.slug.clone(),
        tags: related_tags.iter().map(serialize_tag).collect(),
    }
}

fn year_links(years: &[YearCount], active: Option<i32>) -> Vec<YearLink> {
    years
        .iter()
        .map(|entry| YearLink {
            year: entry.year,
            href: year_href(entry.year),
            posts_count: entry.posts_count,
            is_active: Some(entry.year) == active,
        })
        .collect()
}
