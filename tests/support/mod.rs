#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use http_body_util::BodyExt;
use time::OffsetDateTime;
use time::macros::datetime;
use url::Url;
use uuid::Uuid;

use quill::application::blog::BlogService;
use quill::application::chrome::ChromeService;
use quill::application::repos::{
    CommentWithAuthor, CommentsRepo, HealthRepo, PostQueryFilter, PostsRepo, RankedPost,
    RepoError, TagWithCount, TagsRepo, YearCount,
};
use quill::config::SiteSettings;
use quill::domain::entities::{CommentRecord, PostRecord, TagRecord, UserRecord};
use quill::infra::http::HttpState;
use quill::infra::media::MediaStorage;

#[derive(Default)]
struct Store {
    users: Vec<UserRecord>,
    posts: Vec<PostRecord>,
    tags: Vec<TagRecord>,
    post_tags: Vec<(Uuid, Uuid)>,
    likes: Vec<(Uuid, Uuid)>,
    comments: Vec<CommentRecord>,
}

impl Store {
    fn username(&self, id: Uuid) -> String {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }

    fn ranked(&self, post: &PostRecord) -> RankedPost {
        RankedPost {
            post: post.clone(),
            author: self.username(post.author_id),
            likes_count: self.likes.iter().filter(|(p, _)| *p == post.id).count() as u64,
        }
    }

    fn tag_counts(&self) -> Vec<TagWithCount> {
        let mut tags: Vec<TagWithCount> = self
            .tags
            .iter()
            .map(|tag| TagWithCount {
                id: tag.id,
                title: tag.title.clone(),
                posts_count: self.post_tags.iter().filter(|(_, t)| *t == tag.id).count() as u64,
            })
            .collect();
        tags.sort_by(|a, b| {
            b.posts_count
                .cmp(&a.posts_count)
                .then_with(|| a.title.cmp(&b.title))
        });
        tags
    }
}

/// In-memory stand-in for the Postgres repositories. Every repository call
/// that would hit the database bumps `query_count`.
#[derive(Default)]
pub struct MemoryBlog {
    store: Mutex<Store>,
    queries: AtomicUsize,
    unhealthy: AtomicBool,
}

impl MemoryBlog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, is_staff: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.store.lock().unwrap().users.push(UserRecord {
            id,
            username: username.to_string(),
            is_staff,
        });
        id
    }

    pub fn add_tag(&self, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.lock().unwrap().tags.push(TagRecord {
            id,
            title: title.to_string(),
        });
        id
    }

    pub fn add_post(&self, author_id: Uuid, title: &str, published_at: OffsetDateTime) -> Uuid {
        let id = Uuid::new_v4();
        let slug = quill::domain::slug::derive_slug(title).expect("slug");
        self.store.lock().unwrap().posts.push(PostRecord {
            id,
            slug,
            title: title.to_string(),
            text: format!("{title}. Full text of the post."),
            image_path: None,
            published_at,
            author_id,
        });
        id
    }

    pub fn set_image(&self, post_id: Uuid, path: &str) {
        let mut store = self.store.lock().unwrap();
        if let Some(post) = store.posts.iter_mut().find(|post| post.id == post_id) {
            post.image_path = Some(path.to_string());
        }
    }

    pub fn tag_post(&self, post_id: Uuid, tag_id: Uuid) {
        self.store.lock().unwrap().post_tags.push((post_id, tag_id));
    }

    pub fn like(&self, post_id: Uuid, user_id: Uuid) {
        self.store.lock().unwrap().likes.push((post_id, user_id));
    }

    pub fn comment(&self, post_id: Uuid, author_id: Uuid, text: &str, at: OffsetDateTime) {
        self.store.lock().unwrap().comments.push(CommentRecord {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            text: text.to_string(),
            published_at: at,
        });
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn reset_queries(&self) {
        self.queries.store(0, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

fn newest_first(a: &RankedPost, b: &RankedPost) -> std::cmp::Ordering {
    b.post
        .published_at
        .cmp(&a.post.published_at)
        .then_with(|| b.post.id.cmp(&a.post.id))
}

#[async_trait]
impl PostsRepo for MemoryBlog {
    async fn list_popular(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
    ) -> Result<Vec<RankedPost>, RepoError> {
        self.record_query();
        let store = self.store.lock().unwrap();
        let mut ranked: Vec<RankedPost> = store
            .posts
            .iter()
            .filter(|post| match filter.tag_id {
                Some(tag_id) => store.post_tags.contains(&(post.id, tag_id)),
                None => true,
            })
            .map(|post| store.ranked(post))
            .collect();
        ranked.sort_by(|a, b| {
            b.likes_count
                .cmp(&a.likes_count)
                .then_with(|| newest_first(a, b))
        });
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn list_fresh(&self, limit: u32) -> Result<Vec<RankedPost>, RepoError> {
        self.record_query();
        let store = self.store.lock().unwrap();
        let mut ranked: Vec<RankedPost> = store.posts.iter().map(|post| store.ranked(post)).collect();
        ranked.sort_by(newest_first);
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn list_published_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<RankedPost>, RepoError> {
        self.record_query();
        let store = self.store.lock().unwrap();
        let mut ranked: Vec<RankedPost> = store
            .posts
            .iter()
            .filter(|post| post.published_at >= start && post.published_at < end)
            .map(|post| store.ranked(post))
            .collect();
        ranked.sort_by(|a, b| newest_first(b, a));
        Ok(ranked)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<RankedPost>, RepoError> {
        self.record_query();
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .find(|post| post.slug == slug)
            .map(|post| store.ranked(post)))
    }

    async fn comment_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError> {
        let mut counts: HashMap<Uuid, u64> = post_ids.iter().map(|id| (*id, 0)).collect();
        if post_ids.is_empty() {
            return Ok(counts);
        }
        self.record_query();
        let store = self.store.lock().unwrap();
        for comment in &store.comments {
            if let Some(count) = counts.get_mut(&comment.post_id) {
                *count += 1;
            }
        }
        Ok(counts)
    }

    async fn list_years(&self) -> Result<Vec<YearCount>, RepoError> {
        self.record_query();
        let store = self.store.lock().unwrap();
        let mut years: HashMap<i32, u64> = HashMap::new();
        for post in &store.posts {
            *years.entry(post.published_at.year()).or_default() += 1;
        }
        let mut years: Vec<YearCount> = years
            .into_iter()
            .map(|(year, posts_count)| YearCount { year, posts_count })
            .collect();
        years.sort_by(|a, b| b.year.cmp(&a.year));
        Ok(years)
    }
}

#[async_trait]
impl TagsRepo for MemoryBlog {
    async fn list_popular(&self, limit: Option<u32>) -> Result<Vec<TagWithCount>, RepoError> {
        self.record_query();
        let mut tags = self.store.lock().unwrap().tag_counts();
        if let Some(limit) = limit {
            tags.truncate(limit as usize);
        }
        Ok(tags)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<TagRecord>, RepoError> {
        self.record_query();
        let store = self.store.lock().unwrap();
        Ok(store.tags.iter().find(|tag| tag.title == title).cloned())
    }

    async fn tags_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<TagWithCount>>, RepoError> {
        let mut grouped: HashMap<Uuid, Vec<TagWithCount>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(grouped);
        }
        self.record_query();
        let store = self.store.lock().unwrap();
        for tag in store.tag_counts() {
            for post_id in post_ids {
                if store.post_tags.contains(&(*post_id, tag.id)) {
                    grouped.entry(*post_id).or_default().push(tag.clone());
                }
            }
        }
        Ok(grouped)
    }
}

#[async_trait]
impl CommentsRepo for MemoryBlog {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        self.record_query();
        let store = self.store.lock().unwrap();
        let mut comments: Vec<CommentWithAuthor> = store
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| CommentWithAuthor {
                id: comment.id,
                text: comment.text.clone(),
                published_at: comment.published_at,
                author: store.username(comment.author_id),
            })
            .collect();
        comments.sort_by(|a, b| {
            a.published_at
                .cmp(&b.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(comments)
    }
}

#[async_trait]
impl HealthRepo for MemoryBlog {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            Err(RepoError::from_persistence("connection refused"))
        } else {
            Ok(())
        }
    }
}

/// Six posts over three years with likes, comments and tags:
///
/// | slug              | year | likes | comments | tags           |
/// |-------------------|------|-------|----------|----------------|
/// | intro-to-django   | 2019 | 3     | 2        | python, django |
/// | rust-ownership    | 2019 | 1     | 3        | rust           |
/// | async-python      | 2020 | 2     | 0        | python         |
/// | web-basics        | 2020 | 0     | 1        | web, python    |
/// | untagged-thoughts | 2020 | 1     | 0        |                |
/// | django-signals    | 2021 | 1     | 1        | django         |
pub fn sample_blog() -> Arc<MemoryBlog> {
    let blog = MemoryBlog::new();
    let admin = blog.add_user("admin", true);
    let ann = blog.add_user("ann", false);
    let bob = blog.add_user("bob", false);
    let cid = blog.add_user("cid", false);

    let python = blog.add_tag("python");
    let django = blog.add_tag("django");
    let rust = blog.add_tag("rust");
    let web = blog.add_tag("web");

    let intro = blog.add_post(admin, "Intro to Django", datetime!(2019-03-01 10:00 UTC));
    blog.tag_post(intro, python);
    blog.tag_post(intro, django);
    for user in [ann, bob, cid] {
        blog.like(intro, user);
    }
    blog.comment(intro, bob, "Second!", datetime!(2019-03-02 09:00 UTC));
    blog.comment(intro, ann, "First!", datetime!(2019-03-01 11:00 UTC));

    let ownership = blog.add_post(admin, "Rust ownership", datetime!(2019-07-15 08:00 UTC));
    blog.tag_post(ownership, rust);
    blog.like(ownership, ann);
    blog.comment(ownership, cid, "Borrowed", datetime!(2019-07-16 12:00 UTC));
    blog.comment(ownership, cid, "Moved", datetime!(2019-07-17 12:00 UTC));
    blog.comment(ownership, cid, "Dropped", datetime!(2019-07-18 12:00 UTC));

    let async_python = blog.add_post(admin, "Async Python", datetime!(2020-01-10 12:00 UTC));
    blog.tag_post(async_python, python);
    blog.like(async_python, ann);
    blog.like(async_python, bob);

    let web_basics = blog.add_post(admin, "Web basics", datetime!(2020-05-05 15:30 UTC));
    blog.tag_post(web_basics, web);
    blog.tag_post(web_basics, python);
    blog.set_image(web_basics, "covers/web.png");
    blog.comment(web_basics, ann, "Useful", datetime!(2020-05-06 10:00 UTC));

    let untagged = blog.add_post(admin, "Untagged thoughts", datetime!(2020-11-20 18:45 UTC));
    blog.like(untagged, bob);

    let signals = blog.add_post(admin, "Django signals", datetime!(2021-02-02 07:15 UTC));
    blog.tag_post(signals, django);
    blog.like(signals, cid);
    blog.comment(signals, admin, "Follow-up soon", datetime!(2021-02-03 07:15 UTC));

    Arc::new(blog)
}

pub fn blog_service(repo: &Arc<MemoryBlog>) -> BlogService {
    BlogService::new(repo.clone(), repo.clone(), repo.clone())
}

pub fn site_settings() -> SiteSettings {
    SiteSettings {
        title: "Quill".to_string(),
        description: "Test blog".to_string(),
        footer: "Quill test footer".to_string(),
        public_url: Url::parse("https://blog.example/").expect("url"),
    }
}

pub fn http_state(repo: &Arc<MemoryBlog>, media_root: PathBuf) -> HttpState {
    HttpState {
        blog: Arc::new(blog_service(repo)),
        chrome: Arc::new(ChromeService::new(&site_settings())),
        media: Arc::new(MediaStorage::new(media_root)),
        health: repo.clone(),
    }
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.expect("collect body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}
