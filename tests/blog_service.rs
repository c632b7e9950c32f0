mod support;

use quill::application::blog::{BlogError, TAG_FILTER_POSTS_LIMIT};
use quill::presentation::views::PostCard;
use support::{MemoryBlog, blog_service, sample_blog};
use time::Duration;
use time::macros::datetime;

fn describe(cards: &[PostCard]) -> String {
    cards
        .iter()
        .map(|card| {
            format!(
                "{} likes={} comments={} first={}",
                card.slug,
                card.likes_amount,
                card.comments_amount,
                card.first_tag_title.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn slugs(cards: &[PostCard]) -> Vec<&str> {
    cards.iter().map(|card| card.slug.as_str()).collect()
}

#[tokio::test]
async fn index_ranks_posts_by_likes_then_recency() {
    let repo = sample_blog();
    let index = blog_service(&repo).index().await.expect("index");

    insta::assert_snapshot!(describe(&index.most_popular_posts), @r"
    intro-to-django likes=3 comments=2 first=python
    async-python likes=2 comments=0 first=python
    django-signals likes=1 comments=1 first=django
    untagged-thoughts likes=1 comments=0 first=-
    rust-ownership likes=1 comments=3 first=rust
    ");
}

#[tokio::test]
async fn index_lists_fresh_posts_and_popular_tags() {
    let repo = sample_blog();
    let index = blog_service(&repo).index().await.expect("index");

    assert_eq!(
        slugs(&index.page_posts),
        vec![
            "django-signals",
            "untagged-thoughts",
            "web-basics",
            "async-python",
            "rust-ownership"
        ]
    );

    let tags: Vec<(&str, u64)> = index
        .popular_tags
        .iter()
        .map(|tag| (tag.title.as_str(), tag.posts_with_tag))
        .collect();
    assert_eq!(
        tags,
        vec![("python", 3), ("django", 2), ("rust", 1), ("web", 1)]
    );

    let years: Vec<(i32, u64)> = index
        .years
        .iter()
        .map(|year| (year.year, year.posts_count))
        .collect();
    assert_eq!(years, vec![(2021, 1), (2020, 3), (2019, 2)]);
}

#[tokio::test]
async fn cards_carry_teaser_image_and_ranked_tags() {
    let repo = sample_blog();
    let index = blog_service(&repo).index().await.expect("index");

    let web = index
        .page_posts
        .iter()
        .find(|card| card.slug == "web-basics")
        .expect("web-basics card");
    assert_eq!(web.image_url.as_deref(), Some("/media/covers/web.png"));
    assert_eq!(web.author, "admin");
    assert_eq!(web.teaser_text, "Web basics. Full text of the post.");
    let tags: Vec<(&str, u64)> = web
        .tags
        .iter()
        .map(|tag| (tag.title.as_str(), tag.posts_with_tag))
        .collect();
    assert_eq!(tags, vec![("python", 3), ("web", 1)]);
    assert_eq!(web.first_tag_title.as_deref(), Some("python"));
}

#[tokio::test]
async fn listing_query_count_does_not_depend_on_post_count() {
    let repo = sample_blog();
    let service = blog_service(&repo);

    repo.reset_queries();
    service.index().await.expect("index");
    let small = repo.query_count();

    let author = repo.add_user("writer", true);
    let fan = repo.add_user("fan", false);
    let tag = repo.add_tag("bulk");
    for n in 0..30 {
        let at = datetime!(2022-01-01 0:00 UTC) + Duration::hours(n);
        let post = repo.add_post(author, &format!("Bulk post {n}"), at);
        repo.tag_post(post, tag);
        repo.like(post, fan);
        repo.comment(post, fan, "+1", at + Duration::minutes(5));
    }

    repo.reset_queries();
    service.index().await.expect("index");
    let large = repo.query_count();

    // popular + fresh + tags + years, then comment counts and tags per listing
    assert_eq!(small, 8);
    assert_eq!(large, small);
}

#[tokio::test]
async fn empty_blog_skips_count_lookups() {
    let repo = std::sync::Arc::new(MemoryBlog::new());
    let index = blog_service(&repo).index().await.expect("index");

    assert!(index.most_popular_posts.is_empty());
    assert!(index.page_posts.is_empty());
    assert!(index.popular_tags.is_empty());
    assert!(index.years.is_empty());
    assert_eq!(repo.query_count(), 4);
}

#[tokio::test]
async fn post_detail_lists_comments_oldest_first() {
    let repo = sample_blog();
    let detail = blog_service(&repo)
        .post_detail("intro-to-django")
        .await
        .expect("detail")
        .expect("known post");

    let post = &detail.post;
    assert_eq!(post.title, "Intro to Django");
    assert_eq!(post.likes_amount, 3);
    assert!(post.image_url.is_none());

    let comments: Vec<(&str, &str)> = post
        .comments
        .iter()
        .map(|comment| (comment.author.as_str(), comment.text.as_str()))
        .collect();
    assert_eq!(comments, vec![("ann", "First!"), ("bob", "Second!")]);
    assert_eq!(post.comments[0].published_iso, "2019-03-01T11:00:00Z");

    let tags: Vec<&str> = post.tags.iter().map(|tag| tag.title.as_str()).collect();
    assert_eq!(tags, vec!["python", "django"]);

    assert_eq!(detail.sidebar.popular_tags.len(), 4);
    assert_eq!(detail.sidebar.most_popular_posts.len(), 5);
    assert!(detail.sidebar.years.iter().all(|year| !year.is_active));
}

#[tokio::test]
async fn unknown_slug_has_no_detail() {
    let repo = sample_blog();
    let detail = blog_service(&repo)
        .post_detail("does-not-exist")
        .await
        .expect("lookup");
    assert!(detail.is_none());
}

#[tokio::test]
async fn tag_filter_normalises_title_and_ranks_by_likes() {
    let repo = sample_blog();
    let listing = blog_service(&repo)
        .tag_filter("  PYTHON ")
        .await
        .expect("tag filter")
        .expect("known tag");

    assert_eq!(listing.heading, "#python");
    assert_eq!(listing.tag.as_deref(), Some("python"));
    assert_eq!(
        slugs(&listing.posts),
        vec!["intro-to-django", "async-python", "web-basics"]
    );
    assert_eq!(listing.posts[0].comments_amount, 2);
}

#[tokio::test]
async fn tag_filter_is_capped() {
    let repo = sample_blog();
    let author = repo.add_user("writer", true);
    let tag = repo.add_tag("daily");
    for n in 0..25 {
        let at = datetime!(2023-01-01 0:00 UTC) + Duration::days(n);
        let post = repo.add_post(author, &format!("Daily note {n}"), at);
        repo.tag_post(post, tag);
    }

    let listing = blog_service(&repo)
        .tag_filter("daily")
        .await
        .expect("tag filter")
        .expect("known tag");

    assert_eq!(listing.posts.len(), TAG_FILTER_POSTS_LIMIT as usize);
    assert_eq!(listing.posts[0].slug, "daily-note-24");
}

#[tokio::test]
async fn unknown_or_invalid_tags_have_no_listing() {
    let repo = sample_blog();
    let service = blog_service(&repo);

    assert!(service.tag_filter("golang").await.expect("lookup").is_none());
    assert!(
        service
            .tag_filter("a-tag-title-that-is-far-too-long")
            .await
            .expect("lookup")
            .is_none()
    );
    assert!(service.tag_filter("   ").await.expect("lookup").is_none());
}

#[tokio::test]
async fn year_archive_lists_posts_oldest_first() {
    let repo = sample_blog();
    let listing = blog_service(&repo)
        .year_archive("2020")
        .await
        .expect("archive");

    assert_eq!(listing.heading, "Posts of 2020");
    assert_eq!(
        slugs(&listing.posts),
        vec!["async-python", "web-basics", "untagged-thoughts"]
    );
    let active: Vec<i32> = listing
        .sidebar
        .years
        .iter()
        .filter(|year| year.is_active)
        .map(|year| year.year)
        .collect();
    assert_eq!(active, vec![2020]);
}

#[tokio::test]
async fn year_without_posts_renders_empty_listing() {
    let repo = sample_blog();
    let listing = blog_service(&repo)
        .year_archive("1999")
        .await
        .expect("archive");

    assert_eq!(listing.heading, "Posts of 1999");
    assert!(listing.posts.is_empty());
}

#[tokio::test]
async fn years_at_the_calendar_edge_render_empty_listings() {
    let repo = sample_blog();
    let service = blog_service(&repo);

    for year in ["9999", "123456"] {
        let listing = service.year_archive(year).await.expect("archive");
        assert_eq!(listing.heading, format!("Posts of {year}"));
        assert!(listing.posts.is_empty());
    }
}

#[tokio::test]
async fn non_numeric_year_is_rejected() {
    let repo = sample_blog();
    let err = blog_service(&repo)
        .year_archive("twenty")
        .await
        .expect_err("invalid year");
    assert!(matches!(err, BlogError::InvalidYear(year) if year == "twenty"));
}
