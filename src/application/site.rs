//! Import/export of blog content as a TOML archive.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, query, query_as};
use time::OffsetDateTime;
use tokio::fs;
use uuid::Uuid;

use crate::{
    application::error::AppError,
    domain::{error::DomainError, posts, slug, tags},
    infra::{db::PostgresRepositories, error::InfraError},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteArchive {
    #[serde(default)]
    pub users: Vec<ArchiveUser>,
    #[serde(default)]
    pub tags: Vec<ArchiveTag>,
    #[serde(default)]
    pub posts: Vec<ArchivePost>,
    #[serde(default)]
    pub comments: Vec<ArchiveComment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveUser {
    pub username: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveTag {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivePost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    /// Username of a staff member.
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Usernames of users who liked the post.
    #[serde(default)]
    pub likes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveComment {
    /// Slug of the commented post.
    pub post: String,
    pub author: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub tags: usize,
    pub posts: usize,
    pub likes: usize,
    pub comments: usize,
}

impl SiteArchive {
    pub fn from_toml(data: &str) -> Result<Self, AppError> {
        toml::from_str(data).map_err(|err| AppError::validation(format!("invalid archive: {err}")))
    }

    pub fn to_toml(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self)
            .map_err(|err| AppError::unexpected(format!("failed to encode archive: {err}")))
    }

    /// Normalise titles and slugs, then check every cross reference.
    pub fn prepare(mut self) -> Result<Self, DomainError> {
        self.normalize()?;
        self.validate()?;
        Ok(self)
    }

    fn normalize(&mut self) -> Result<(), DomainError> {
        for user in &mut self.users {
            user.username = user.username.trim().to_string();
        }

        for tag in &mut self.tags {
            tag.title = tags::normalize_title(&tag.title)?;
        }

        for post in &mut self.posts {
            if let Some(explicit) = post.slug.as_mut() {
                *explicit = explicit.trim().to_ascii_lowercase();
            }
        }

        let mut taken: HashSet<String> = self
            .posts
            .iter()
            .filter_map(|post| post.slug.clone())
            .collect();

        for post in &mut self.posts {
            post.author = post.author.trim().to_string();
            let titles = post
                .tags
                .iter()
                .map(|title| tags::normalize_title(title))
                .collect::<Result<Vec<_>, _>>()?;
            post.tags = dedup_preserving_order(titles.iter().map(String::as_str));
            post.likes = dedup_preserving_order(post.likes.iter().map(|name| name.trim()));

            if post.slug.is_none() {
                let generated = slug::generate_unique_slug(&post.title, |candidate| {
                    !taken.contains(candidate)
                })
                .map_err(|err| DomainError::validation("slug", err.to_string()))?;
                taken.insert(generated.clone());
                post.slug = Some(generated);
            }
        }

        for comment in &mut self.comments {
            comment.author = comment.author.trim().to_string();
            comment.post = comment.post.trim().to_ascii_lowercase();
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), DomainError> {
        let mut staff: HashMap<&str, bool> = HashMap::new();
        for user in &self.users {
            if user.username.is_empty() {
                return Err(DomainError::validation("username", "must not be empty"));
            }
            if staff.insert(user.username.as_str(), user.is_staff).is_some() {
                return Err(DomainError::validation(
                    "username",
                    format!("`{}` is declared twice", user.username),
                ));
            }
        }

        let mut known_tags = HashSet::new();
        for tag in &self.tags {
            if !known_tags.insert(tag.title.as_str()) {
                return Err(DomainError::validation(
                    "tag title",
                    format!("`{}` is declared twice", tag.title),
                ));
            }
        }

        let mut slugs = HashSet::new();
        for post in &self.posts {
            let post_slug = post
                .slug
                .as_deref()
                .ok_or_else(|| DomainError::invariant("post slug missing after normalisation"))?;
            slug::validate_slug(post_slug)
                .map_err(|err| DomainError::validation("slug", err.to_string()))?;
            if !slugs.insert(post_slug) {
                return Err(DomainError::validation(
                    "slug",
                    format!("`{post_slug}` is used by more than one post"),
                ));
            }
            posts::validate_title(&post.title)?;
            posts::validate_text(&post.text)?;

            match staff.get(post.author.as_str()) {
                Some(true) => {}
                Some(false) => {
                    return Err(DomainError::validation(
                        "author",
                        format!("`{}` of post `{post_slug}` is not staff", post.author),
                    ));
                }
                None => {
                    return Err(DomainError::validation(
                        "author",
                        format!("unknown user `{}` on post `{post_slug}`", post.author),
                    ));
                }
            }

            if let Some(tag) = post.tags.iter().find(|tag| !known_tags.contains(tag.as_str())) {
                return Err(DomainError::validation(
                    "tags",
                    format!("unknown tag `{tag}` on post `{post_slug}`"),
                ));
            }

            if let Some(user) = post
                .likes
                .iter()
                .find(|user| !staff.contains_key(user.as_str()))
            {
                return Err(DomainError::validation(
                    "likes",
                    format!("unknown user `{user}` likes post `{post_slug}`"),
                ));
            }
        }

        for comment in &self.comments {
            if !slugs.contains(comment.post.as_str()) {
                return Err(DomainError::validation(
                    "comment",
                    format!("unknown post `{}`", comment.post),
                ));
            }
            if !staff.contains_key(comment.author.as_str()) {
                return Err(DomainError::validation(
                    "comment",
                    format!("unknown author `{}`", comment.author),
                ));
            }
            if comment.text.trim().is_empty() {
                return Err(DomainError::validation("comment", "text must not be empty"));
            }
        }

        Ok(())
    }
}

fn dedup_preserving_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}

/// Export the current content to the provided path as a TOML archive.
pub async fn export_site(repositories: &PostgresRepositories, path: &Path) -> Result<(), AppError> {
    let archive = gather_archive(repositories.pool()).await?;
    let encoded = archive.to_toml()?;
    fs::write(path, encoded)
        .await
        .map_err(|err| AppError::from(InfraError::file(path, err)))?;
    Ok(())
}

/// Replace the stored content with the archive at `path`.
pub async fn import_site(
    repositories: &PostgresRepositories,
    path: &Path,
) -> Result<ImportSummary, AppError> {
    let data = fs::read_to_string(path)
        .await
        .map_err(|err| AppError::from(InfraError::file(path, err)))?;
    let archive = SiteArchive::from_toml(&data)?.prepare()?;

    let mut summary = ImportSummary::default();
    let mut tx = repositories.begin().await.map_err(map_sqlx_error)?;

    query("TRUNCATE comments, post_likes, post_tags, posts, tags, users")
        .execute(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

    let mut user_ids = HashMap::new();
    for user in &archive.users {
        let id = Uuid::new_v4();
        query("INSERT INTO users (id, username, is_staff) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&user.username)
            .bind(user.is_staff)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        user_ids.insert(user.username.as_str(), id);
        summary.users += 1;
    }

    let mut tag_ids = HashMap::new();
    for tag in &archive.tags {
        let id = Uuid::new_v4();
        query("INSERT INTO tags (id, title) VALUES ($1, $2)")
            .bind(id)
            .bind(&tag.title)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        tag_ids.insert(tag.title.as_str(), id);
        summary.tags += 1;
    }

    let mut post_ids = HashMap::new();
    for post in &archive.posts {
        let id = Uuid::new_v4();
        let post_slug = post.slug.as_deref().unwrap_or_default();
        let author_id = lookup(&user_ids, &post.author, "user")?;
        query(
            r#"
            INSERT INTO posts (id, slug, title, text, image_path, published_at, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(post_slug)
        .bind(&post.title)
        .bind(&post.text)
        .bind(post.image.as_deref())
        .bind(post.published_at)
        .bind(author_id)
        .execute(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;
        post_ids.insert(post_slug, id);
        summary.posts += 1;

        for title in &post.tags {
            query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
                .bind(id)
                .bind(lookup(&tag_ids, title, "tag")?)
                .execute(tx.as_mut())
                .await
                .map_err(map_sqlx_error)?;
        }

        for username in &post.likes {
            query("INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2)")
                .bind(id)
                .bind(lookup(&user_ids, username, "user")?)
                .execute(tx.as_mut())
                .await
                .map_err(map_sqlx_error)?;
            summary.likes += 1;
        }
    }

    for comment in &archive.comments {
        query(
            r#"
            INSERT INTO comments (id, post_id, author_id, text, published_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(lookup(&post_ids, &comment.post, "post")?)
        .bind(lookup(&user_ids, &comment.author, "user")?)
        .bind(&comment.text)
        .bind(comment.published_at)
        .execute(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;
        summary.comments += 1;
    }

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(summary)
}

fn lookup(ids: &HashMap<&str, Uuid>, key: &str, entity: &'static str) -> Result<Uuid, AppError> {
    ids.get(key)
        .copied()
        .ok_or_else(|| AppError::from(DomainError::not_found(entity)))
}

fn map_sqlx_error(err: sqlx::Error) -> AppError {
    AppError::from(InfraError::from(err))
}

pub async fn gather_archive(pool: &PgPool) -> Result<SiteArchive, AppError> {
    let users = query_as::<_, (String, bool)>("SELECT username, is_staff FROM users ORDER BY username")
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(|(username, is_staff)| ArchiveUser { username, is_staff })
        .collect();

    let tags = query_as::<_, (String,)>("SELECT title FROM tags ORDER BY title")
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(|(title,)| ArchiveTag { title })
        .collect();

    let mut post_tags: HashMap<String, Vec<String>> = HashMap::new();
    let rows = query_as::<_, (String, String)>(
        r#"
        SELECT p.slug, t.title
        FROM post_tags pt
        INNER JOIN posts p ON p.id = pt.post_id
        INNER JOIN tags t ON t.id = pt.tag_id
        ORDER BY p.slug, t.title
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?;
    for (post_slug, title) in rows {
        post_tags.entry(post_slug).or_default().push(title);
    }

    let mut post_likes: HashMap<String, Vec<String>> = HashMap::new();
    let rows = query_as::<_, (String, String)>(
        r#"
        SELECT p.slug, u.username
        FROM post_likes pl
        INNER JOIN posts p ON p.id = pl.post_id
        INNER JOIN users u ON u.id = pl.user_id
        ORDER BY p.slug, u.username
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?;
    for (post_slug, username) in rows {
        post_likes.entry(post_slug).or_default().push(username);
    }

    let posts = query_as::<_, (String, String, String, Option<String>, OffsetDateTime, String)>(
        r#"
        SELECT p.slug, p.title, p.text, p.image_path, p.published_at, u.username
        FROM posts p
        INNER JOIN users u ON u.id = p.author_id
        ORDER BY p.published_at, p.slug
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?
    .into_iter()
    .map(|(post_slug, title, text, image, published_at, author)| ArchivePost {
        tags: post_tags.remove(&post_slug).unwrap_or_default(),
        likes: post_likes.remove(&post_slug).unwrap_or_default(),
        slug: Some(post_slug),
        title,
        text,
        image,
        published_at,
        author,
    })
    .collect();

    let comments = query_as::<_, (String, String, String, OffsetDateTime)>(
        r#"
        SELECT p.slug, u.username, c.text, c.published_at
        FROM comments c
        INNER JOIN posts p ON p.id = c.post_id
        INNER JOIN users u ON u.id = c.author_id
        ORDER BY c.published_at, c.id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?
    .into_iter()
    .map(|(post, author, text, published_at)| ArchiveComment {
        post,
        author,
        text,
        published_at,
    })
    .collect();

    Ok(SiteArchive {
        users,
        tags,
        posts,
        comments,
    })
}
