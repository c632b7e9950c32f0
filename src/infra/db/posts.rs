use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PostQueryFilter, PostsRepo, RankedPost, RepoError, YearCount};
use crate::domain::entities::PostRecord;

use super::{PostgresRepositories, map_sqlx_error};

// Likes are the only aggregate joined here. Comment counts come from
// `comment_counts` so that the two joins never multiply each other's rows.
const RANKED_SELECT: &str = "SELECT p.id, p.slug, p.title, p.text, p.image_path, \
     p.published_at, p.author_id, u.username AS author, \
     COUNT(pl.user_id) AS likes_count \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_likes pl ON pl.post_id = p.id \
     WHERE 1=1 ";

const RANKED_GROUP_BY: &str = " GROUP BY p.id, u.username ";

#[derive(sqlx::FromRow)]
struct RankedPostRow {
    id: Uuid,
    slug: String,
    title: String,
    text: String,
    image_path: Option<String>,
    published_at: OffsetDateTime,
    author_id: Uuid,
    author: String,
    likes_count: i64,
}

impl TryFrom<RankedPostRow> for RankedPost {
    type Error = RepoError;

    fn try_from(row: RankedPostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            likes_count: PostgresRepositories::convert_count(row.likes_count)?,
            author: row.author,
            post: PostRecord {
                id: row.id,
                slug: row.slug,
                title: row.title,
                text: row.text,
                image_path: row.image_path,
                published_at: row.published_at,
                author_id: row.author_id,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct CommentCountRow {
    post_id: Uuid,
    comments_count: i64,
}

#[derive(sqlx::FromRow)]
struct YearCountRow {
    year: i32,
    posts_count: i64,
}

impl PostgresRepositories {
    async fn fetch_ranked(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<RankedPost>, RepoError> {
        let rows = qb
            .build_query_as::<RankedPostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(RankedPost::try_from).collect()
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_popular(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
    ) -> Result<Vec<RankedPost>, RepoError> {
        let mut qb = QueryBuilder::new(RANKED_SELECT);
        if let Some(tag_id) = filter.tag_id {
            qb.push(
                " AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ",
            );
            qb.push_bind(tag_id);
            qb.push(")");
        }
        qb.push(RANKED_GROUP_BY);
        qb.push(" ORDER BY likes_count DESC, p.published_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(limit));

        self.fetch_ranked(qb).await
    }

    async fn list_fresh(&self, limit: u32) -> Result<Vec<RankedPost>, RepoError> {
        let mut qb = QueryBuilder::new(RANKED_SELECT);
        qb.push(RANKED_GROUP_BY);
        qb.push(" ORDER BY p.published_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(limit));

        self.fetch_ranked(qb).await
    }

    async fn list_published_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<RankedPost>, RepoError> {
        let mut qb = QueryBuilder::new(RANKED_SELECT);
        qb.push(" AND p.published_at >= ");
        qb.push_bind(start);
        qb.push(" AND p.published_at < ");
        qb.push_bind(end);
        qb.push(RANKED_GROUP_BY);
        qb.push(" ORDER BY p.published_at ASC, p.id ASC");

        self.fetch_ranked(qb).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<RankedPost>, RepoError> {
        let mut qb = QueryBuilder::new(RANKED_SELECT);
        qb.push(" AND p.slug = ");
        qb.push_bind(slug);
        qb.push(RANKED_GROUP_BY);

        Ok(self.fetch_ranked(qb).await?.into_iter().next())
    }

    async fn comment_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError> {
        let mut counts: HashMap<Uuid, u64> = post_ids.iter().map(|id| (*id, 0)).collect();
        if post_ids.is_empty() {
            return Ok(counts);
        }

        let rows = sqlx::query_as::<_, CommentCountRow>(
            r#"
            SELECT post_id, COUNT(*) AS comments_count
            FROM comments
            WHERE post_id = ANY($1)
            GROUP BY post_id
            "#,
        )
        .bind(post_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        for row in rows {
            counts.insert(row.post_id, Self::convert_count(row.comments_count)?);
        }

        Ok(counts)
    }

    async fn list_years(&self) -> Result<Vec<YearCount>, RepoError> {
        let rows = sqlx::query_as::<_, YearCountRow>(
            r#"
            SELECT EXTRACT(YEAR FROM published_at AT TIME ZONE 'UTC')::INT4 AS year,
                   COUNT(*) AS posts_count
            FROM posts
            GROUP BY 1
            ORDER BY 1 DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(YearCount {
                    year: row.year,
                    posts_count: Self::convert_count(row.posts_count)?,
                })
            })
            .collect()
    }
}
