use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, TagWithCount, TagsRepo},
    domain::entities::TagRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TagRow {
    id: Uuid,
    title: String,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagCountRow {
    id: Uuid,
    title: String,
    posts_count: i64,
}

impl TryFrom<TagCountRow> for TagWithCount {
    type Error = RepoError;

    fn try_from(row: TagCountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            posts_count: PostgresRepositories::convert_count(row.posts_count)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    title: String,
    posts_count: i64,
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn list_popular(&self, limit: Option<u32>) -> Result<Vec<TagWithCount>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT t.id, t.title, COUNT(pt.post_id) AS posts_count \
             FROM tags t \
             LEFT JOIN post_tags pt ON pt.tag_id = t.id \
             GROUP BY t.id \
             ORDER BY posts_count DESC, t.title ASC",
        );
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
        }

        let rows = qb
            .build_query_as::<TagCountRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(TagWithCount::try_from).collect()
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<TagRecord>, RepoError> {
        let row = sqlx::query_as::<_, TagRow>("SELECT id, title FROM tags WHERE title = $1")
            .bind(title)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(TagRecord::from))
    }

    async fn tags_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<TagWithCount>>, RepoError> {
        let mut grouped: HashMap<Uuid, Vec<TagWithCount>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(grouped);
        }

        let rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            WITH tag_counts AS (
                SELECT t.id, t.title, COUNT(pt.post_id) AS posts_count
                FROM tags t
                LEFT JOIN post_tags pt ON pt.tag_id = t.id
                GROUP BY t.id
            )
            SELECT pt.post_id, tc.id, tc.title, tc.posts_count
            FROM post_tags pt
            INNER JOIN tag_counts tc ON tc.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY pt.post_id, tc.posts_count DESC, tc.title ASC
            "#,
        )
        .bind(post_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        for row in rows {
            grouped.entry(row.post_id).or_default().push(TagWithCount {
                id: row.id,
                title: row.title,
                posts_count: Self::convert_count(row.posts_count)?,
            });
        }

        Ok(grouped)
    }
}
