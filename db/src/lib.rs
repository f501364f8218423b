use anyhow::Result;
use chrono::{DateTime, Utc};
use common::{GenerationRecord, GenerationStatus, UserProfile};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn init_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

type GenerationRow = (Uuid, Uuid, String, String, String, i64, DateTime<Utc>);

fn generation_from_row(row: GenerationRow) -> GenerationRecord {
    let (id, user_id, kind, prompt, status, credits_used, created_at) = row;
    GenerationRecord {
        id: id.to_string(),
        user_id: user_id.to_string(),
        kind,
        prompt,
        status: GenerationStatus::parse(&status),
        credits_used,
        created_at,
    }
}

const RECENT_GENERATIONS_SQL: &str = r#"select
        g.id,
        g.user_id,
        coalesce(g.type, ''),
        coalesce(g.prompt, ''),
        coalesce(g.status, 'pending'),
        coalesce(g.credits_used, 0)::int8,
        g.created_at
    from generations g
    where g.user_id = $1
    order by g.created_at desc
    limit $2"#;

const PROFILE_SQL: &str = r#"select
        p.id,
        coalesce(p.credits, 0)::int8,
        p.subscription_tier,
        p.role
    from profiles p
    where p.id = $1"#;

/// Newest-first generations of one user.
pub async fn list_recent_generations(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<GenerationRecord>> {
    let rows = sqlx::query_as::<_, GenerationRow>(RECENT_GENERATIONS_SQL)
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(generation_from_row).collect())
}

pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<UserProfile>> {
    let row = sqlx::query_as::<_, (Uuid, i64, Option<String>, Option<String>)>(PROFILE_SQL)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id, credits, subscription_tier, role)| UserProfile {
        id: id.to_string(),
        credits,
        subscription_tier,
        role,
    }))
}
