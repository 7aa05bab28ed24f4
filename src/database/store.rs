//! Persistence gateway: typed, parameterized query/execute operations.
//!
//! Each function is a single SQL statement. Statements are atomic per call;
//! multi-statement sequences (set insert followed by card inserts) are NOT
//! wrapped in a transaction, so a mid-sequence failure can leave a partial
//! set behind. That gap is inherited behavior awaiting a product decision.

use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Card, Set, User};

pub async fn insert_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    username: &str,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, username, password, created_at, updated_at)
        VALUES (gen_random_uuid(), $1, $2, $3, $4, now(), now())
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(username)
    .bind(password_hash)
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up a user by username or email plus password hash.
pub async fn find_user_by_credentials(
    pool: &PgPool,
    identifier: &str,
    password_hash: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, username
        FROM users
        WHERE (username = $1 OR email = $1) AND password = $2
        "#,
    )
    .bind(identifier)
    .bind(password_hash)
    .fetch_optional(pool)
    .await
}

pub async fn list_sets_by_author(pool: &PgPool, author_id: Uuid) -> Result<Vec<Set>, sqlx::Error> {
    sqlx::query_as::<_, Set>(
        r#"
        SELECT id, name, description, author_id
        FROM sets
        WHERE author_id = $1
        "#,
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
}

pub async fn get_set(pool: &PgPool, set_id: Uuid) -> Result<Option<Set>, sqlx::Error> {
    sqlx::query_as::<_, Set>(
        r#"
        SELECT id, name, description, author_id
        FROM sets
        WHERE id = $1
        "#,
    )
    .bind(set_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_cards_for_set(pool: &PgPool, set_id: Uuid) -> Result<Vec<Card>, sqlx::Error> {
    sqlx::query_as::<_, Card>(
        r#"
        SELECT id, set_id, front, back
        FROM cards
        WHERE set_id = $1
        "#,
    )
    .bind(set_id)
    .fetch_all(pool)
    .await
}

pub async fn insert_set(pool: &PgPool, set: &Set) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sets (id, name, description, author_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, now(), now())
        "#,
    )
    .bind(set.id)
    .bind(&set.name)
    .bind(&set.description)
    .bind(set.author_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_card(pool: &PgPool, card: &Card) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO cards (id, front, back, set_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, now(), now())
        "#,
    )
    .bind(card.id)
    .bind(&card.front)
    .bind(&card.back)
    .bind(card.set_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_set(
    pool: &PgPool,
    set_id: Uuid,
    name: &str,
    description: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sets
        SET name = $1, description = $2
        WHERE id = $3
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(set_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a set by id. There is no existence check: deleting an unknown id
/// succeeds with zero rows affected, and the route still reports success.
pub async fn delete_set(pool: &PgPool, set_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM sets
        WHERE id = $1
        "#,
    )
    .bind(set_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
