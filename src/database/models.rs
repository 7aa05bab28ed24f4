use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Registered account. The password column is never selected into this type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    #[serde(rename = "userId")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub username: String,
}

/// A study deck owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Set {
    #[serde(rename = "setId")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "authorId")]
    pub author_id: Uuid,
}

/// One flash card belonging to a set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Card {
    #[serde(rename = "cardId")]
    pub id: Uuid,
    #[serde(rename = "setId")]
    pub set_id: Uuid,
    pub front: String,
    pub back: String,
}
