use std::sync::Arc;

use sqlx::PgPool;

use crate::assistant::CardGenerator;
use crate::auth::TokenCodec;
use crate::config::AppConfig;

/// Shared per-process state. Cloned per request; every field is cheap to
/// clone (the pool and generator are reference-counted internally).
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: PgPool,
    pub codec: TokenCodec,
    pub generator: Arc<CardGenerator>,
}
