//! API Handlers
//!
//! HTTP request handlers. CRUD and search handlers are generic over the
//! record type; the router instantiates them once per entity.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::chain::RequestContext;
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    CreatedResponse, DeleteResponse, EntityStats, HealthResponse, Hotel, Record, RecordId,
    SearchParams, StatsResponse, User,
};
use crate::services::Entity;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub hotels: Entity<Hotel>,
    pub users: Entity<User>,
    /// Deadline applied to every request context
    pub request_timeout: Duration,
    /// Upper bound for the `limit` search parameter
    pub search_max_limit: usize,
}

impl AppState {
    pub fn new(hotels: Entity<Hotel>, users: Entity<User>, config: &Config) -> Self {
        Self {
            hotels,
            users,
            request_timeout: config.request_timeout(),
            search_max_limit: config.search_max_limit,
        }
    }

    fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}

/// Selects the entity services for a record type.
pub trait EntityState<R: Record> {
    fn entity(&self) -> &Entity<R>;
}

impl EntityState<Hotel> for AppState {
    fn entity(&self) -> &Entity<Hotel> {
        &self.hotels
    }
}

impl EntityState<User> for AppState {
    fn entity(&self) -> &Entity<User> {
        &self.users
    }
}

// Responses go through the index projection so credentials never leave the service.

/// Handler for `POST /hotels` and `POST /users`
pub async fn create_record<R>(
    State(state): State<AppState>,
    Json(record): Json<R>,
) -> Result<(StatusCode, Json<CreatedResponse<R::Id>>)>
where
    R: Record,
    AppState: EntityState<R>,
{
    let ctx = state.context();
    let id = state.entity().chain.create(&ctx, record).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

/// Handler for `GET /hotels/:id` and `GET /users/:id`
pub async fn get_record<R>(State(state): State<AppState>, Path(raw_id): Path<String>) -> Result<Json<R>>
where
    R: Record,
    AppState: EntityState<R>,
{
    let id = R::Id::parse_id(&raw_id)?;
    let ctx = state.context();
    let record = state.entity().chain.get_by_id(&ctx, &id).await?;
    Ok(Json(record.index_view()))
}

/// Handler for `PUT /hotels/:id` and `PUT /users/:id`
///
/// Only the non-empty fields of the body are applied.
pub async fn update_record<R>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(mut patch): Json<R>,
) -> Result<Json<R>>
where
    R: Record,
    AppState: EntityState<R>,
{
    let id = R::Id::parse_id(&raw_id)?;
    patch.set_id(id);
    let ctx = state.context();
    let merged = state.entity().chain.update(&ctx, patch).await?;
    Ok(Json(merged.index_view()))
}

/// Handler for `DELETE /hotels/:id` and `DELETE /users/:id`
pub async fn delete_record<R>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeleteResponse>>
where
    R: Record,
    AppState: EntityState<R>,
{
    let id = R::Id::parse_id(&raw_id)?;
    let ctx = state.context();
    state.entity().chain.delete(&ctx, &id).await?;
    Ok(Json(DeleteResponse::new(R::ENTITY, id)))
}

/// Handler for `GET /search` and `GET /users/search`
pub async fn search_records<R>(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<R>>>
where
    R: Record,
    AppState: EntityState<R>,
{
    let page = params.validate(state.search_max_limit)?;
    let results = state
        .entity()
        .index
        .search(&page.query, page.limit, page.offset)
        .await?;
    Ok(Json(results))
}

/// Handler for `GET /users/username/:username`
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>> {
    let ctx = state.context();
    let user = state.users.chain.get_by_alias(&ctx, &username).await?;
    Ok(Json(user.index_view()))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        hotels: entity_stats(&state.hotels).await,
        users: entity_stats(&state.users).await,
    })
}

async fn entity_stats<R: Record>(entity: &Entity<R>) -> EntityStats {
    EntityStats::new(
        entity.local.stats().await,
        entity.chain.stats(),
        entity.index.len().await,
    )
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
