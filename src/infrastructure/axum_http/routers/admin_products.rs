use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post, put},
};

use crate::{
    application::usecases::products::ProductUseCase,
    auth::AdminUser,
    domain::{
        repositories::products::ProductRepository,
        value_objects::products::{InsertProductModel, UpdateProductModel},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad, repositories::products::ProductPostgres,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let product_repository = ProductPostgres::new(Arc::clone(&db_pool));
    let product_usecase = ProductUseCase::new(Arc::new(product_repository));

    Router::new()
        .route("/", post(create_product::<ProductPostgres>))
        .route("/:product_id", put(update_product::<ProductPostgres>))
        .route("/:product_id", delete(delete_product::<ProductPostgres>))
        .with_state(Arc::new(product_usecase))
}

pub async fn create_product<P>(
    State(product_usecase): State<Arc<ProductUseCase<P>>>,
    _admin: AdminUser,
    Json(insert_product_model): Json<InsertProductModel>,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync,
{
    match product_usecase.create(insert_product_model).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_product<P>(
    State(product_usecase): State<Arc<ProductUseCase<P>>>,
    _admin: AdminUser,
    Path(product_id): Path<String>,
    Json(update_product_model): Json<UpdateProductModel>,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync,
{
    match product_usecase.update(&product_id, update_product_model).await {
        Ok(product) => Json(product).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_product<P>(
    State(product_usecase): State<Arc<ProductUseCase<P>>>,
    _admin: AdminUser,
    Path(product_id): Path<String>,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync,
{
    match product_usecase.delete(&product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
