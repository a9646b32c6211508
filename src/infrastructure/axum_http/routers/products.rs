use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use crate::{
    application::usecases::products::ProductUseCase,
    domain::repositories::products::ProductRepository,
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad, repositories::products::ProductPostgres,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let product_repository = ProductPostgres::new(Arc::clone(&db_pool));
    let product_usecase = ProductUseCase::new(Arc::new(product_repository));

    Router::new()
        .route("/", get(list_catalog::<ProductPostgres>))
        .route("/:product_id", get(get_product::<ProductPostgres>))
        .with_state(Arc::new(product_usecase))
}

pub async fn list_catalog<P>(
    State(product_usecase): State<Arc<ProductUseCase<P>>>,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync,
{
    match product_usecase.list_catalog().await {
        Ok(products) => Json(products).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_product<P>(
    State(product_usecase): State<Arc<ProductUseCase<P>>>,
    Path(product_id): Path<String>,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync,
{
    match product_usecase.get(&product_id).await {
        Ok(product) => Json(product).into_response(),
        Err(err) => err.into_response(),
    }
}
