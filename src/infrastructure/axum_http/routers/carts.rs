use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};

use crate::{
    application::usecases::carts::CartUseCase,
    auth::AuthUser,
    domain::{
        repositories::{carts::CartRepository, products::ProductRepository},
        value_objects::{
            carts::{AddCartItemModel, BuyNowModel, RemoveCartItemModel, UpdateCartItemModel},
            enums::cart_kinds::CartKind,
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        repositories::{carts::CartPostgres, products::ProductPostgres},
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let cart_repository = CartPostgres::new(Arc::clone(&db_pool));
    let product_repository = ProductPostgres::new(Arc::clone(&db_pool));
    let cart_usecase = CartUseCase::new(Arc::new(cart_repository), Arc::new(product_repository));

    Router::new()
        .route("/", get(get_cart::<CartPostgres, ProductPostgres>))
        .route("/items", post(add_item::<CartPostgres, ProductPostgres>))
        .route("/items", patch(set_quantity::<CartPostgres, ProductPostgres>))
        .route("/items", delete(remove_item::<CartPostgres, ProductPostgres>))
        .route("/buy-now", get(get_buy_now_cart::<CartPostgres, ProductPostgres>))
        .route("/buy-now", post(buy_now::<CartPostgres, ProductPostgres>))
        .with_state(Arc::new(cart_usecase))
}

pub async fn get_cart<C, P>(
    State(cart_usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
    P: ProductRepository + Send + Sync,
{
    match cart_usecase.get_cart(user_id, CartKind::Standard).await {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn add_item<C, P>(
    State(cart_usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(add_cart_item_model): Json<AddCartItemModel>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
    P: ProductRepository + Send + Sync,
{
    match cart_usecase.add_item(user_id, add_cart_item_model).await {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn set_quantity<C, P>(
    State(cart_usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(update_cart_item_model): Json<UpdateCartItemModel>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
    P: ProductRepository + Send + Sync,
{
    match cart_usecase
        .set_quantity(user_id, update_cart_item_model)
        .await
    {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn remove_item<C, P>(
    State(cart_usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(remove_cart_item_model): Json<RemoveCartItemModel>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
    P: ProductRepository + Send + Sync,
{
    match cart_usecase
        .remove_item(user_id, remove_cart_item_model)
        .await
    {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_buy_now_cart<C, P>(
    State(cart_usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
    P: ProductRepository + Send + Sync,
{
    match cart_usecase.get_cart(user_id, CartKind::BuyNow).await {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn buy_now<C, P>(
    State(cart_usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(buy_now_model): Json<BuyNowModel>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
    P: ProductRepository + Send + Sync,
{
    match cart_usecase.buy_now(user_id, buy_now_model).await {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => err.into_response(),
    }
}
