use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    application::usecases::checkout::CheckoutUseCase,
    auth::AuthUser,
    domain::value_objects::orders::CreateOrderModel,
    infrastructure::{
        gateway::razorpay_client::RazorpayClient,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                carts::CartPostgres, orders::OrderPostgres, payments::PaymentPostgres,
                products::ProductPostgres,
            },
        },
    },
};

type OrdersUseCase =
    CheckoutUseCase<OrderPostgres, CartPostgres, ProductPostgres, PaymentPostgres, RazorpayClient>;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let checkout_usecase: OrdersUseCase = CheckoutUseCase::new(
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CartPostgres::new(Arc::clone(&db_pool))),
        Arc::new(ProductPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        // The order surface never talks to the gateway.
        None,
    );

    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/:order_ref", get(get_order))
        .with_state(Arc::new(checkout_usecase))
}

pub async fn create_order(
    State(checkout_usecase): State<Arc<OrdersUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(create_order_model): Json<CreateOrderModel>,
) -> impl IntoResponse {
    match checkout_usecase
        .create_order_from_cart(user_id, create_order_model)
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_orders(
    State(checkout_usecase): State<Arc<OrdersUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse {
    match checkout_usecase.list_orders(user_id).await {
        Ok(orders) => Json(orders).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_order(
    State(checkout_usecase): State<Arc<OrdersUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(order_ref): Path<String>,
) -> impl IntoResponse {
    match checkout_usecase.get_order(user_id, &order_ref).await {
        Ok(order) => Json(order).into_response(),
        Err(err) => err.into_response(),
    }
}
