use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    application::usecases::checkout::CheckoutUseCase,
    auth::AuthUser,
    config::config_model::DotEnvyConfig,
    domain::value_objects::payments::{CreatePaymentModel, VerifyPaymentModel},
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

type PaymentsUseCase =
    CheckoutUseCase<OrderPostgres, CartPostgres, ProductPostgres, PaymentPostgres, RazorpayClient>;

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    order_ref: String,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let gateway = config.razorpay.as_ref().map(|razorpay| {
        Arc::new(RazorpayClient::new(
            razorpay.key_id.clone(),
            razorpay.key_secret.clone(),
        ))
    });

    let checkout_usecase = CheckoutUseCase::new(
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CartPostgres::new(Arc::clone(&db_pool))),
        Arc::new(ProductPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        gateway,
    );

    Router::new()
        .route("/", post(create_payment_intent))
        .route("/", get(get_payment))
        .route("/verify", post(verify_payment))
        .with_state(Arc::new(checkout_usecase))
}

pub async fn create_payment_intent(
    State(checkout_usecase): State<Arc<PaymentsUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(create_payment_model): Json<CreatePaymentModel>,
) -> impl IntoResponse {
    match checkout_usecase
        .create_payment_intent(user_id, create_payment_model)
        .await
    {
        Ok(intent) => Json(intent).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn verify_payment(
    State(checkout_usecase): State<Arc<PaymentsUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(verify_payment_model): Json<VerifyPaymentModel>,
) -> impl IntoResponse {
    match checkout_usecase
        .verify_payment(user_id, verify_payment_model)
        .await
    {
        Ok(verified) => Json(verified).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_payment(
    State(checkout_usecase): State<Arc<PaymentsUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Query(query): Query<PaymentQuery>,
) -> impl IntoResponse {
    match checkout_usecase.get_payment(user_id, &query.order_ref).await {
        Ok(payment) => Json(payment).into_response(),
        Err(err) => err.into_response(),
    }
}
