use std::{collections::HashMap, sync::Arc};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{orders::OrderWithItems, payments::InsertPaymentEntity},
        repositories::{
            carts::CartRepository, orders::OrderRepository, payments::PaymentRepository,
            products::ProductRepository,
        },
        value_objects::{
            enums::{
                cart_kinds::CartKind, order_statuses::OrderStatus,
                payment_methods::PaymentMethod, payment_statuses::PaymentStatus,
                transaction_statuses::TransactionStatus,
            },
            orders::{
                CreateOrderModel, CreatedOrderDto, NewOrder, OrderCreationOutcome, OrderDto,
                OrderItemSnapshot, OrderSummaryDto, PaymentFinalization, StockShortage,
                compute_order_totals,
            },
            payments::{
                CreatePaymentModel, DEFAULT_CURRENCY, MOCK_SIGNATURE, PaymentDto,
                PaymentIntentDto, PaymentVerifiedDto, VerifyPaymentModel,
            },
            products::VariantKey,
            stock::{StockError, check_availability},
        },
    },
    infrastructure::gateway::razorpay_client::RazorpayClient,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn public_key_id(&self) -> String;

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> AnyResult<String>;

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> AnyResult<bool>;
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn public_key_id(&self) -> String {
        self.key_id().to_string()
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> AnyResult<String> {
        self.create_order(amount_minor, currency, receipt).await
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> AnyResult<bool> {
        self.verify_payment_signature(gateway_order_id, gateway_payment_id, signature)
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("insufficient stock for {product_name}: only {available} left")]
    OutOfStock {
        product_name: String,
        available: i32,
    },
    #[error("order does not belong to the authenticated user")]
    AccessDenied,
    #[error("order is already paid")]
    AlreadyPaid,
    #[error("payment verification failed: invalid signature")]
    SignatureRejected,
    #[error("payment gateway is not configured")]
    GatewayUnavailable,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CheckoutError::Validation(_) => StatusCode::BAD_REQUEST,
            CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
            CheckoutError::OutOfStock { .. } => StatusCode::BAD_REQUEST,
            CheckoutError::AccessDenied => StatusCode::FORBIDDEN,
            CheckoutError::AlreadyPaid => StatusCode::CONFLICT,
            CheckoutError::SignatureRejected => StatusCode::BAD_REQUEST,
            CheckoutError::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn out_of_stock(shortage: StockShortage) -> Self {
        let product_name = match VariantKey::new(shortage.size, shortage.color).label() {
            Some(label) => format!("{} ({})", shortage.product_name, label),
            None => shortage.product_name,
        };
        CheckoutError::OutOfStock {
            product_name,
            available: shortage.available,
        }
    }
}

pub type CheckoutResult<T> = std::result::Result<T, CheckoutError>;

/// Drives the order-payment-stock lifecycle: snapshot a cart into an order,
/// open a gateway transaction for it, and on verified payment confirm the
/// order, clear the cart and lower stock.
pub struct CheckoutUseCase<O, C, P, Pay, G>
where
    O: OrderRepository + Send + Sync + 'static,
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    order_repo: Arc<O>,
    cart_repo: Arc<C>,
    product_repo: Arc<P>,
    payment_repo: Arc<Pay>,
    gateway: Option<Arc<G>>,
}

impl<O, C, P, Pay, G> CheckoutUseCase<O, C, P, Pay, G>
where
    O: OrderRepository + Send + Sync + 'static,
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        order_repo: Arc<O>,
        cart_repo: Arc<C>,
        product_repo: Arc<P>,
        payment_repo: Arc<Pay>,
        gateway: Option<Arc<G>>,
    ) -> Self {
        Self {
            order_repo,
            cart_repo,
            product_repo,
            payment_repo,
            gateway,
        }
    }

    pub async fn create_order_from_cart(
        &self,
        user_id: Uuid,
        model: CreateOrderModel,
    ) -> CheckoutResult<CreatedOrderDto> {
        info!(%user_id, buy_now = model.buy_now, "checkout: creating order from cart");

        if let Some(field) = model.shipping_address.missing_field() {
            let err = CheckoutError::Validation(format!("shipping address is missing {field}"));
            warn!(
                %user_id,
                missing_field = field,
                status = err.status_code().as_u16(),
                "checkout: incomplete shipping address"
            );
            return Err(err);
        }

        let kind = if model.buy_now {
            CartKind::BuyNow
        } else {
            CartKind::Standard
        };

        let cart = self
            .cart_repo
            .find(user_id, kind)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load cart");
                CheckoutError::Internal(err)
            })?
            .filter(|cart| !cart.items.is_empty());

        let Some(cart) = cart else {
            let err = CheckoutError::Validation("cart is empty".to_string());
            warn!(
                %user_id,
                cart_kind = %kind,
                status = err.status_code().as_u16(),
                "checkout: order requested over an empty cart"
            );
            return Err(err);
        };

        let lines = cart.lines();
        let mut product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let products = self
            .product_repo
            .find_many_with_variants(product_ids)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load products for cart");
                CheckoutError::Internal(err)
            })?;
        let products: HashMap<Uuid, _> = products
            .into_iter()
            .map(|product| (product.product.id, product))
            .collect();

        let mut items = Vec::with_capacity(lines.len());
        let mut subtotal = 0_i64;

        for line in &lines {
            let Some(product) = products.get(&line.product_id) else {
                warn!(
                    %user_id,
                    product_pk = %line.product_id,
                    "checkout: cart references a product that no longer exists"
                );
                return Err(CheckoutError::NotFound("product"));
            };

            let key = line.variant_key();
            let check = check_availability(product, &key, line.quantity).map_err(
                |StockError::VariantRequired| {
                    CheckoutError::Validation(format!(
                        "variant selection is required for {}",
                        product.product.name
                    ))
                },
            )?;

            if !check.sufficient {
                let err = CheckoutError::out_of_stock(StockShortage {
                    product_name: product.product.name.clone(),
                    size: key.size.clone(),
                    color: key.color.clone(),
                    available: check.available,
                });
                warn!(
                    %user_id,
                    product_id = %product.product.product_id,
                    requested = line.quantity,
                    available = check.available,
                    "checkout: insufficient stock at validation"
                );
                return Err(err);
            }

            let line_subtotal = i64::from(line.quantity) * line.price;
            subtotal += line_subtotal;
            items.push(OrderItemSnapshot {
                product_id: product.product.id,
                product_name: product.product.name.clone(),
                product_image: product.product.image_url.clone(),
                size: key.size,
                color: key.color,
                quantity: line.quantity,
                price: line.price,
                subtotal: line_subtotal,
            });
        }

        let totals = compute_order_totals(subtotal);
        let new_order = NewOrder {
            user_id,
            totals,
            shipping_address: model.shipping_address,
            notes: model.notes.unwrap_or_default(),
        };

        let outcome = self
            .order_repo
            .create_order_guarded(new_order, items)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to persist order");
                CheckoutError::Internal(err)
            })?;

        match outcome {
            OrderCreationOutcome::Created(created) => {
                info!(
                    %user_id,
                    order_ref = %created.order_ref,
                    total_amount = created.total_amount,
                    "checkout: order created"
                );
                Ok(CreatedOrderDto {
                    order_ref: created.order_ref,
                    total_amount: created.total_amount,
                })
            }
            OrderCreationOutcome::InsufficientStock(shortage) => {
                warn!(
                    %user_id,
                    product_name = %shortage.product_name,
                    available = shortage.available,
                    "checkout: stock ran out between validation and write"
                );
                Err(CheckoutError::out_of_stock(shortage))
            }
        }
    }

    pub async fn create_payment_intent(
        &self,
        user_id: Uuid,
        model: CreatePaymentModel,
    ) -> CheckoutResult<PaymentIntentDto> {
        info!(
            %user_id,
            order_ref = %model.order_ref,
            mock_mode = model.mock_mode,
            "checkout: creating payment intent"
        );

        let order = self
            .order_repo
            .find_by_order_ref(&model.order_ref)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load order for intent");
                CheckoutError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, order_ref = %model.order_ref, "checkout: order not found for intent");
                CheckoutError::NotFound("order")
            })?
            .order;

        if order.user_id != user_id {
            warn!(
                %user_id,
                order_ref = %order.order_ref,
                "checkout: payment intent for someone else's order"
            );
            return Err(CheckoutError::AccessDenied);
        }

        if order.payment_status == PaymentStatus::Completed.as_str() {
            let err = CheckoutError::AlreadyPaid;
            warn!(
                %user_id,
                order_ref = %order.order_ref,
                status = err.status_code().as_u16(),
                "checkout: intent requested for a paid order"
            );
            return Err(err);
        }

        let (gateway_order_id, method, key_id) = if model.mock_mode {
            let fabricated = format!("mock_order_{}", Uuid::new_v4().simple());
            (fabricated, PaymentMethod::Mock, None)
        } else {
            let gateway = self.gateway.as_ref().ok_or_else(|| {
                warn!(
                    %user_id,
                    order_ref = %order.order_ref,
                    "checkout: payment intent requested but no gateway is configured"
                );
                CheckoutError::GatewayUnavailable
            })?;

            // The gateway bills in minor units; order amounts are whole units.
            let gateway_order_id = gateway
                .create_order(order.total_amount * 100, DEFAULT_CURRENCY, &order.order_ref)
                .await
                .map_err(|err| {
                    error!(
                        %user_id,
                        order_ref = %order.order_ref,
                        error = ?err,
                        "checkout: gateway order creation failed"
                    );
                    CheckoutError::Internal(err)
                })?;

            (
                gateway_order_id,
                PaymentMethod::Razorpay,
                Some(gateway.public_key_id()),
            )
        };

        self.order_repo
            .attach_payment_intent(order.id, &gateway_order_id, method)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    order_ref = %order.order_ref,
                    db_error = ?err,
                    "checkout: failed to attach payment intent to order"
                );
                CheckoutError::Internal(err)
            })?;

        self.payment_repo
            .record_intent(InsertPaymentEntity {
                order_id: order.id,
                user_id,
                gateway: method.to_string(),
                gateway_order_id: gateway_order_id.clone(),
                amount: order.total_amount,
                currency: DEFAULT_CURRENCY.to_string(),
                status: TransactionStatus::Created.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    order_ref = %order.order_ref,
                    db_error = ?err,
                    "checkout: failed to record payment attempt"
                );
                CheckoutError::Internal(err)
            })?;

        info!(
            %user_id,
            order_ref = %order.order_ref,
            %gateway_order_id,
            method = %method,
            "checkout: payment intent created"
        );

        Ok(PaymentIntentDto {
            gateway_order_id,
            amount: order.total_amount,
            currency: DEFAULT_CURRENCY.to_string(),
            order_ref: order.order_ref,
            key_id,
            mock_mode: model.mock_mode,
        })
    }

    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        model: VerifyPaymentModel,
    ) -> CheckoutResult<PaymentVerifiedDto> {
        if model.gateway_order_id.trim().is_empty() || model.gateway_payment_id.trim().is_empty() {
            return Err(CheckoutError::Validation(
                "missing payment details".to_string(),
            ));
        }

        let order_with_items = self
            .order_repo
            .find_by_gateway_order_id(&model.gateway_order_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load order for verification");
                CheckoutError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(
                    %user_id,
                    gateway_order_id = %model.gateway_order_id,
                    "checkout: no order matches the gateway transaction"
                );
                CheckoutError::NotFound("order")
            })?;
        let order = &order_with_items.order;

        if order.user_id != user_id {
            warn!(
                %user_id,
                order_ref = %order.order_ref,
                "checkout: verification attempt against someone else's order"
            );
            return Err(CheckoutError::AccessDenied);
        }

        let mock = model.mock_mode
            || order.payment_method.as_deref() == Some(PaymentMethod::Mock.as_str());

        let signature = if mock {
            MOCK_SIGNATURE.to_string()
        } else {
            let signature = model
                .signature
                .clone()
                .filter(|signature| !signature.is_empty())
                .ok_or_else(|| {
                    CheckoutError::Validation("payment signature is missing".to_string())
                })?;

            let gateway = self
                .gateway
                .as_ref()
                .ok_or(CheckoutError::GatewayUnavailable)?;
            let valid = gateway
                .verify_payment_signature(
                    &model.gateway_order_id,
                    &model.gateway_payment_id,
                    &signature,
                )
                .map_err(|err| {
                    error!(
                        %user_id,
                        order_ref = %order.order_ref,
                        error = ?err,
                        "checkout: signature verification errored"
                    );
                    CheckoutError::Internal(err)
                })?;

            if !valid {
                warn!(
                    %user_id,
                    order_ref = %order.order_ref,
                    gateway_order_id = %model.gateway_order_id,
                    "checkout: signature mismatch, marking payment failed"
                );
                self.order_repo
                    .finalize_payment_failure(
                        order.id,
                        &model.gateway_order_id,
                        "invalid payment signature",
                    )
                    .await
                    .map_err(|err| {
                        error!(
                            %user_id,
                            order_ref = %order.order_ref,
                            db_error = ?err,
                            "checkout: failed to record payment failure"
                        );
                        CheckoutError::Internal(err)
                    })?;
                return Err(CheckoutError::SignatureRejected);
            }

            signature
        };

        let finalization = self
            .order_repo
            .finalize_payment_success(
                order.id,
                order.user_id,
                &model.gateway_order_id,
                &model.gateway_payment_id,
                &signature,
            )
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    order_ref = %order.order_ref,
                    db_error = ?err,
                    "checkout: failed to finalize verified payment"
                );
                CheckoutError::Internal(err)
            })?;

        match finalization {
            PaymentFinalization::Finalized => {
                info!(
                    %user_id,
                    order_ref = %order.order_ref,
                    gateway_payment_id = %model.gateway_payment_id,
                    "checkout: payment verified, order confirmed"
                );
                self.reduce_stock(&order_with_items).await;
            }
            PaymentFinalization::AlreadyFinalized => {
                info!(
                    %user_id,
                    order_ref = %order.order_ref,
                    "checkout: verification replayed for a completed order, skipping side effects"
                );
            }
        }

        Ok(PaymentVerifiedDto {
            order_ref: order.order_ref.clone(),
            status: OrderStatus::Confirmed.to_string(),
            gateway_payment_id: model.gateway_payment_id,
        })
    }

    pub async fn get_order(&self, user_id: Uuid, order_ref: &str) -> CheckoutResult<OrderDto> {
        let order = self
            .order_repo
            .find_by_order_ref(order_ref)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load order");
                CheckoutError::Internal(err)
            })?
            .ok_or(CheckoutError::NotFound("order"))?;

        if order.order.user_id != user_id {
            return Err(CheckoutError::AccessDenied);
        }

        Ok(OrderDto::from(order))
    }

    pub async fn list_orders(&self, user_id: Uuid) -> CheckoutResult<Vec<OrderSummaryDto>> {
        let orders = self.order_repo.list_for_user(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "checkout: failed to list orders");
            CheckoutError::Internal(err)
        })?;

        Ok(orders.into_iter().map(OrderSummaryDto::from).collect())
    }

    pub async fn get_payment(&self, user_id: Uuid, order_ref: &str) -> CheckoutResult<PaymentDto> {
        let order = self
            .order_repo
            .find_by_order_ref(order_ref)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load order for payment lookup");
                CheckoutError::Internal(err)
            })?
            .ok_or(CheckoutError::NotFound("order"))?;

        if order.order.user_id != user_id {
            return Err(CheckoutError::AccessDenied);
        }

        let payment = self
            .payment_repo
            .find_latest_by_order(order.order.id)
            .await
            .map_err(|err| {
                error!(%user_id, %order_ref, db_error = ?err, "checkout: failed to load payment");
                CheckoutError::Internal(err)
            })?
            .ok_or(CheckoutError::NotFound("payment"))?;

        Ok(PaymentDto::from(payment))
    }

    /// Best-effort stock reduction after a verified payment. Failures are
    /// logged for reconciliation, never propagated: the payment stays
    /// verified no matter what happens here.
    async fn reduce_stock(&self, order: &OrderWithItems) {
        for item in &order.items {
            let key = VariantKey::new(item.size.clone(), item.color.clone());
            match self
                .product_repo
                .decrement_stock(item.product_id, key, item.quantity)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    error!(
                        order_ref = %order.order.order_ref,
                        product_pk = %item.product_id,
                        product_name = %item.product_name,
                        "checkout: stock row missing during decrement, manual reconciliation required"
                    );
                }
                Err(err) => {
                    error!(
                        order_ref = %order.order.order_ref,
                        product_pk = %item.product_id,
                        product_name = %item.product_name,
                        db_error = ?err,
                        "checkout: stock decrement failed, manual reconciliation required"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::{
            carts::{CartEntity, CartItemEntity, CartWithItems},
            orders::{OrderEntity, OrderItemEntity},
            products::{ProductEntity, ProductVariantEntity, ProductWithVariants},
        },
        repositories::{
            carts::MockCartRepository, orders::MockOrderRepository,
            payments::MockPaymentRepository, products::MockProductRepository,
        },
        value_objects::orders::{CreatedOrder, ShippingAddressModel},
    };
    use chrono::Utc;
    use mockall::predicate::eq;

    type TestUseCase = CheckoutUseCase<
        MockOrderRepository,
        MockCartRepository,
        MockProductRepository,
        MockPaymentRepository,
        MockPaymentGateway,
    >;

    fn usecase(
        order_repo: MockOrderRepository,
        cart_repo: MockCartRepository,
        product_repo: MockProductRepository,
        payment_repo: MockPaymentRepository,
        gateway: Option<MockPaymentGateway>,
    ) -> TestUseCase {
        CheckoutUseCase::new(
            Arc::new(order_repo),
            Arc::new(cart_repo),
            Arc::new(product_repo),
            Arc::new(payment_repo),
            gateway.map(Arc::new),
        )
    }

    fn address() -> ShippingAddressModel {
        ShippingAddressModel {
            name: "A Customer".to_string(),
            phone: "9999999999".to_string(),
            address_line1: "1 Main St".to_string(),
            address_line2: None,
            city: "Pune".to_string(),
            state: "MH".to_string(),
            pincode: "411001".to_string(),
        }
    }

    fn create_order_model(buy_now: bool) -> CreateOrderModel {
        CreateOrderModel {
            shipping_address: address(),
            notes: None,
            buy_now,
        }
    }

    fn cart_with_line(user_id: Uuid, product_pk: Uuid, quantity: i32, price: i64) -> CartWithItems {
        let now = Utc::now();
        let cart_id = Uuid::new_v4();
        CartWithItems {
            cart: CartEntity {
                id: cart_id,
                user_id,
                kind: CartKind::Standard.as_str().to_string(),
                total_quantity: quantity,
                total_price: i64::from(quantity) * price,
                expires_at: None,
                created_at: now,
                updated_at: now,
            },
            items: vec![CartItemEntity {
                id: Uuid::new_v4(),
                cart_id,
                product_id: product_pk,
                size: None,
                color: None,
                quantity,
                price,
            }],
        }
    }

    fn flat_product(product_pk: Uuid, stock: i32, price: i64) -> ProductWithVariants {
        let now = Utc::now();
        ProductWithVariants {
            product: ProductEntity {
                id: product_pk,
                product_id: "tee-01".to_string(),
                name: "Tee".to_string(),
                description: String::new(),
                price,
                image_url: "/placeholder.png".to_string(),
                has_variants: false,
                created_at: now,
                updated_at: now,
            },
            variants: vec![ProductVariantEntity {
                id: Uuid::new_v4(),
                product_id: product_pk,
                size: None,
                color: None,
                quantity: stock,
            }],
        }
    }

    fn pending_order(user_id: Uuid) -> OrderEntity {
        let now = Utc::now();
        OrderEntity {
            id: Uuid::new_v4(),
            order_ref: "ORD-20260101-12345".to_string(),
            user_id,
            subtotal: 500,
            shipping_cost: 0,
            tax: 90,
            total_amount: 590,
            status: OrderStatus::Pending.to_string(),
            payment_status: PaymentStatus::Pending.to_string(),
            payment_method: None,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_signature: None,
            ship_name: "A Customer".to_string(),
            ship_phone: "9999999999".to_string(),
            ship_address_line1: "1 Main St".to_string(),
            ship_address_line2: None,
            ship_city: "Pune".to_string(),
            ship_state: "MH".to_string(),
            ship_pincode: "411001".to_string(),
            notes: String::new(),
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn order_with_one_item(order: OrderEntity, product_pk: Uuid, quantity: i32) -> OrderWithItems {
        let order_id = order.id;
        OrderWithItems {
            order,
            items: vec![OrderItemEntity {
                id: Uuid::new_v4(),
                order_id,
                product_id: product_pk,
                product_name: "Tee".to_string(),
                product_image: "/placeholder.png".to_string(),
                size: None,
                color: None,
                quantity,
                price: 250,
                subtotal: i64::from(quantity) * 250,
            }],
        }
    }

    #[tokio::test]
    async fn creates_an_order_with_the_expected_totals() {
        let user_id = Uuid::new_v4();
        let product_pk = Uuid::new_v4();

        let mut cart_repo = MockCartRepository::new();
        let cart = cart_with_line(user_id, product_pk, 2, 250);
        cart_repo
            .expect_find()
            .with(eq(user_id), eq(CartKind::Standard))
            .returning(move |_, _| {
                let cart = cart.clone();
                Ok(Some(cart))
            });

        let mut product_repo = MockProductRepository::new();
        let product = flat_product(product_pk, 5, 250);
        product_repo
            .expect_find_many_with_variants()
            .returning(move |_| {
                let product = product.clone();
                Ok(vec![product])
            });

        let mut order_repo = MockOrderRepository::new();
        order_repo
            .expect_create_order_guarded()
            .withf(|order, items| {
                order.totals.subtotal == 500
                    && order.totals.shipping_cost == 0
                    && order.totals.tax == 90
                    && order.totals.total_amount == 590
                    && items.len() == 1
                    && items[0].subtotal == 500
            })
            .returning(|order, _| {
                let total_amount = order.totals.total_amount;
                Ok(OrderCreationOutcome::Created(CreatedOrder {
                    id: Uuid::new_v4(),
                    order_ref: "ORD-20260101-12345".to_string(),
                    total_amount,
                }))
            });

        let usecase = usecase(
            order_repo,
            cart_repo,
            product_repo,
            MockPaymentRepository::new(),
            None,
        );

        let created = usecase
            .create_order_from_cart(user_id, create_order_model(false))
            .await
            .unwrap();

        assert_eq!(created.order_ref, "ORD-20260101-12345");
        assert_eq!(created.total_amount, 590);
    }

    #[tokio::test]
    async fn rejects_an_order_over_an_empty_cart() {
        let user_id = Uuid::new_v4();

        let mut cart_repo = MockCartRepository::new();
        cart_repo
            .expect_find()
            .returning(|_, _| Ok(None));

        let usecase = usecase(
            MockOrderRepository::new(),
            cart_repo,
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .create_order_from_cart(user_id, create_order_model(false))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_an_incomplete_shipping_address_before_touching_the_cart() {
        let user_id = Uuid::new_v4();
        let mut model = create_order_model(false);
        model.shipping_address.pincode = String::new();

        // No expectations: any repository call would panic the test.
        let usecase = usecase(
            MockOrderRepository::new(),
            MockCartRepository::new(),
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .create_order_from_cart(user_id, model)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[tokio::test]
    async fn aborts_the_whole_order_when_validation_finds_a_shortage() {
        let user_id = Uuid::new_v4();
        let product_pk = Uuid::new_v4();

        let mut cart_repo = MockCartRepository::new();
        let cart = cart_with_line(user_id, product_pk, 3, 250);
        cart_repo.expect_find().returning(move |_, _| {
            let cart = cart.clone();
            Ok(Some(cart))
        });

        let mut product_repo = MockProductRepository::new();
        let product = flat_product(product_pk, 1, 250);
        product_repo
            .expect_find_many_with_variants()
            .returning(move |_| {
                let product = product.clone();
                Ok(vec![product])
            });

        // The order repository has no expectations: nothing may be persisted.
        let usecase = usecase(
            MockOrderRepository::new(),
            cart_repo,
            product_repo,
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .create_order_from_cart(user_id, create_order_model(false))
            .await
            .unwrap_err();

        match err {
            CheckoutError::OutOfStock { available, .. } => assert_eq!(available, 1),
            other => panic!("expected OutOfStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn surfaces_a_shortage_found_by_the_guarded_write() {
        let user_id = Uuid::new_v4();
        let product_pk = Uuid::new_v4();

        let mut cart_repo = MockCartRepository::new();
        let cart = cart_with_line(user_id, product_pk, 2, 250);
        cart_repo.expect_find().returning(move |_, _| {
            let cart = cart.clone();
            Ok(Some(cart))
        });

        let mut product_repo = MockProductRepository::new();
        let product = flat_product(product_pk, 5, 250);
        product_repo
            .expect_find_many_with_variants()
            .returning(move |_| {
                let product = product.clone();
                Ok(vec![product])
            });

        let mut order_repo = MockOrderRepository::new();
        order_repo.expect_create_order_guarded().returning(|_, _| {
            Ok(OrderCreationOutcome::InsufficientStock(StockShortage {
                product_name: "Tee".to_string(),
                size: None,
                color: None,
                available: 1,
            }))
        });

        let usecase = usecase(
            order_repo,
            cart_repo,
            product_repo,
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .create_order_from_cart(user_id, create_order_model(false))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::OutOfStock { .. }));
    }

    #[tokio::test]
    async fn refuses_an_intent_for_an_already_paid_order() {
        let user_id = Uuid::new_v4();
        let mut order = pending_order(user_id);
        order.payment_status = PaymentStatus::Completed.to_string();

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, Uuid::new_v4(), 2);
        order_repo.expect_find_by_order_ref().returning(move |_| {
            let order = order_with_items.clone();
            Ok(Some(order))
        });

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .create_payment_intent(
                user_id,
                CreatePaymentModel {
                    order_ref: "ORD-20260101-12345".to_string(),
                    mock_mode: false,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::AlreadyPaid));
    }

    #[tokio::test]
    async fn refuses_an_intent_for_someone_elses_order() {
        let user_id = Uuid::new_v4();
        let order = pending_order(Uuid::new_v4());

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, Uuid::new_v4(), 2);
        order_repo.expect_find_by_order_ref().returning(move |_| {
            let order = order_with_items.clone();
            Ok(Some(order))
        });

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .create_payment_intent(
                user_id,
                CreatePaymentModel {
                    order_ref: "ORD-20260101-12345".to_string(),
                    mock_mode: true,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::AccessDenied));
    }

    #[tokio::test]
    async fn mock_intent_fabricates_a_transaction_without_a_gateway() {
        let user_id = Uuid::new_v4();
        let order = pending_order(user_id);
        let order_pk = order.id;

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, Uuid::new_v4(), 2);
        order_repo.expect_find_by_order_ref().returning(move |_| {
            let order = order_with_items.clone();
            Ok(Some(order))
        });
        order_repo
            .expect_attach_payment_intent()
            .withf(move |id, gateway_order_id, method| {
                *id == order_pk
                    && gateway_order_id.starts_with("mock_order_")
                    && *method == PaymentMethod::Mock
            })
            .returning(|_, _, _| Ok(()));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_record_intent()
            .withf(move |payment| {
                payment.order_id == order_pk
                    && payment.gateway == PaymentMethod::Mock.to_string()
                    && payment.amount == 590
                    && payment.status == TransactionStatus::Created.to_string()
            })
            .returning(|_| Ok(Uuid::new_v4()));

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            MockProductRepository::new(),
            payment_repo,
            None,
        );

        let intent = usecase
            .create_payment_intent(
                user_id,
                CreatePaymentModel {
                    order_ref: "ORD-20260101-12345".to_string(),
                    mock_mode: true,
                },
            )
            .await
            .unwrap();

        assert!(intent.gateway_order_id.starts_with("mock_order_"));
        assert_eq!(intent.amount, 590);
        assert_eq!(intent.currency, DEFAULT_CURRENCY);
        assert!(intent.key_id.is_none());
        assert!(intent.mock_mode);
    }

    #[tokio::test]
    async fn real_intent_without_a_configured_gateway_is_unavailable() {
        let user_id = Uuid::new_v4();
        let order = pending_order(user_id);

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, Uuid::new_v4(), 2);
        order_repo.expect_find_by_order_ref().returning(move |_| {
            let order = order_with_items.clone();
            Ok(Some(order))
        });

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .create_payment_intent(
                user_id,
                CreatePaymentModel {
                    order_ref: "ORD-20260101-12345".to_string(),
                    mock_mode: false,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::GatewayUnavailable));
    }

    #[tokio::test]
    async fn real_intent_bills_the_gateway_in_minor_units() {
        let user_id = Uuid::new_v4();
        let order = pending_order(user_id);

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, Uuid::new_v4(), 2);
        order_repo.expect_find_by_order_ref().returning(move |_| {
            let order = order_with_items.clone();
            Ok(Some(order))
        });
        order_repo
            .expect_attach_payment_intent()
            .returning(|_, _, _| Ok(()));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_record_intent()
            .returning(|_| Ok(Uuid::new_v4()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_order()
            .withf(|amount_minor, currency, receipt| {
                *amount_minor == 59_000
                    && currency == DEFAULT_CURRENCY
                    && receipt == "ORD-20260101-12345"
            })
            .returning(|_, _, _| Ok("order_rzp_123".to_string()));
        gateway
            .expect_public_key_id()
            .returning(|| "rzp_test_key".to_string());

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            MockProductRepository::new(),
            payment_repo,
            Some(gateway),
        );

        let intent = usecase
            .create_payment_intent(
                user_id,
                CreatePaymentModel {
                    order_ref: "ORD-20260101-12345".to_string(),
                    mock_mode: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(intent.gateway_order_id, "order_rzp_123");
        assert_eq!(intent.key_id.as_deref(), Some("rzp_test_key"));
    }

    #[tokio::test]
    async fn tampered_signature_marks_the_payment_failed_and_touches_no_stock() {
        let user_id = Uuid::new_v4();
        let mut order = pending_order(user_id);
        order.payment_method = Some(PaymentMethod::Razorpay.to_string());
        order.gateway_order_id = Some("order_rzp_123".to_string());
        let order_pk = order.id;

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, Uuid::new_v4(), 2);
        order_repo
            .expect_find_by_gateway_order_id()
            .with(eq("order_rzp_123"))
            .returning(move |_| {
                let order = order_with_items.clone();
                Ok(Some(order))
            });
        order_repo
            .expect_finalize_payment_failure()
            .withf(move |id, gateway_order_id, reason| {
                *id == order_pk
                    && gateway_order_id == "order_rzp_123"
                    && reason.contains("signature")
            })
            .returning(|_, _, _| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_verify_payment_signature()
            .returning(|_, _, _| Ok(false));

        // Product repository stays expectation-free: stock must not move.
        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            Some(gateway),
        );

        let err = usecase
            .verify_payment(
                user_id,
                VerifyPaymentModel {
                    gateway_order_id: "order_rzp_123".to_string(),
                    gateway_payment_id: "pay_123".to_string(),
                    signature: Some("deadbeef".to_string()),
                    mock_mode: false,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::SignatureRejected));
    }

    #[tokio::test]
    async fn verified_payment_confirms_the_order_and_lowers_stock() {
        let user_id = Uuid::new_v4();
        let product_pk = Uuid::new_v4();
        let mut order = pending_order(user_id);
        order.payment_method = Some(PaymentMethod::Razorpay.to_string());
        order.gateway_order_id = Some("order_rzp_123".to_string());
        let order_pk = order.id;

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, product_pk, 2);
        order_repo
            .expect_find_by_gateway_order_id()
            .returning(move |_| {
                let order = order_with_items.clone();
                Ok(Some(order))
            });
        order_repo
            .expect_finalize_payment_success()
            .withf(move |id, owner, gateway_order_id, payment_id, _signature| {
                *id == order_pk
                    && *owner == user_id
                    && gateway_order_id == "order_rzp_123"
                    && payment_id == "pay_123"
            })
            .returning(|_, _, _, _, _| Ok(PaymentFinalization::Finalized));

        let mut product_repo = MockProductRepository::new();
        product_repo
            .expect_decrement_stock()
            .withf(move |pk, key, quantity| {
                *pk == product_pk && key.is_empty() && *quantity == 2
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_verify_payment_signature()
            .returning(|_, _, _| Ok(true));

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            product_repo,
            MockPaymentRepository::new(),
            Some(gateway),
        );

        let verified = usecase
            .verify_payment(
                user_id,
                VerifyPaymentModel {
                    gateway_order_id: "order_rzp_123".to_string(),
                    gateway_payment_id: "pay_123".to_string(),
                    signature: Some("cafebabe".to_string()),
                    mock_mode: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(verified.status, OrderStatus::Confirmed.to_string());
        assert_eq!(verified.order_ref, "ORD-20260101-12345");
    }

    #[tokio::test]
    async fn mock_verification_succeeds_without_any_signature() {
        let user_id = Uuid::new_v4();
        let product_pk = Uuid::new_v4();
        let mut order = pending_order(user_id);
        order.payment_method = Some(PaymentMethod::Mock.to_string());
        order.gateway_order_id = Some("mock_order_abc".to_string());

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, product_pk, 2);
        order_repo
            .expect_find_by_gateway_order_id()
            .returning(move |_| {
                let order = order_with_items.clone();
                Ok(Some(order))
            });
        order_repo
            .expect_finalize_payment_success()
            .withf(|_, _, _, _, signature| signature == MOCK_SIGNATURE)
            .returning(|_, _, _, _, _| Ok(PaymentFinalization::Finalized));

        let mut product_repo = MockProductRepository::new();
        product_repo
            .expect_decrement_stock()
            .returning(|_, _, _| Ok(true));

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            product_repo,
            MockPaymentRepository::new(),
            None,
        );

        let verified = usecase
            .verify_payment(
                user_id,
                VerifyPaymentModel {
                    gateway_order_id: "mock_order_abc".to_string(),
                    gateway_payment_id: "pay_mock".to_string(),
                    signature: None,
                    mock_mode: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(verified.status, OrderStatus::Confirmed.to_string());
    }

    #[tokio::test]
    async fn replayed_verification_does_not_decrement_stock_again() {
        let user_id = Uuid::new_v4();
        let product_pk = Uuid::new_v4();
        let mut order = pending_order(user_id);
        order.payment_method = Some(PaymentMethod::Mock.to_string());
        order.gateway_order_id = Some("mock_order_abc".to_string());

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, product_pk, 2);
        order_repo
            .expect_find_by_gateway_order_id()
            .returning(move |_| {
                let order = order_with_items.clone();
                Ok(Some(order))
            });
        order_repo
            .expect_finalize_payment_success()
            .returning(|_, _, _, _, _| {
                Ok(PaymentFinalization::AlreadyFinalized)
            });

        // No decrement expectation: a second decrement would panic the test.
        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            None,
        );

        let verified = usecase
            .verify_payment(
                user_id,
                VerifyPaymentModel {
                    gateway_order_id: "mock_order_abc".to_string(),
                    gateway_payment_id: "pay_mock".to_string(),
                    signature: None,
                    mock_mode: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(verified.status, OrderStatus::Confirmed.to_string());
    }

    #[tokio::test]
    async fn stock_decrement_failure_does_not_fail_the_verification() {
        let user_id = Uuid::new_v4();
        let product_pk = Uuid::new_v4();
        let mut order = pending_order(user_id);
        order.payment_method = Some(PaymentMethod::Mock.to_string());
        order.gateway_order_id = Some("mock_order_abc".to_string());

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, product_pk, 2);
        order_repo
            .expect_find_by_gateway_order_id()
            .returning(move |_| {
                let order = order_with_items.clone();
                Ok(Some(order))
            });
        order_repo
            .expect_finalize_payment_success()
            .returning(|_, _, _, _, _| Ok(PaymentFinalization::Finalized));

        let mut product_repo = MockProductRepository::new();
        product_repo
            .expect_decrement_stock()
            .returning(|_, _, _| Err(anyhow::anyhow!("connection reset")));

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            product_repo,
            MockPaymentRepository::new(),
            None,
        );

        let verified = usecase
            .verify_payment(
                user_id,
                VerifyPaymentModel {
                    gateway_order_id: "mock_order_abc".to_string(),
                    gateway_payment_id: "pay_mock".to_string(),
                    signature: None,
                    mock_mode: true,
                },
            )
            .await;

        assert!(verified.is_ok());
    }

    #[tokio::test]
    async fn verification_requires_both_gateway_identifiers() {
        let usecase = usecase(
            MockOrderRepository::new(),
            MockCartRepository::new(),
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .verify_payment(
                Uuid::new_v4(),
                VerifyPaymentModel {
                    gateway_order_id: "order_rzp_123".to_string(),
                    gateway_payment_id: "  ".to_string(),
                    signature: None,
                    mock_mode: false,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[tokio::test]
    async fn real_verification_without_a_signature_is_a_validation_error() {
        let user_id = Uuid::new_v4();
        let mut order = pending_order(user_id);
        order.payment_method = Some(PaymentMethod::Razorpay.to_string());
        order.gateway_order_id = Some("order_rzp_123".to_string());

        let mut order_repo = MockOrderRepository::new();
        let order_with_items = order_with_one_item(order, Uuid::new_v4(), 2);
        order_repo
            .expect_find_by_gateway_order_id()
            .returning(move |_| {
                let order = order_with_items.clone();
                Ok(Some(order))
            });

        let usecase = usecase(
            order_repo,
            MockCartRepository::new(),
            MockProductRepository::new(),
            MockPaymentRepository::new(),
            None,
        );

        let err = usecase
            .verify_payment(
                user_id,
                VerifyPaymentModel {
                    gateway_order_id: "order_rzp_123".to_string(),
                    gateway_payment_id: "pay_123".to_string(),
                    signature: None,
                    mock_mode: false,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
    }
}
