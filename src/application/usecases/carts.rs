use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::{carts::InsertCartItemEntity, products::ProductWithVariants},
    repositories::{carts::CartRepository, products::ProductRepository},
    value_objects::{
        carts::{
            AddCartItemModel, BuyNowModel, CartDto, CartItemDto, CartLine, RemoveCartItemModel,
            UpdateCartItemModel, buy_now_ttl, cart_totals, remove_line, set_line_quantity,
            upsert_line,
        },
        enums::cart_kinds::CartKind,
        products::VariantKey,
        stock::{StockError, check_availability},
    },
};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("{0}")]
    Validation(String),
    #[error("product not found")]
    ProductNotFound,
    #[error("cart not found")]
    CartNotFound,
    #[error("item not found in cart")]
    ItemNotFound,
    #[error("out of stock: only {available} left")]
    OutOfStock { available: i32 },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CartError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CartError::Validation(_) => StatusCode::BAD_REQUEST,
            CartError::ProductNotFound => StatusCode::NOT_FOUND,
            CartError::CartNotFound => StatusCode::NOT_FOUND,
            CartError::ItemNotFound => StatusCode::NOT_FOUND,
            CartError::OutOfStock { .. } => StatusCode::BAD_REQUEST,
            CartError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type CartResult<T> = std::result::Result<T, CartError>;

pub struct CartUseCase<C, P>
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    cart_repo: Arc<C>,
    product_repo: Arc<P>,
}

impl<C, P> CartUseCase<C, P>
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    pub fn new(cart_repo: Arc<C>, product_repo: Arc<P>) -> Self {
        Self {
            cart_repo,
            product_repo,
        }
    }

    pub async fn get_cart(&self, user_id: Uuid, kind: CartKind) -> CartResult<CartDto> {
        let cart = self.cart_repo.find(user_id, kind).await.map_err(|err| {
            error!(%user_id, cart_kind = %kind, db_error = ?err, "cart: failed to load cart");
            CartError::Internal(err)
        })?;

        match cart {
            Some(cart) => self.render(cart.lines()).await,
            None => Ok(CartDto::empty()),
        }
    }

    pub async fn add_item(&self, user_id: Uuid, model: AddCartItemModel) -> CartResult<CartDto> {
        if model.quantity < 1 {
            return Err(CartError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let product = self.resolve_product(&model.product_id).await?;
        // A product without variant selection ignores any discriminator the
        // client sent, so the line merges correctly on later adds.
        let key = Self::effective_key(
            &product,
            VariantKey::new(model.size.clone(), model.color.clone()),
        );

        let cart_id = self
            .cart_repo
            .ensure(user_id, CartKind::Standard, None)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "cart: failed to create cart");
                CartError::Internal(err)
            })?;

        let mut lines = self
            .cart_repo
            .find(user_id, CartKind::Standard)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "cart: failed to reload cart");
                CartError::Internal(err)
            })?
            .map(|cart| cart.lines())
            .unwrap_or_default();

        upsert_line(
            &mut lines,
            CartLine {
                product_id: product.product.id,
                size: key.size,
                color: key.color,
                quantity: model.quantity,
                price: product.product.price,
            },
        );

        info!(
            %user_id,
            product_id = %model.product_id,
            quantity = model.quantity,
            "cart: item added"
        );

        self.persist(user_id, cart_id, lines).await
    }

    pub async fn set_quantity(
        &self,
        user_id: Uuid,
        model: UpdateCartItemModel,
    ) -> CartResult<CartDto> {
        let cart = self
            .cart_repo
            .find(user_id, CartKind::Standard)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "cart: failed to load cart");
                CartError::Internal(err)
            })?
            .ok_or(CartError::CartNotFound)?;

        let cart_id = cart.cart.id;
        let mut lines = cart.lines();

        // Match against the cart's own lines instead of resolving the
        // product again; a line must stay editable even if its product has
        // been deleted from the catalog since.
        let Some((product_pk, key)) = self
            .locate_line(&lines, &model.product_id, model.size.clone(), model.color.clone())
            .await?
        else {
            warn!(
                %user_id,
                product_id = %model.product_id,
                "cart: quantity update for a line that is not in the cart"
            );
            return Err(CartError::ItemNotFound);
        };

        if model.quantity < 1 {
            // Quantities below one behave exactly like a removal.
            remove_line(&mut lines, product_pk, &key);
        } else if !set_line_quantity(&mut lines, product_pk, &key, model.quantity) {
            return Err(CartError::ItemNotFound);
        }

        self.persist(user_id, cart_id, lines).await
    }

    pub async fn remove_item(
        &self,
        user_id: Uuid,
        model: RemoveCartItemModel,
    ) -> CartResult<CartDto> {
        let cart = self
            .cart_repo
            .find(user_id, CartKind::Standard)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "cart: failed to load cart");
                CartError::Internal(err)
            })?
            .ok_or(CartError::CartNotFound)?;

        let cart_id = cart.cart.id;
        let mut lines = cart.lines();

        // Removing a line that is not there is a no-op success.
        if let Some((product_pk, key)) = self
            .locate_line(&lines, &model.product_id, model.size, model.color)
            .await?
        {
            remove_line(&mut lines, product_pk, &key);
        }

        self.persist(user_id, cart_id, lines).await
    }

    /// "Buy now": replaces the user's buy-now cart with this single line and
    /// a fresh expiry, after an advisory stock check so the user learns
    /// about a shortage before the checkout page.
    pub async fn buy_now(&self, user_id: Uuid, model: BuyNowModel) -> CartResult<CartDto> {
        if model.quantity < 1 {
            return Err(CartError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let product = self.resolve_product(&model.product_id).await?;
        let requested = VariantKey::new(model.size.clone(), model.color.clone());

        let check = check_availability(&product, &requested, model.quantity).map_err(
            |StockError::VariantRequired| {
                CartError::Validation(format!(
                    "variant selection is required for {}",
                    product.product.name
                ))
            },
        )?;
        if !check.sufficient {
            warn!(
                %user_id,
                product_id = %model.product_id,
                requested = model.quantity,
                available = check.available,
                "cart: buy-now rejected for insufficient stock"
            );
            return Err(CartError::OutOfStock {
                available: check.available,
            });
        }

        let key = Self::effective_key(&product, requested);
        let expires_at = Utc::now() + buy_now_ttl();
        let cart_id = self
            .cart_repo
            .ensure(user_id, CartKind::BuyNow, Some(expires_at))
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "cart: failed to create buy-now cart");
                CartError::Internal(err)
            })?;

        let lines = vec![CartLine {
            product_id: product.product.id,
            size: key.size,
            color: key.color,
            quantity: model.quantity,
            price: product.product.price,
        }];

        info!(
            %user_id,
            product_id = %model.product_id,
            quantity = model.quantity,
            "cart: buy-now cart initialized"
        );

        self.persist(user_id, cart_id, lines).await
    }

    /// Finds the cart line the client is talking about: the line whose
    /// product carries the given external id and whose variant matches.
    /// Returns the product key pair, or None when no such line exists.
    async fn locate_line(
        &self,
        lines: &[CartLine],
        product_id: &str,
        size: Option<String>,
        color: Option<String>,
    ) -> CartResult<Option<(Uuid, VariantKey)>> {
        let mut product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let products = self
            .product_repo
            .find_many_with_variants(product_ids)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "cart: failed to load products for lookup");
                CartError::Internal(err)
            })?;

        let Some(product) = products
            .iter()
            .find(|product| product.product.product_id == product_id)
        else {
            return Ok(None);
        };

        let key = Self::effective_key(product, VariantKey::new(size, color));
        let found = lines
            .iter()
            .any(|line| line.product_id == product.product.id && line.variant_key() == key);

        Ok(found.then(|| (product.product.id, key)))
    }

    async fn resolve_product(&self, product_id: &str) -> CartResult<ProductWithVariants> {
        self.product_repo
            .find_by_product_id(product_id)
            .await
            .map_err(|err| {
                error!(product_id, db_error = ?err, "cart: failed to load product");
                CartError::Internal(err)
            })?
            .ok_or(CartError::ProductNotFound)
    }

    fn effective_key(product: &ProductWithVariants, requested: VariantKey) -> VariantKey {
        if product.product.has_variants {
            requested
        } else {
            VariantKey::default()
        }
    }

    async fn persist(
        &self,
        user_id: Uuid,
        cart_id: Uuid,
        lines: Vec<CartLine>,
    ) -> CartResult<CartDto> {
        let (total_quantity, total_price) = cart_totals(&lines);

        let items = lines
            .iter()
            .map(|line| InsertCartItemEntity {
                cart_id,
                product_id: line.product_id,
                size: line.size.clone(),
                color: line.color.clone(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();

        self.cart_repo
            .replace_items(cart_id, items, total_quantity, total_price)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "cart: failed to save cart");
                CartError::Internal(err)
            })?;

        self.render(lines).await
    }

    async fn render(&self, lines: Vec<CartLine>) -> CartResult<CartDto> {
        let mut product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let products = self
            .product_repo
            .find_many_with_variants(product_ids)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "cart: failed to load products for rendering");
                CartError::Internal(err)
            })?;
        let products: HashMap<Uuid, _> = products
            .into_iter()
            .map(|product| (product.product.id, product))
            .collect();

        let (total_quantity, total_price) = cart_totals(&lines);
        let items = lines
            .into_iter()
            .map(|line| {
                let product = products.get(&line.product_id);
                CartItemDto {
                    product_id: product.map(|p| p.product.product_id.clone()),
                    product_name: product.map(|p| p.product.name.clone()),
                    size: line.size,
                    color: line.color,
                    quantity: line.quantity,
                    price: line.price,
                    line_total: i64::from(line.quantity) * line.price,
                }
            })
            .collect();

        Ok(CartDto {
            items,
            total_quantity,
            total_price,
        })
    }
}
