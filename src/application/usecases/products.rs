use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{
    entities::products::{InsertProductEntity, UpdateProductEntity},
    repositories::products::ProductRepository,
    value_objects::products::{
        DEFAULT_PRODUCT_IMAGE, InsertProductModel, ProductCreation, ProductDto,
        UpdateProductModel, normalize_stock,
    },
};

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("{0}")]
    Validation(String),
    #[error("product not found")]
    NotFound,
    #[error("a product with this product_id already exists")]
    Duplicate,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ProductError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ProductError::Validation(_) => StatusCode::BAD_REQUEST,
            ProductError::NotFound => StatusCode::NOT_FOUND,
            ProductError::Duplicate => StatusCode::CONFLICT,
            ProductError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ProductResult<T> = std::result::Result<T, ProductError>;

pub struct ProductUseCase<P>
where
    P: ProductRepository + Send + Sync + 'static,
{
    product_repo: Arc<P>,
}

impl<P> ProductUseCase<P>
where
    P: ProductRepository + Send + Sync + 'static,
{
    pub fn new(product_repo: Arc<P>) -> Self {
        Self { product_repo }
    }

    pub async fn list_catalog(&self) -> ProductResult<Vec<ProductDto>> {
        let products = self.product_repo.list().await.map_err(|err| {
            error!(db_error = ?err, "products: failed to list catalog");
            ProductError::Internal(err)
        })?;

        Ok(products.into_iter().map(ProductDto::from).collect())
    }

    pub async fn get(&self, product_id: &str) -> ProductResult<ProductDto> {
        let product = self
            .product_repo
            .find_by_product_id(product_id)
            .await
            .map_err(|err| {
                error!(product_id, db_error = ?err, "products: failed to load product");
                ProductError::Internal(err)
            })?
            .ok_or(ProductError::NotFound)?;

        Ok(ProductDto::from(product))
    }

    pub async fn create(&self, model: InsertProductModel) -> ProductResult<ProductDto> {
        if model.product_id.trim().is_empty() {
            return Err(ProductError::Validation("product_id is required".to_string()));
        }
        if model.name.trim().is_empty() {
            return Err(ProductError::Validation("name is required".to_string()));
        }
        if model.price < 0 {
            return Err(ProductError::Validation(
                "price cannot be negative".to_string(),
            ));
        }

        let (has_variants, variants) = normalize_stock(model.variants, model.stock_quantity)
            .map_err(|reason| ProductError::Validation(reason.to_string()))?;

        let image_url = match model.image_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => DEFAULT_PRODUCT_IMAGE.to_string(),
        };

        let product_id = model.product_id.clone();
        let entity = InsertProductEntity {
            product_id: model.product_id,
            name: model.name,
            description: model.description.unwrap_or_default(),
            price: model.price,
            image_url,
            has_variants,
        };

        let creation = self
            .product_repo
            .create(entity, variants)
            .await
            .map_err(|err| {
                error!(%product_id, db_error = ?err, "products: failed to create product");
                ProductError::Internal(err)
            })?;

        match creation {
            ProductCreation::Created(_) => {
                info!(%product_id, "products: product created");
                self.get(&product_id).await
            }
            ProductCreation::DuplicateProductId => {
                let err = ProductError::Duplicate;
                warn!(
                    %product_id,
                    status = err.status_code().as_u16(),
                    "products: duplicate product_id on create"
                );
                Err(err)
            }
        }
    }

    pub async fn update(
        &self,
        product_id: &str,
        model: UpdateProductModel,
    ) -> ProductResult<ProductDto> {
        if let Some(price) = model.price {
            if price < 0 {
                return Err(ProductError::Validation(
                    "price cannot be negative".to_string(),
                ));
            }
        }

        // A replacement variant list goes through the same normalization as
        // create, so the stored shape stays uniform.
        let (variants, has_variants) = match model.variants {
            Some(variants) => {
                let (has_variants, variants) = normalize_stock(Some(variants), None)
                    .map_err(|reason| ProductError::Validation(reason.to_string()))?;
                (Some(variants), Some(has_variants))
            }
            None => (None, None),
        };

        let changes = UpdateProductEntity {
            name: model.name,
            description: model.description,
            price: model.price,
            image_url: model.image_url,
            has_variants,
            updated_at: Some(Utc::now()),
        };

        let updated = self
            .product_repo
            .update(product_id, changes, variants)
            .await
            .map_err(|err| {
                error!(product_id, db_error = ?err, "products: failed to update product");
                ProductError::Internal(err)
            })?;

        if !updated {
            return Err(ProductError::NotFound);
        }

        info!(product_id, "products: product updated");
        self.get(product_id).await
    }

    pub async fn delete(&self, product_id: &str) -> ProductResult<()> {
        let deleted = self.product_repo.delete(product_id).await.map_err(|err| {
            error!(product_id, db_error = ?err, "products: failed to delete product");
            ProductError::Internal(err)
        })?;

        if !deleted {
            return Err(ProductError::NotFound);
        }

        info!(product_id, "products: product deleted");
        Ok(())
    }
}
