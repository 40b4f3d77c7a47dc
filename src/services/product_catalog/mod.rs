//! Product persistence: listing with filters, single reads and the
//! transactional create/update that replace a product's owned collections.

pub mod assembler;

pub use assembler::{
    join_option_values, slugify, split_option_values, ImageInput, ImageView, OptionInput,
    OptionView, ProductChildren, ProductPayload, ProductView,
};

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, LoaderTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::entities::{category, product, product_category, product_image, product_option};
use crate::errors::ServiceError;
use crate::queries::listing::{ProductListPlan, PRODUCT_RELATION_FIELDS};

/// One page of projected product records.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub records: Vec<Value>,
    pub total: u64,
}

fn product_not_found() -> ServiceError {
    ServiceError::NotFound("Product not found".to_string())
}

/// Product catalog service backing the `/produtos` routes
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Filtered, paginated listing. `total` counts every match, not just the page.
    #[instrument(skip(self))]
    pub async fn list_products(&self, plan: &ProductListPlan) -> Result<ProductPage, ServiceError> {
        let db = &*self.db;

        let mut query = product::Entity::find();
        if let Some(condition) = plan.filter.condition() {
            query = query.filter(condition);
        }

        let total = query.clone().count(db).await?;

        let pagination = plan.list.pagination;
        let mut query = query.order_by_asc(product::Column::Id);
        if let Some(take) = pagination.take {
            query = query.limit(take);
        }
        if let Some(skip) = pagination.skip() {
            query = query.offset(skip);
        }

        let products = query.all(db).await?;
        let records = load_views(db, products)
            .await?
            .into_iter()
            .map(|view| {
                serde_json::to_value(view)
                    .map(|record| plan.list.projection.apply(record, &PRODUCT_RELATION_FIELDS))
                    .map_err(|e| ServiceError::InternalError(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProductPage { records, total })
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i32) -> Result<ProductView, ServiceError> {
        load_view(&*self.db, id).await
    }

    pub async fn product_exists(&self, id: i32) -> Result<bool, ServiceError> {
        let found = product::Entity::find_by_id(id)
            .count(&*self.db)
            .await?;
        Ok(found > 0)
    }

    /// Inserts the product and its collections in one transaction.
    #[instrument(skip(self, payload), fields(name = ?payload.name))]
    pub async fn create_product(&self, payload: ProductPayload) -> Result<ProductView, ServiceError> {
        payload.validate_for_create()?;

        let now = Utc::now();
        let children = payload.children();
        let product = product::ActiveModel {
            enabled: Set(payload.enabled.unwrap_or(false)),
            name: Set(payload.name.as_deref().unwrap_or_default().trim().to_string()),
            slug: Set(payload.slug_or_derived()),
            stock: Set(payload.stock.unwrap_or(0)),
            description: Set(payload.description.clone().flatten()),
            price: Set(payload.price.unwrap_or_default()),
            price_with_discount: Set(payload.price_with_discount.flatten()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let txn = self.db.begin().await?;
        let product = product.insert(&txn).await?;
        insert_children(&txn, product.id, &children).await?;
        let view = load_view(&txn, product.id).await?;
        txn.commit().await?;

        counter!("storefront.products.created", 1);
        info!(product_id = view.id, "Created product");
        Ok(view)
    }

    /// Patches the present scalar fields and replaces every owned collection
    /// with the incoming one, all in one transaction.
    #[instrument(skip(self, payload))]
    pub async fn update_product(
        &self,
        id: i32,
        payload: ProductPayload,
    ) -> Result<ProductView, ServiceError> {
        payload.validate_for_update()?;

        let txn = self.db.begin().await?;
        let existing = product::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(product_not_found)?;

        let mut model = existing.into_active_model();
        payload.apply_to(&mut model);
        model.updated_at = Set(Utc::now());
        model.update(&txn).await?;

        delete_children(&txn, id).await?;
        insert_children(&txn, id, &payload.children()).await?;
        let view = load_view(&txn, id).await?;
        txn.commit().await?;

        counter!("storefront.products.updated", 1);
        info!(product_id = id, "Updated product");
        Ok(view)
    }

    /// Removes the product and everything it owns. Missing ids are a 404
    /// and issue no delete.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        if product::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(product_not_found());
        }

        delete_children(&txn, id).await?;
        product::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        counter!("storefront.products.deleted", 1);
        info!(product_id = id, "Deleted product");
        Ok(())
    }

    /// Attaches an uploaded file to a product.
    pub async fn add_image(
        &self,
        product_id: i32,
        user_id: Option<i32>,
        path: String,
    ) -> Result<product_image::Model, ServiceError> {
        let image = product_image::ActiveModel {
            product_id: Set(product_id),
            user_id: Set(user_id),
            path: Set(path),
            enabled: Set(true),
            ..Default::default()
        };
        Ok(image.insert(&*self.db).await?)
    }
}

async fn load_view<C: ConnectionTrait>(conn: &C, id: i32) -> Result<ProductView, ServiceError> {
    let product = product::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(product_not_found)?;
    load_views(conn, vec![product])
        .await?
        .pop()
        .ok_or_else(product_not_found)
}

/// Loads the three relations for a batch of products with one query each.
async fn load_views<C: ConnectionTrait>(
    conn: &C,
    products: Vec<product::Model>,
) -> Result<Vec<ProductView>, ServiceError> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let links = products
        .load_many(
            product_category::Entity::find().order_by_asc(product_category::Column::CategoryId),
            conn,
        )
        .await?;
    let images = products
        .load_many(
            product_image::Entity::find().order_by_asc(product_image::Column::Id),
            conn,
        )
        .await?;
    let options = products
        .load_many(
            product_option::Entity::find().order_by_asc(product_option::Column::Id),
            conn,
        )
        .await?;

    Ok(products
        .into_iter()
        .zip(links)
        .zip(images)
        .zip(options)
        .map(|(((product, links), images), options)| {
            ProductView::assemble(product, links, images, options)
        })
        .collect())
}

async fn delete_children<C: ConnectionTrait>(conn: &C, product_id: i32) -> Result<(), ServiceError> {
    product_category::Entity::delete_many()
        .filter(product_category::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;
    product_image::Entity::delete_many()
        .filter(product_image::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;
    product_option::Entity::delete_many()
        .filter(product_option::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn insert_children<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    children: &ProductChildren,
) -> Result<(), ServiceError> {
    ensure_categories_exist(conn, &children.category_ids).await?;

    let links = children.category_links(product_id);
    if !links.is_empty() {
        product_category::Entity::insert_many(links)
            .exec_without_returning(conn)
            .await?;
    }
    let images = children.image_rows(product_id);
    if !images.is_empty() {
        product_image::Entity::insert_many(images)
            .exec_without_returning(conn)
            .await?;
    }
    let options = children.option_rows(product_id);
    if !options.is_empty() {
        product_option::Entity::insert_many(options)
            .exec_without_returning(conn)
            .await?;
    }
    Ok(())
}

async fn ensure_categories_exist<C: ConnectionTrait>(
    conn: &C,
    category_ids: &[i32],
) -> Result<(), ServiceError> {
    if category_ids.is_empty() {
        return Ok(());
    }

    let found: HashSet<i32> = category::Entity::find()
        .filter(category::Column::Id.is_in(category_ids.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let missing: Vec<String> = category_ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(|id| id.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Unknown category ids: {}",
            missing.join(",")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::listing::{ProductListQuery, ProductListPlan};
    use assert_matches::assert_matches;
    use sea_orm::{ConnectOptions, Database};
    use serde_json::json;

    async fn setup() -> (ProductCatalogService, Arc<DatabaseConnection>) {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Arc::new(Database::connect(options).await.unwrap());
        crate::db::run_migrations(&db).await.unwrap();
        (ProductCatalogService::new(db.clone()), db)
    }

    async fn seed_category(db: &DatabaseConnection, name: &str) -> i32 {
        category::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slugify(name)),
            use_in_menu: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    fn payload(value: Value) -> ProductPayload {
        serde_json::from_value(value).unwrap()
    }

    fn plan(query: Value) -> ProductListPlan {
        let query: ProductListQuery = serde_json::from_value(query).unwrap();
        ProductListPlan::from_query(&query).unwrap()
    }

    #[tokio::test]
    async fn create_persists_nested_collections() {
        let (service, db) = setup().await;
        let shoes = seed_category(&db, "Shoes").await;

        let view = service
            .create_product(payload(json!({
                "name": "Runner",
                "price": 12.5,
                "category_ids": [shoes],
                "images": [{"content": "uploads/runner.png"}],
                "options": [{"title": "Size", "values": ["40", "41"]}]
            })))
            .await
            .unwrap();

        assert_eq!(view.slug, "runner");
        assert!(!view.enabled);
        assert_eq!(view.category_ids, vec![shoes]);
        assert_eq!(view.images.len(), 1);
        assert_eq!(view.options[0].values, vec!["40", "41"]);

        let fetched = service.get_product(view.id).await.unwrap();
        assert_eq!(fetched, view);
    }

    #[tokio::test]
    async fn create_without_price_writes_nothing() {
        let (service, db) = setup().await;
        let result = service.create_product(payload(json!({"name": "Runner"}))).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
        assert_eq!(product::Entity::find().count(&*db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_category_rolls_back_the_product() {
        let (service, db) = setup().await;
        let result = service
            .create_product(payload(json!({"name": "Runner", "price": 12.5, "category_ids": [99]})))
            .await;
        assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("99"));
        assert_eq!(product::Entity::find().count(&*db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_replaces_collections_and_keeps_absent_fields() {
        let (service, db) = setup().await;
        let a = seed_category(&db, "A").await;
        let b = seed_category(&db, "B").await;

        let created = service
            .create_product(payload(json!({
                "name": "Runner",
                "description": "light",
                "price": 12.5,
                "category_ids": [a],
                "images": [{"content": "uploads/one.png"}, {"content": "uploads/two.png"}],
                "options": [{"title": "Size", "values": ["40"]}]
            })))
            .await
            .unwrap();

        let updated = service
            .update_product(
                created.id,
                payload(json!({"stock": 4, "category_ids": [b], "images": [{"content": "uploads/three.png"}]})),
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Runner");
        assert_eq!(updated.description.as_deref(), Some("light"));
        assert_eq!(updated.stock, 4);
        assert_eq!(updated.category_ids, vec![b]);
        assert_eq!(updated.images.len(), 1);
        assert_eq!(updated.images[0].content, "uploads/three.png");
        assert!(updated.options.is_empty());
        assert_eq!(product_image::Entity::find().count(&*db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_product_are_not_found() {
        let (service, _db) = setup().await;
        assert_matches!(
            service.update_product(42, ProductPayload::default()).await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(service.delete_product(42).await, Err(ServiceError::NotFound(_)));
        assert_matches!(service.get_product(42).await, Err(ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_owned_rows() {
        let (service, db) = setup().await;
        let created = service
            .create_product(payload(json!({
                "name": "Runner",
                "price": 12.5,
                "options": [{"title": "Size", "values": ["40"]}]
            })))
            .await
            .unwrap();

        service.delete_product(created.id).await.unwrap();
        assert_eq!(product::Entity::find().count(&*db).await.unwrap(), 0);
        assert_eq!(product_option::Entity::find().count(&*db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_pages_and_projects() {
        let (service, _db) = setup().await;
        for (name, price) in [("Alpha", 5.5), ("Beta", 15.5), ("Gamma", 25.5)] {
            service
                .create_product(payload(json!({"name": name, "price": price})))
                .await
                .unwrap();
        }

        let page = service
            .list_products(&plan(json!({"limit": "2", "page": "2"})))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0]["name"], "Gamma");

        let page = service
            .list_products(&plan(json!({"fields": "name", "price_range": "10-20"})))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        let record = page.records[0].as_object().unwrap();
        let mut keys: Vec<_> = record.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["category_ids", "images", "name", "options"]);
    }
}
