use metrics::counter;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::entities::category;
use crate::errors::ServiceError;
use crate::queries::listing::{ListPlan, Projection};

/// Body of the category create and update routes. On update only the
/// present fields change.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct CategoryPayload {
    #[validate(length(max = 255, message = "name must be at most 255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "slug must be at most 255 characters"))]
    pub slug: Option<String>,
    pub use_in_menu: Option<bool>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A page of projected categories plus the unpaged total.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPage {
    pub records: Vec<Value>,
    pub total: u64,
}

fn category_not_found() -> ServiceError {
    ServiceError::NotFound("Category not found".to_string())
}

fn project(model: category::Model, projection: &Projection) -> Result<Value, ServiceError> {
    serde_json::to_value(model)
        .map(|record| projection.apply(record, &[]))
        .map_err(|e| ServiceError::InternalError(e.to_string()))
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self, plan: &ListPlan) -> Result<CategoryPage, ServiceError> {
        let db = &*self.db;
        let total = category::Entity::find().count(db).await?;

        let mut query = category::Entity::find().order_by_asc(category::Column::Id);
        if let Some(take) = plan.pagination.take {
            query = query.limit(take);
        }
        if let Some(skip) = plan.pagination.skip() {
            query = query.offset(skip);
        }

        let records = query
            .all(db)
            .await?
            .into_iter()
            .map(|model| project(model, &plan.projection))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CategoryPage { records, total })
    }

    #[instrument(skip(self))]
    pub async fn get_category(&self, id: i32, projection: &Projection) -> Result<Value, ServiceError> {
        let model = category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(category_not_found)?;
        project(model, projection)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        payload: CategoryPayload,
    ) -> Result<category::Model, ServiceError> {
        payload.validate()?;
        let (name, slug) = match (
            non_blank(payload.name.as_deref()),
            non_blank(payload.slug.as_deref()),
        ) {
            (Some(name), Some(slug)) => (name.to_string(), slug.to_string()),
            _ => {
                return Err(ServiceError::ValidationError(
                    "name and slug are required".to_string(),
                ))
            }
        };

        let model = category::ActiveModel {
            name: Set(name),
            slug: Set(slug),
            use_in_menu: Set(payload.use_in_menu.unwrap_or(false)),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        counter!("storefront.categories.created", 1);
        info!(category_id = model.id, "Created category");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: i32,
        payload: CategoryPayload,
    ) -> Result<category::Model, ServiceError> {
        payload.validate()?;

        let existing = category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(category_not_found)?;

        let mut model = existing.clone().into_active_model();
        // blank name or slug leaves the stored value as is
        if let Some(name) = non_blank(payload.name.as_deref()) {
            model.name = Set(name.to_string());
        }
        if let Some(slug) = non_blank(payload.slug.as_deref()) {
            model.slug = Set(slug.to_string());
        }
        if let Some(use_in_menu) = payload.use_in_menu {
            model.use_in_menu = Set(use_in_menu);
        }

        if !model.is_changed() {
            return Ok(existing);
        }
        let updated = model.update(&*self.db).await?;
        info!(category_id = id, "Updated category");
        Ok(updated)
    }

    /// Deletes a category; its product links go with it.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: i32) -> Result<(), ServiceError> {
        if category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(category_not_found());
        }

        category::Entity::delete_by_id(id).exec(&*self.db).await?;
        counter!("storefront.categories.deleted", 1);
        info!(category_id = id, "Deleted category");
        Ok(())
    }
}
