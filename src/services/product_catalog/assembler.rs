//! Mapping between the product wire format and the product aggregate
//! (the product row plus its category links, images and options).

use rust_decimal::Decimal;
use sea_orm::Set;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::entities::{product, product_category, product_image, product_option};
use crate::errors::ServiceError;

/// Separator used to store an option's values in a single text column.
/// A value that itself contains it comes back split in several values.
pub const OPTION_VALUE_DELIMITER: &str = ",";

pub fn join_option_values(values: &[String]) -> String {
    values.join(OPTION_VALUE_DELIMITER)
}

/// Inverse of [`join_option_values`]; an empty column means no values.
pub fn split_option_values(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored
        .split(OPTION_VALUE_DELIMITER)
        .map(str::to_string)
        .collect()
}

/// Lowercases `name` and collapses every run of non-alphanumerics into a
/// single `-`, without leading or trailing dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageInput {
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OptionInput {
    pub title: String,
    pub shape: Option<String>,
    pub radius: Option<i32>,
    #[serde(rename = "type")]
    pub option_type: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Body of `POST /createProduto` and `PUT /updateProduto/:id`.
///
/// Every field is optional so the same shape serves partial updates; the
/// nullable columns use a double `Option` so that `null` clears them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductPayload {
    pub enabled: Option<bool>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub price_with_discount: Option<Option<Decimal>>,
    pub category_ids: Option<Vec<i32>>,
    pub images: Option<Vec<ImageInput>>,
    pub options: Option<Vec<OptionInput>>,
}

fn ensure_non_negative(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "{field} must not be negative"
        )));
    }
    Ok(())
}

impl ProductPayload {
    pub fn validate_for_create(&self) -> Result<(), ServiceError> {
        let has_name = self.name.as_deref().is_some_and(|n| !n.trim().is_empty());
        if !has_name || self.price.is_none() {
            return Err(ServiceError::ValidationError(
                "name and price are required".to_string(),
            ));
        }
        self.validate_fields()
    }

    pub fn validate_for_update(&self) -> Result<(), ServiceError> {
        self.validate_fields()
    }

    fn validate_fields(&self) -> Result<(), ServiceError> {
        if matches!(self.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "name must not be blank".to_string(),
            ));
        }
        if let Some(price) = self.price {
            ensure_non_negative("price", price)?;
        }
        if let Some(Some(price)) = self.price_with_discount {
            ensure_non_negative("price_with_discount", price)?;
        }
        if let Some(options) = &self.options {
            if options.iter().any(|o| o.title.trim().is_empty()) {
                return Err(ServiceError::ValidationError(
                    "option title must not be blank".to_string(),
                ));
            }
            // an empty value would be stored as an empty column and read back as no values
            if options.iter().any(|o| o.values.iter().any(String::is_empty)) {
                return Err(ServiceError::ValidationError(
                    "option values must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Slug to store on create: the given one, or one derived from the name.
    pub fn slug_or_derived(&self) -> String {
        match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => slugify(self.name.as_deref().unwrap_or_default()),
        }
    }

    /// Nested collections carried by the body. A missing collection is an
    /// empty one, since the stored sets are always replaced wholesale.
    pub fn children(&self) -> ProductChildren {
        ProductChildren {
            category_ids: self
                .category_ids
                .as_deref()
                .map(dedup_preserving_order)
                .unwrap_or_default(),
            image_paths: self
                .images
                .iter()
                .flatten()
                .map(|image| image.content.clone())
                .collect(),
            options: self
                .options
                .iter()
                .flatten()
                .map(|option| OptionRow {
                    title: option.title.clone(),
                    shape: option.shape.clone(),
                    radius: option.radius,
                    option_type: option.option_type.clone(),
                    values: join_option_values(&option.values),
                })
                .collect(),
        }
    }

    /// Copies the present scalar fields onto `model`.
    pub fn apply_to(&self, model: &mut product::ActiveModel) {
        if let Some(enabled) = self.enabled {
            model.enabled = Set(enabled);
        }
        if let Some(name) = &self.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(slug) = &self.slug {
            model.slug = Set(slug.trim().to_string());
        }
        if let Some(stock) = self.stock {
            model.stock = Set(stock);
        }
        if let Some(description) = &self.description {
            model.description = Set(description.clone());
        }
        if let Some(price) = self.price {
            model.price = Set(price);
        }
        if let Some(price_with_discount) = self.price_with_discount {
            model.price_with_discount = Set(price_with_discount);
        }
    }
}

fn dedup_preserving_order(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Option row before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    pub title: String,
    pub shape: Option<String>,
    pub radius: Option<i32>,
    pub option_type: Option<String>,
    pub values: String,
}

/// The owned collections of one product, ready to be inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChildren {
    pub category_ids: Vec<i32>,
    pub image_paths: Vec<String>,
    pub options: Vec<OptionRow>,
}

impl ProductChildren {
    pub fn category_links(&self, product_id: i32) -> Vec<product_category::ActiveModel> {
        self.category_ids
            .iter()
            .map(|&category_id| product_category::ActiveModel {
                product_id: Set(product_id),
                category_id: Set(category_id),
            })
            .collect()
    }

    pub fn image_rows(&self, product_id: i32) -> Vec<product_image::ActiveModel> {
        self.image_paths
            .iter()
            .map(|path| product_image::ActiveModel {
                product_id: Set(product_id),
                user_id: Set(None),
                path: Set(path.clone()),
                enabled: Set(true),
                ..Default::default()
            })
            .collect()
    }

    pub fn option_rows(&self, product_id: i32) -> Vec<product_option::ActiveModel> {
        self.options
            .iter()
            .map(|option| product_option::ActiveModel {
                product_id: Set(product_id),
                title: Set(option.title.clone()),
                shape: Set(option.shape.clone()),
                radius: Set(option.radius),
                option_type: Set(option.option_type.clone()),
                values: Set(option.values.clone()),
                ..Default::default()
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    pub id: i32,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: i32,
    pub title: String,
    pub shape: Option<String>,
    pub radius: Option<i32>,
    #[serde(rename = "type")]
    pub option_type: Option<String>,
    pub values: Vec<String>,
}

impl From<product_option::Model> for OptionView {
    fn from(option: product_option::Model) -> Self {
        Self {
            values: split_option_values(&option.values),
            id: option.id,
            title: option.title,
            shape: option.shape,
            radius: option.radius,
            option_type: option.option_type,
        }
    }
}

/// A product as returned to clients. Prices serialize as JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    pub id: i32,
    pub enabled: bool,
    pub name: String,
    pub slug: String,
    pub stock: i32,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price_with_discount: Option<Decimal>,
    pub category_ids: Vec<i32>,
    pub images: Vec<ImageView>,
    pub options: Vec<OptionView>,
}

impl ProductView {
    /// Flattens a product and its loaded relations. Disabled images are dropped.
    pub fn assemble(
        product: product::Model,
        links: Vec<product_category::Model>,
        images: Vec<product_image::Model>,
        options: Vec<product_option::Model>,
    ) -> Self {
        Self {
            id: product.id,
            enabled: product.enabled,
            name: product.name,
            slug: product.slug,
            stock: product.stock,
            description: product.description,
            price: product.price,
            price_with_discount: product.price_with_discount,
            category_ids: links.into_iter().map(|link| link.category_id).collect(),
            images: images
                .into_iter()
                .filter(|image| image.enabled)
                .map(|image| ImageView {
                    id: image.id,
                    content: image.path,
                })
                .collect(),
            options: options.into_iter().map(OptionView::from).collect(),
        }
    }
}
