//! Query planning for the list endpoints.
//!
//! Raw query-string values are turned into a [`ListPlan`] (pagination and
//! field projection) and, for products, a [`ProductFilter`]: a list of
//! optional predicate fragments folded together with AND. Malformed numeric
//! parameters are rejected here with a validation error instead of reaching
//! the database.

use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, Query},
    ColumnTrait, Condition,
};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

use crate::entities::{product, product_category};
use crate::errors::ServiceError;

pub const DEFAULT_LIMIT: u64 = 12;
pub const DEFAULT_PAGE: u64 = 1;
/// `limit` value that disables paging.
pub const UNLIMITED: i64 = -1;

/// Fields returned for each product when the caller does not ask for any.
pub const PRODUCT_DEFAULT_FIELDS: [&str; 8] = [
    "id",
    "enabled",
    "name",
    "slug",
    "stock",
    "description",
    "price",
    "price_with_discount",
];

/// Relation keys attached to every product record regardless of `fields`.
pub const PRODUCT_RELATION_FIELDS: [&str; 3] = ["category_ids", "images", "options"];

/// Query string of `GET /categoria`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub fields: Option<String>,
}

/// Query string of `GET /produtos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub fields: Option<String>,
    #[serde(rename = "match")]
    pub match_text: Option<String>,
    pub category_ids: Option<String>,
    pub price_range: Option<String>,
}

/// Treats `?x=` like an absent parameter.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    /// `None` when paging is disabled with `limit=-1`.
    pub take: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            take: Some(DEFAULT_LIMIT),
        }
    }
}

impl Pagination {
    pub fn parse(limit: Option<&str>, page: Option<&str>) -> Result<Self, ServiceError> {
        let take = match present(limit) {
            None => Some(DEFAULT_LIMIT),
            Some(raw) => match raw.parse::<i64>() {
                Ok(UNLIMITED) => None,
                Ok(n) if n > 0 => Some(n as u64),
                _ => {
                    return Err(ServiceError::ValidationError(format!(
                        "limit must be a positive integer or -1, got '{raw}'"
                    )))
                }
            },
        };

        let page = match present(page) {
            None => DEFAULT_PAGE,
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ServiceError::ValidationError(format!(
                        "page must be an integer >= 1, got '{raw}'"
                    )))
                }
            },
        };

        // the offset must fit the database's signed 64-bit OFFSET
        if let Some(take) = take {
            let in_range = (page - 1)
                .checked_mul(take)
                .is_some_and(|skip| i64::try_from(skip).is_ok());
            if !in_range {
                return Err(ServiceError::ValidationError(
                    "page * limit is out of range".to_string(),
                ));
            }
        }

        Ok(Self { page, take })
    }

    /// Rows to skip; unset when paging is disabled.
    pub fn skip(&self) -> Option<u64> {
        self.take.map(|take| (self.page - 1).saturating_mul(take))
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        match self.take {
            Some(take) => total.div_ceil(take),
            None => 1,
        }
    }
}

/// Which top-level keys of a record survive serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Only(Vec<String>),
}

impl Projection {
    /// `fields=a,b` selects `a` and `b`; absent or blank falls back to `default`.
    pub fn parse(fields: Option<&str>, default: Projection) -> Self {
        let names: Vec<String> = present(fields)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if names.is_empty() {
            default
        } else {
            Projection::Only(names)
        }
    }

    pub fn product_default() -> Self {
        Projection::Only(PRODUCT_DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect())
    }

    pub fn includes(&self, field: &str) -> bool {
        match self {
            Projection::All => true,
            Projection::Only(names) => names.iter().any(|n| n == field),
        }
    }

    /// Drops keys of a JSON object that are neither selected nor in
    /// `always`. Unknown names in the selection are ignored.
    pub fn apply(&self, record: Value, always: &[&str]) -> Value {
        match (self, record) {
            (Projection::All, record) => record,
            (Projection::Only(_), Value::Object(mut map)) => {
                map.retain(|key, _| self.includes(key) || always.contains(&key.as_str()));
                Value::Object(map)
            }
            (_, other) => other,
        }
    }
}

/// Paging and projection shared by both list endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan {
    pub pagination: Pagination,
    pub projection: Projection,
}

impl ListPlan {
    /// Category listing: everything selected unless `fields` narrows it.
    pub fn for_categories(query: &ListQuery) -> Result<Self, ServiceError> {
        Ok(Self {
            pagination: Pagination::parse(query.limit.as_deref(), query.page.as_deref())?,
            projection: Projection::parse(query.fields.as_deref(), Projection::All),
        })
    }
}

/// One optional condition on products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductPredicate {
    /// Case-insensitive substring of name or description.
    Matches(String),
    /// Linked to at least one of these categories.
    InCategories(Vec<i32>),
    /// Inclusive price bounds.
    PriceBetween { min: Decimal, max: Decimal },
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl ProductPredicate {
    pub fn to_condition(&self) -> Condition {
        match self {
            ProductPredicate::Matches(text) => {
                let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
                let lower_like = |column: product::Column| {
                    Expr::expr(Func::lower(Expr::col((product::Entity, column))))
                        .like(LikeExpr::new(pattern.clone()).escape('\\'))
                };
                Condition::any()
                    .add(lower_like(product::Column::Name))
                    .add(lower_like(product::Column::Description))
            }
            ProductPredicate::InCategories(ids) => Condition::all().add(
                product::Column::Id.in_subquery(
                    Query::select()
                        .column(product_category::Column::ProductId)
                        .from(product_category::Entity)
                        .and_where(product_category::Column::CategoryId.is_in(ids.iter().copied()))
                        .to_owned(),
                ),
            ),
            ProductPredicate::PriceBetween { min, max } => Condition::all()
                .add(product::Column::Price.gte(*min))
                .add(product::Column::Price.lte(*max)),
        }
    }
}

fn parse_match(raw: Option<&str>) -> Option<ProductPredicate> {
    present(raw).map(|text| ProductPredicate::Matches(text.to_string()))
}

fn parse_category_ids(raw: Option<&str>) -> Result<Option<ProductPredicate>, ServiceError> {
    let Some(raw) = present(raw) else {
        return Ok(None);
    };

    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i32>().map_err(|_| {
                ServiceError::ValidationError(format!("category_ids must be integers, got '{id}'"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((!ids.is_empty()).then_some(ProductPredicate::InCategories(ids)))
}

fn parse_price_range(raw: Option<&str>) -> Result<Option<ProductPredicate>, ServiceError> {
    let Some(raw) = present(raw) else {
        return Ok(None);
    };

    let invalid = || {
        ServiceError::ValidationError(format!(
            "price_range must look like 'min-max', got '{raw}'"
        ))
    };

    let (min, max) = raw.split_once('-').ok_or_else(invalid)?;
    let min = Decimal::from_str(min.trim()).map_err(|_| invalid())?;
    let max = Decimal::from_str(max.trim()).map_err(|_| invalid())?;
    if min > max {
        return Err(ServiceError::ValidationError(format!(
            "price_range minimum {min} is greater than maximum {max}"
        )));
    }

    Ok(Some(ProductPredicate::PriceBetween { min, max }))
}

/// Conjunction of the product predicates present in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    predicates: Vec<ProductPredicate>,
}

impl ProductFilter {
    pub fn parse(
        match_text: Option<&str>,
        category_ids: Option<&str>,
        price_range: Option<&str>,
    ) -> Result<Self, ServiceError> {
        let fragments = [
            parse_match(match_text),
            parse_category_ids(category_ids)?,
            parse_price_range(price_range)?,
        ];

        Ok(Self {
            predicates: fragments.into_iter().flatten().collect(),
        })
    }

    pub fn predicates(&self) -> &[ProductPredicate] {
        &self.predicates
    }

    /// `None` when no predicate was given, so no WHERE clause is emitted.
    pub fn condition(&self) -> Option<Condition> {
        if self.predicates.is_empty() {
            return None;
        }
        Some(
            self.predicates
                .iter()
                .fold(Condition::all(), |acc, predicate| acc.add(predicate.to_condition())),
        )
    }
}

/// Everything `GET /produtos` needs to run its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListPlan {
    pub filter: ProductFilter,
    pub list: ListPlan,
}

impl ProductListPlan {
    pub fn from_query(query: &ProductListQuery) -> Result<Self, ServiceError> {
        Ok(Self {
            filter: ProductFilter::parse(
                query.match_text.as_deref(),
                query.category_ids.as_deref(),
                query.price_range.as_deref(),
            )?,
            list: ListPlan {
                pagination: Pagination::parse(query.limit.as_deref(), query.page.as_deref())?,
                projection: Projection::parse(
                    query.fields.as_deref(),
                    Projection::product_default(),
                ),
            },
        })
    }
}
