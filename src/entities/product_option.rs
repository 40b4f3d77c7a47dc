use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Option variant of a product (size, colour, ...). `values` holds the
/// variant's choices joined with a comma.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_options")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub title: String,
    pub shape: Option<String>,
    pub radius: Option<i32>,
    #[sea_orm(column_name = "type")]
    pub option_type: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub values: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
