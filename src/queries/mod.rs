pub mod listing;

pub use listing::{
    ListPlan, ListQuery, Pagination, ProductFilter, ProductListPlan, ProductListQuery,
    ProductPredicate, Projection,
};
