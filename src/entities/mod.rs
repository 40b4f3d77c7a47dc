//! sea-orm entities for the storefront catalog.
//!
//! A product owns its category links, images and option rows; deleting a
//! product cascades to all three.

pub mod category;
pub mod product;
pub mod product_category;
pub mod product_image;
pub mod product_option;
