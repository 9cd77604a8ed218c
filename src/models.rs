pub mod auth;
pub mod count;
pub mod import;
pub mod movement;
pub mod product;
pub mod stock;
