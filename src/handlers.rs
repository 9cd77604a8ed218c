pub mod auth;
pub mod products;
pub mod stock;
pub mod counts;
pub mod movements;
pub mod imports;
