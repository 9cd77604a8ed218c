pub mod auth;
pub mod validation;
pub mod product_service;
pub mod stock_service;
pub mod count_service;
pub mod movement_service;
pub mod spreadsheet;
pub mod import_service;
