pub mod user_repo;
pub use user_repo::UserRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod movement_repo;
pub use movement_repo::MovementRepository;
pub mod count_repo;
pub use count_repo::CountRepository;
