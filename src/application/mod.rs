pub mod cache;
pub mod compose;
pub mod error;
pub mod feed;
pub mod follows;
pub mod identity;
pub mod pagination;
pub mod repos;
