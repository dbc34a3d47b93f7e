pub mod demo;
pub mod identity;
pub mod lifecycle;
pub mod merger;
pub mod sqlite_store;
pub mod store;
