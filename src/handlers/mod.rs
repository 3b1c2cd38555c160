pub mod events;
pub mod persistence;
pub mod persistence_writer;
pub mod provider;
pub mod store;
pub mod store_actor;
pub mod subscription;
