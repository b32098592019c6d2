pub mod client;
pub mod dto;
pub mod gateway;
pub mod store;

pub use client::StoreClient;
pub use gateway::{Mutation, MutationGateway, ServerState};
pub use store::RemoteStore;
