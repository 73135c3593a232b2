pub mod auth;
pub mod cart;
pub mod favorites;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stats;
pub mod users;
