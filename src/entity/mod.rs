pub mod cart_items;
pub mod carts;
pub mod daily_stats;
pub mod favorites;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use daily_stats::Entity as DailyStats;
pub use favorites::Entity as Favorites;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
