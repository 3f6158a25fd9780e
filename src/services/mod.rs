pub mod carts;
pub mod catalog;
pub mod fulfillment;
pub mod notifications;
pub mod orders;
pub mod payments;
