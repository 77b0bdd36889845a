//! The order aggregate and its supporting value objects.

pub mod aggregate;
pub mod status;
pub mod value_objects;

pub use aggregate::{Order, Totals};
pub use status::{OrderStatus, PaymentStatus};
pub use value_objects::{Address, CheckoutItem, OrderItem, ProductId};
