//! Domain models returned by repositories and handlers.

pub mod design;
pub mod order;
pub mod transaction;

pub use design::{Design, DesignOwner};
pub use order::{Listing, OrderDetail, OrderRow};
pub use transaction::TransactionRow;
