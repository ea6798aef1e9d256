pub mod inventory;
pub mod tenant;
pub mod transaction;
