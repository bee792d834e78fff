pub mod booking;
pub mod catalog;
pub mod customers;
pub mod ledger;
pub mod lifecycle;
pub mod slots;
