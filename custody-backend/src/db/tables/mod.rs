pub mod listener_status;
pub mod transactions;
