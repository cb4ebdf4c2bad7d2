//! Chain Events Listener
//!
//! Follows token deposit events on the ledger. Every replica polls, but the
//! shared cursor in `listener_status` is only advanced by whichever replica
//! wins the status row lock that cycle; the others skip.

mod listener;

pub use listener::{ChainListener, TickOutcome};
