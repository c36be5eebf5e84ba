//! Dispatch policy
//!
//! A file counts as processed only when every handler bound to its folder
//! has it (strict AND). Each failing handler triggers one failure
//! notification; the file stays in its folder for the next cycle. Handlers
//! that already succeeded for an unchanged file are skipped on later cycles
//! unless delivery memory is disabled.

mod ledger;
mod policy;

pub use ledger::DeliveryLedger;
pub use policy::{DispatchResult, Dispatcher, HandlerOutcome};
