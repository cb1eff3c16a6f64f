pub mod cooldown;
pub mod ledger;
pub mod selector;

pub use ledger::SpinLedger;
