//! Application lifecycle core: identity arena, relationship manager,
//! history ledger and the status state machine.

pub mod arena;
pub mod history;
pub mod relations;
pub mod state_machine;
