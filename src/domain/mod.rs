mod ledger;
mod money;
mod row;
mod transaction;

pub use ledger::*;
pub use money::*;
pub use row::*;
pub use transaction::*;
