//! Reconciliation pipeline: row indexing, the reconciler and the session
//! that owns selection state and memoizes derived results

pub mod indexer;
pub mod reconciler;
pub mod session;

pub use indexer::{index_rows, IndexPolicy, IndexedRow, RowIndex};
pub use reconciler::{reconcile, Reconciliation, ReconciliationSummary};
pub use session::{Dataset, Session};
