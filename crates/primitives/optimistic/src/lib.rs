//! Primitive types shared by the queue store, the Lens client and the reconciler.
//!
//! - [`OptimisticTransaction`]: a post the user submitted which the indexer has not confirmed yet.
//! - [`Publication`]: the canonical server-side object a confirmed transaction resolves to.

mod publication;
mod transaction;

pub use publication::*;
pub use transaction::*;
