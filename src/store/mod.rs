//! Data access over SQLite.
//!
//! Every mutation runs in its own transaction and records exactly one audit
//! entry inside it. Reads are generic over the executor so they can take part
//! in a caller's transaction.

pub mod groups;
pub mod memberships;
pub mod overrides;
pub mod positions;
pub mod profiles;
mod snapshot;
