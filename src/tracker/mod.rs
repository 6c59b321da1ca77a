//!  Tracking is organized through [store::ActivityStore].
//!  The basic idea is:
//!   - Every logged session is an [activity::Activity].
//!   - The store keeps them in insertion order and answers queries with linear scans.
//!   - Every mutation rewrites the whole collection through [storage::ActivityStorage].

pub mod activity;
pub mod storage;
pub mod store;
