//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Legacy standalone plans collection (later revisions embed plans per-user)
    pub const PLANS: &str = "plans";
    pub const EXERCISES: &str = "exercises";
}
