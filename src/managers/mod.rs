// Kizuna state managers
// Managers own mutable archive state and the session loop that drives it.

pub mod bookmark_mutations;
pub mod bookmark_session;
pub mod bookmark_store;
pub mod reconciler;
