// Kizuna services
// Services are self-contained helpers the managers call into.

pub mod category_classifier;
pub mod identity;
pub mod metadata_resolver;
pub mod ordering;
pub mod settings_engine;
pub mod sync_signal;
