mod kv;
pub use kv::KeyValue;

mod env;
pub use env::Env;

/// Registry key of a laborer.
///
/// Unique within a single boss; no other constraints are applied.
pub type LaborerName = String;
