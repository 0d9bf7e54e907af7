//! Alert state shared by all metric checks

pub mod store;

pub use store::{AlertKey, AlertKind, AlertStore};
