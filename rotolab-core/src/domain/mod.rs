//! Core domain types: bars, fills, order identifiers.

pub mod bar;
pub mod fill;
pub mod ids;

pub use bar::Bar;
pub use fill::Fill;
pub use ids::{IdGen, OrderId};
