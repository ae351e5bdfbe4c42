pub mod escrow;
pub mod fee_registry;

pub use escrow::*;
pub use fee_registry::*;
