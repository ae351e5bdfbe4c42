pub mod cancel;
pub mod exchange;
pub mod initialize;
pub mod initialize_pda;

pub use cancel::*;
pub use exchange::*;
pub use initialize::*;
pub use initialize_pda::*;
