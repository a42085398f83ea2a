pub mod error;
pub mod normalize;
pub mod pillar;
pub mod stats;
pub mod traits;
pub mod types;

pub use error::*;
pub use pillar::{PillarComponent, PillarScore};
pub use traits::*;
pub use types::*;
