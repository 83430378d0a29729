#[macro_use]
mod macros;

pub mod energy;
pub mod percent;
pub mod power;
mod zero;

pub use self::zero::Zero;
