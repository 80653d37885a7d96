//! Domain types for RangeLab

pub mod bar;
pub mod direction;
pub mod window;

pub use bar::Bar;
pub use direction::{Confirmation, Direction};
pub use window::{clock, Window};
