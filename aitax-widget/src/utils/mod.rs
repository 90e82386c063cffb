//! Utility modules for the identification widget

pub mod round;

pub use round::round;
