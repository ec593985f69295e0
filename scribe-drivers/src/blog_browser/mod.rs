pub mod contexts;
pub mod driver;
pub mod interact;
pub mod pacing;
pub mod poll;
