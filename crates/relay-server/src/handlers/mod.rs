pub mod balance;
pub mod bridge;
pub mod common;
pub mod health;

pub use balance::get_balance;
pub use bridge::{bridge_a_to_b, bridge_b_to_a};
pub use health::health;
