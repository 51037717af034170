//! xorshift generators shared by the host reference path and the CPU backend.
//!
//! - [`xorshift1024`]: 16-word state with a cycling pointer, scrambled output
//! - [`xorshift128`]: 2-word state, one-shot output per pair

pub mod xorshift1024;
pub mod xorshift128;

pub use xorshift1024::{Xorshift1024Star, XORSHIFT1024_MULTIPLIER, XORSHIFT1024_WORDS};
pub use xorshift128::{Xorshift128Plus, XORSHIFT128_WORDS};
