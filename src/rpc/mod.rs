//! Multiplexed request/response channel over a single persistent socket.

mod channel;

pub use channel::Channel;
