//! Behaviour-level tests driving the daemon over a live socket.

mod behaviour;
