//! Warband — role signup session bounded context.
//!
//! A signup session is a live copy of a composition template in which
//! players claim and release individual role slots. Sessions are
//! event-sourced; concurrent toggles are serialized by optimistic
//! compare-and-swap on the stream version.

pub mod application;
pub mod domain;
