#![warn(rust_2018_idioms)]
#![allow(dead_code)]

#[macro_use]
extern crate lazy_static;

pub mod agent;
pub mod candidate;
pub mod control;
pub mod error;
pub mod errors;
pub mod listener;
pub mod network_type;
pub mod priority;
mod rand;
pub mod rolling_buffer;
pub mod signaling;
pub mod socket;
pub mod state;
pub mod state_machine;
pub mod timer;
pub mod turn_conn;
pub mod url;
pub mod use_candidate;
mod util;
