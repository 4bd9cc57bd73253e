//! `pw-listener`: the `pushwire` command-line client.

pub mod cli;
