pub mod action;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod grammar;
pub mod r#loop;
pub mod palette;
pub mod persistence;
pub mod recovery;
pub mod reducer;
pub mod resolver;
pub mod state;
