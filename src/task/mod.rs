pub mod breakdown;
pub mod error;
pub mod graph;
pub mod manager;
pub mod selector;
pub mod state_machine;
pub mod store;
pub mod strategy;
pub mod types;


pub use breakdown::*;
pub use error::*;
pub use graph::*;
pub use manager::*;
pub use selector::*;
pub use state_machine::*;
pub use store::*;
pub use strategy::*;
pub use types::*;
