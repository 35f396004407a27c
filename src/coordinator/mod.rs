pub mod active;
pub mod config;
pub mod events;
pub mod manager;
pub mod serializer;


pub use active::*;
pub use config::*;
pub use events::*;
pub use manager::*;
pub use serializer::*;
