//! Type definitions

pub mod field;
pub mod import;
pub mod mapping;
pub mod messages;
pub mod outcome;
pub mod row;

pub use field::*;
pub use import::*;
pub use mapping::*;
pub use messages::*;
pub use outcome::*;
pub use row::*;
