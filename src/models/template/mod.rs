pub mod fields;
pub mod types;
pub mod queries;

pub use fields::*;
pub use types::*;
pub use queries::*;
