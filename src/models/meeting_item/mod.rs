pub mod queries;
pub mod status;
pub mod types;
pub mod validate;

pub use queries::*;
pub use status::*;
pub use types::*;
pub use validate::*;
