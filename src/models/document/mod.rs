pub mod naming;
pub mod queries;
pub mod types;
pub mod versioning;

pub use naming::*;
pub use queries::*;
pub use types::*;
pub use versioning::*;
