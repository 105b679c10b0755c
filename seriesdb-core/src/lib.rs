pub mod error;
pub mod format;
pub mod ident;
pub mod response;

pub use format::Format;
pub use response::{Response, Scalar, Series};
