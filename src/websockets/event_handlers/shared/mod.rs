pub mod error;
pub mod outbound;

pub use error::RelayError;
pub use outbound::Outbound;
