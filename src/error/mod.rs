pub mod bus;
pub mod connection;
pub mod logging;
pub mod startup;

pub use bus::{BusError, BusResult};
pub use connection::SendError;
pub use logging::LoggingError;
pub use startup::StartupError;
