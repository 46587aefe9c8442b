/// Message bus contract and its Redis / in-process implementations.
pub mod bus;
/// Settings loading and command-line overrides.
pub mod config;
/// Error types per concern: bus, startup, client writes, logging.
pub mod error;
/// Event taxonomy: channels, payload access, cache keys, publisher.
pub mod events;
/// Process lifecycle: ordered startup, signal handling, bounded shutdown.
pub mod lifecycle;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Client connections, their registry and the WebSocket listener.
pub mod network;
/// Background workers: cache invalidation and client broadcast.
pub mod pipeline;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Bus API.
pub use bus::{CacheStore, MemoryBus, Message, MessageBus, RedisBus, Subscription};
/// Settings.
pub use config::{BusBackend, Cli, Settings};
/// Operation errors and result types.
pub use error::{BusError, BusResult, LoggingError, SendError, StartupError};
/// Events.
pub use events::{EventChannel, EventPublisher, NAMESPACE_PATTERN};
/// Lifecycle.
pub use lifecycle::{
    serve, shutdown_signal, Coordinator, CoordinatorOptions, LifecycleState, ShutdownOutcome,
};
/// Logging.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Connections.
pub use network::{ClientConnection, ConnectionRegistry};
/// Workers.
pub use pipeline::{BroadcastRelay, InvalidationDispatcher};
