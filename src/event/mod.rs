// Event-driven communication between components
//
// A synchronous named-topic bus. Listeners are plain closures invoked on the
// emitting thread, in the order they were registered.

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::{ApiErrorEvent, ApiResponseEvent, API_ERROR, API_RESPONSE};
pub use handler::{EventError, Listener, ListenerPolicy};

// Internal modules
mod bus;
mod events;
mod handler;
