//! Listener Pool - bound sockets and accept loops
//!
//! Owns one bound TCP listener per monitored port. Activation is
//! all-or-nothing: either every port binds or none stays bound. Each
//! listener runs an independent accept loop that turns every accepted
//! connection into a `Hit`, hands it to the sink, optionally writes the
//! informational banner, and closes the connection.

mod pool;

pub use pool::ListenerPool;
