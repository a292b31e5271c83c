//! Built-in probe strategies.
//!
//! Each probe implements [`crate::engine::Strategy`] for one detection
//! technique. Probes are synchronous; timeouts and retries are imposed by
//! the chain that invokes them, though the HTTP probe also carries its own
//! client timeout so abandoned attempts do not hold sockets open.

pub mod command;
pub mod git;
pub mod http;

pub use command::CommandProbe;
pub use git::GitProbe;
pub use http::HttpProbe;
