// SPDX-License-Identifier: MIT
//
// pport-chat — everything about chatting that is not about the terminal.
//
// The wire model and the HTTP transport talk to the relay server. The
// session holds the client state (message history, the input line, the
// upload flag) and composes each frame. `ChatApp` glues a session and a
// transport to the pport-term event loop.

pub mod app;
pub mod config;
pub mod message;
pub mod palette;
pub mod session;
pub mod transport;

pub use app::ChatApp;
pub use message::{Draft, Message};
pub use session::{FailurePolicy, Session, SessionConfig, SessionStats};
pub use transport::{HttpTransport, Transport, TransportError};
