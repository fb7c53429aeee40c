//! Core functionalities: serial channel, receive buffer, transports.

pub mod buffer;
pub mod channel;
pub mod config;
pub mod error;
pub mod transport;

pub use buffer::ReceiveBuffer;
pub use channel::AsyncLineChannel;
pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use transport::{MockDevice, MockTransport, SerialTransport, Transport};
