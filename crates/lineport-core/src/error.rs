use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// Open failed, or the channel is closed.
    #[error("connection error: {0}")]
    Connection(String),
    /// The transport failed while reading or writing in the background.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

impl ChannelError {
    pub(crate) fn closed() -> Self {
        Self::Connection("channel is not open".to_string())
    }
}
