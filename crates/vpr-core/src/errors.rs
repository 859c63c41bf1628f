/// Core error type for the relay.
///
/// Adapter crates map their specific errors into this type. Resolution soft
/// failures (depth ceiling, give-up) are not errors; see `resolve::Resolution`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("shortener api rejected request: {status} {body}")]
    Api { status: u16, body: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
