use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid model output: {0}")]
    InvalidOutput(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
