use thiserror::Error;

#[derive(Error, Debug)]
pub enum DossierError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
