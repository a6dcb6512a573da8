use thiserror::Error;

#[derive(Error, Debug)]
pub enum KgError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("SQL generation error: {0}")]
    SqlGeneration(String),

    #[error("Warehouse error: {0}")]
    Warehouse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KgError>;
