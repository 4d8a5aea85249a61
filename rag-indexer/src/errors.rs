use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] rag_store::StoreError),

    #[error("glob error: {0}")]
    Glob(#[from] globset::Error),
}
