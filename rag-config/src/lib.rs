//! Process configuration: one strict JSON file, env overrides, loaded once.

pub mod errors;
pub mod load;
pub mod model;

pub use errors::ConfigError;
pub use load::{load, load_from_path};
pub use model::{
    Chunking, Config, EmbeddingModels, HybridRetrieval, HybridWeightsSection, QdrantSection,
};
