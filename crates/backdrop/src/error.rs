use procgen::MeshError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build the terrain mesh: {0}")]
    Mesh(#[from] MeshError),
}
