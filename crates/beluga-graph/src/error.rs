#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("edge {edge} references a missing vertex: {vertex}")]
    MissingEndpoint { edge: String, vertex: String },

    #[error("edge {edge} is a self loop on {vertex}")]
    SelfLoop { edge: String, vertex: String },

    #[error("duplicate edge id: {edge}")]
    DuplicateEdge { edge: String },

    #[error("edge {edge} duplicates existing edge {existing} between the same vertices")]
    ParallelEdge { edge: String, existing: String },
}

pub type Result<T> = std::result::Result<T, Error>;
