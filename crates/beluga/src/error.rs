#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] beluga_graph::Error),

    #[error("update schedule increment must be positive, got {increment}")]
    InvalidSchedule { increment: usize },

    #[error("fixed vertex {vertex} has no supplied position")]
    MissingFixedPosition { vertex: String },

    #[error("position supplied for unknown vertex {vertex}")]
    UnknownVertex { vertex: String },

    #[error("spring parameters supplied for unknown edge {edge}")]
    UnknownEdge { edge: String },

    #[error("non-finite position ({x}, {y}) supplied for vertex {vertex}")]
    InvalidPosition { vertex: String, x: f64, y: f64 },

    #[error("quadtree bounding region is degenerate: size={size}")]
    DegenerateBounds { size: f64 },

    #[error("invalid layout parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            reason: format!("expected a finite non-negative value, got {value}"),
        })
    }
}

pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            reason: format!("expected a finite positive value, got {value}"),
        })
    }
}
