use thiserror::Error;

use crate::provider::OperationDepth;

/// Value of the `Depth` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
    /// `1,noroot`: the children without the requested item
    OneNoRoot,
    /// `infinity,noroot`
    InfinityNoRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Depth header must be 0, 1, or infinity.")]
pub struct InvalidDepth;

impl Depth {
    /// Parse the header value. A missing header means infinity.
    pub fn parse(header: Option<&str>) -> Result<Self, InvalidDepth> {
        let Some(header) = header else {
            return Ok(Depth::Infinity);
        };
        match header.trim().to_ascii_lowercase().as_str() {
            "0" => Ok(Depth::Zero),
            "1" => Ok(Depth::One),
            "infinity" => Ok(Depth::Infinity),
            "1,noroot" => Ok(Depth::OneNoRoot),
            "infinity,noroot" => Ok(Depth::InfinityNoRoot),
            _ => Err(InvalidDepth),
        }
    }

    pub fn operation_depth(self) -> OperationDepth {
        match self {
            Depth::Zero => OperationDepth::ZERO,
            Depth::One => OperationDepth::ONE,
            Depth::Infinity => OperationDepth::INFINITY,
            Depth::OneNoRoot => OperationDepth::ONE_NO_ROOT,
            Depth::InfinityNoRoot => OperationDepth::INFINITY_NO_ROOT,
        }
    }
}
