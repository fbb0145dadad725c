use thiserror::Error;

/// Possible errors that can be produced while loading an [`Animation`](crate::animation::Animation).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BvhError {
    /// An [Io](std::io) Error
    #[error("Could not read bvh file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse bvh: {0}")]
    Parse(#[from] ParseError),
    #[error("Could not resample animation: {0}")]
    Resample(#[from] ResampleError),
    #[error(transparent)]
    EulerOrder(#[from] InvalidEulerOrder),
}

/// Structural and numeric failures of the bvh grammar.
///
/// Line numbers are 1-based.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: closing brace without an open block")]
    UnexpectedCloseBrace { line: usize },
    #[error("{open} block(s) left open at the end of the hierarchy")]
    UnclosedBlocks { open: usize },
    #[error("line {line}: a second root joint was declared")]
    MultipleRoots { line: usize },
    #[error("line {line}: joint declared outside of a joint block")]
    OrphanJoint { line: usize },
    #[error("line {line}: missing joint name")]
    MissingJointName { line: usize },
    #[error("line {line}: OFFSET outside of a joint block")]
    UnexpectedOffset { line: usize },
    #[error("line {line}: expected 3 offset components, found {found}")]
    MalformedOffset { line: usize, found: usize },
    #[error("line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },
    #[error("hierarchy does not declare a root joint")]
    MissingRoot,
    #[error("missing 'Frames:' declaration")]
    MissingFrameCount,
    #[error("missing 'Frame Time:' declaration")]
    MissingFrameTime,
    #[error("line {line}: frame time must be positive, got {value}")]
    InvalidFrameTime { line: usize, value: f64 },
    #[error("line {line}: expected {expected} channel values per frame, found {found}")]
    ChannelWidthMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("declared {declared} frames but found {found} frame rows")]
    FrameCountMismatch { declared: usize, found: usize },
    #[error("line {line}: unrecognized line in the hierarchy section")]
    UnexpectedLine { line: usize },
    #[error("joint {joint} has parent {parent}, parents must precede their children")]
    ParentOrder { joint: usize, parent: usize },
}

/// Frame trimming and density changes that would leave an empty or invalid sequence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResampleError {
    #[error("cannot trim {front} leading and {back} trailing frames from {length} frames")]
    TrimUnderflow {
        front: usize,
        back: usize,
        length: usize,
    },
    #[error("cannot interpolate {length} frame(s), at least 2 are required")]
    NotEnoughFrames { length: usize },
    #[error("cannot stride {length} frame(s) by {stride}")]
    StrideUnderflow { stride: usize, length: usize },
    #[error("duplication count must be at least 1")]
    ZeroDuplication,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid rotation order {0:?}, expected 3 axes of 'xyz' (extrinsic) or 'XYZ' (intrinsic)")]
pub struct InvalidEulerOrder(pub String);
