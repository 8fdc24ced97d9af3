use thiserror::Error;

/// Every failure the simulator can surface to the caller that started a propagation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Width {left_width} of {left} does not match width {right_width} of {right}")]
    WidthMismatch {
        left: String,
        left_width: usize,
        right: String,
        right_width: usize,
    },

    #[error("State contains floating or error bits and has no integer value")]
    IndeterminateState,

    #[error("Value {value} does not fit in {width} bits")]
    Range { value: i128, width: usize },

    #[error("Index {index} is out of range for width {width}")]
    IndexOutOfRange { index: usize, width: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Arithmetic mode {0} is not supported")]
    UnsupportedMode(u64),

    #[error("Propagation exceeded depth {depth} at component '{component}' (combinational cycle?)")]
    CycleDetected { depth: usize, component: String },

    #[error("Component '{component}' has no port named '{port}'")]
    UnknownPort { component: String, port: String },

    #[error("No component with id {0}")]
    UnknownComponent(usize),

    #[error("No bus with id {0}")]
    UnknownBus(usize),

    #[error("Port {0} is already attached to a bus")]
    AlreadyAttached(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
