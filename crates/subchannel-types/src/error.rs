use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubchannelError {
    #[error("Solver diverged at iteration {iteration}: {message}")]
    SolverDiverged { iteration: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid geometry: {0}")]
    GeometryError(String),

    #[error(
        "Negative mass flow {value} at axial level {level}, channel {channel}: \
         implicit solves are required for recirculating flow"
    )]
    NegativeMassFlow {
        level: usize,
        channel: usize,
        value: f64,
    },

    #[error("Negative enthalpy {value} at axial level {level}, channel {channel}")]
    NegativeEnthalpy {
        level: usize,
        channel: usize,
        value: f64,
    },

    #[error(
        "Radial conduction did not converge for pin {pin} at level {level} \
         after {iterations} iterations (error {error:e})"
    )]
    ConductionNotConverged {
        pin: usize,
        level: usize,
        iterations: usize,
        error: f64,
    },

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Size mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SubchannelResult<T> = Result<T, SubchannelError>;
