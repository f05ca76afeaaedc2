//! Crate error type.
//!
//! Configuration problems surface once, at construction. Boundary problems
//! (a candidate that does not match the schema) surface before anything
//! reaches the engine. Guard conflicts and estimator degeneracy are not
//! errors: they are resolved by fixed rules inside the engine.

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error produced by an external collaborator (candidate source or decision sink).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by `bouncer`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A quota can never be met: its minimum exceeds total capacity.
    #[error("infeasible quota for `{attribute}`: min_count {min_count} exceeds capacity {capacity}")]
    InfeasibleQuota {
        attribute: String,
        min_count: u32,
        capacity: u32,
    },

    /// The scenario declares no attributes.
    #[error("attribute schema is empty")]
    EmptySchema,

    /// The scenario declares more attributes than a `Combo` can index.
    #[error("too many attributes: {count} (max {max})")]
    TooManyAttributes { count: usize, max: usize },

    /// Two attributes share a name.
    #[error("duplicate attribute `{0}`")]
    DuplicateAttribute(String),

    /// A prior frequency is outside `[0, 1]` or not finite.
    #[error("prior for `{attribute}` must be a finite value in [0, 1], got {prior}")]
    InvalidPrior { attribute: String, prior: f64 },

    /// Capacity must be at least one seat.
    #[error("capacity must be positive")]
    ZeroCapacity,

    /// A correlation entry names an attribute that is not in the schema.
    #[error("correlation references unknown attribute `{0}`")]
    UnknownCorrelationAttribute(String),

    /// A candidate arrived without a value for an expected attribute.
    #[error("malformed candidate: missing attribute `{missing}`")]
    MalformedCandidate { missing: String },

    /// A candidate carried an attribute the schema does not know.
    #[error("unknown attribute `{name}`")]
    UnknownAttribute { name: String },

    /// A candidate or snapshot was built against a different schema.
    #[error("schema mismatch: expected {expected} attributes, got {got}")]
    SchemaMismatch { expected: usize, got: usize },

    /// A resume snapshot is internally inconsistent or does not match the configuration.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A decision was requested after capacity was exhausted.
    #[error("capacity exhausted; no further decisions are made")]
    CapacityExhausted,

    /// The candidate source failed.
    #[error("candidate source failed")]
    Source(#[source] CollaboratorError),

    /// The decision sink failed to record a decision.
    #[error("decision sink failed")]
    Sink(#[source] CollaboratorError),
}
