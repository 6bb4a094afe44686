#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("failed to read parameter file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("parameter validation failed: {0}")]
    Invalid(String),
    #[error("unknown parameter type `{0}`")]
    UnknownType(String),
}
