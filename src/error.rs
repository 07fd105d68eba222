use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum DictionaryError {
    #[error("dictionary file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse dictionary {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid dictionary structure: {0}")]
    StructureInvalid(String),

    #[error("dictionary io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key '{key}' is defined in both '{first}' and '{second}' with different values")]
    Collision {
        key: String,
        first: String,
        second: String,
    },
}

impl DictionaryError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Parse { .. } => "parse_error",
            Self::StructureInvalid(_) => "structure_invalid",
            Self::Io { .. } => "io_error",
            Self::Collision { .. } => "collision",
        }
    }
}
