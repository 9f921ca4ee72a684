use thiserror::Error;

/// Failures that abort a mining or sampling run.
#[derive( Debug, Error )]
pub enum BrlError {
    /// A configuration value violates its constraint
    #[error( "invalid configuration: {parameter} {reason}" )]
    InvalidConfig {
	parameter: &'static str,
	reason: String,
    },

    #[error( "the data set contains no transactions" )]
    EmptyDataset,

    #[error( "transaction {index} has {found} features, expected {expected}" )]
    RaggedTransaction {
	index: usize,
	expected: usize,
	found: usize,
    },

    #[error( "label {label} of transaction {index} is outside of [0, {num_labels})" )]
    LabelOutOfRange {
	index: usize,
	label: usize,
	num_labels: usize,
    },

    #[error( "{transactions} transactions but {labels} labels" )]
    LabelCountMismatch {
	transactions: usize,
	labels: usize,
    },

    /// Nothing survived support pruning
    #[error( "no antecedent reaches minimum support {min_support}" )]
    NothingFrequent {
	min_support: f64,
    },

    #[error( "the antecedent pool is empty, there is nothing to sample from" )]
    EmptyPool,

    #[error( "no samples were recorded" )]
    NoSamples,

    #[error( "line {line}: {reason}" )]
    Parse {
	line: usize,
	reason: String,
    },

    #[error( transparent )]
    Io( #[from] std::io::Error ),

    #[error( transparent )]
    Json( #[from] serde_json::Error ),
}

pub type Result<T> = std::result::Result<T, BrlError>;

impl BrlError {
    pub(crate) fn config( parameter: &'static str, reason: impl Into<String> ) -> BrlError {
	BrlError::InvalidConfig{ parameter, reason: reason.into() }
    }
}
