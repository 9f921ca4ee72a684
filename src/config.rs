use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BrlError, Result};

/// Controls which antecedents the miner produces
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct MiningConfig {
    /// fraction of transactions an antecedent must hold for
    pub min_support: f64,
    pub max_antecedent_length: usize,
}

/// Hyperparameters of the generative model
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct ModelConfig {
    /// Dirichlet concentration, one entry per label
    pub alpha: Vec<f64>,
    /// prior mean of the list length
    pub lambda: f64,
    /// prior mean of the antecedent cardinality
    pub eta: f64,
}

#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct SamplerConfig {
    pub num_chains: usize,
    pub burn_in: usize,
    pub min_iterations: usize,
    /// hard stop for runs that do not converge, none by default
    pub max_iterations: Option<usize>,
    pub convergence_threshold: f64,
    /// chains are seeded with seed, seed + 1, ...; entropy if absent
    pub seed: Option<u64>,
    pub time_limit_secs: Option<f64>,
}

#[derive( Debug, Clone, Default, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct Config {
    pub mining: MiningConfig,
    pub model: ModelConfig,
    pub sampler: SamplerConfig,
}

impl Default for MiningConfig {
    fn default() -> MiningConfig {
	MiningConfig{
	    min_support: 0.1,
	    max_antecedent_length: 3,
	}
    }
}

impl Default for ModelConfig {
    fn default() -> ModelConfig {
	ModelConfig{
	    alpha: vec!( 1.0, 1.0 ),
	    lambda: 1.0,
	    eta: 1.0,
	}
    }
}

impl Default for SamplerConfig {
    fn default() -> SamplerConfig {
	SamplerConfig{
	    num_chains: 3,
	    burn_in: 500,
	    min_iterations: 2000,
	    max_iterations: None,
	    convergence_threshold: 1.05,
	    seed: None,
	    time_limit_secs: None,
	}
    }
}

impl MiningConfig {
    pub fn validate( &self ) -> Result<()> {
	if !( self.min_support > 0.0 && self.min_support < 1.0 ) {
	    return Err( BrlError::config( "min_support", format!( "must lie in (0, 1), got {}", self.min_support )));
	}
	if self.max_antecedent_length < 1 {
	    return Err( BrlError::config( "max_antecedent_length", "must be at least 1" ));
	}
	Ok( () )
    }
}

impl ModelConfig {
    pub fn validate( &self, num_labels: usize ) -> Result<()> {
	if self.alpha.len() != num_labels {
	    return Err( BrlError::config( "alpha", format!( "has {} entries for {} labels", self.alpha.len(), num_labels )));
	}
	if let Some( bad ) = self.alpha.iter().find( |a| !( **a > 0.0 && a.is_finite() )) {
	    return Err( BrlError::config( "alpha", format!( "entries must be positive, got {bad}" )));
	}
	check_positive( "lambda", self.lambda )?;
	check_positive( "eta", self.eta )
    }
}

impl SamplerConfig {
    pub fn validate( &self ) -> Result<()> {
	if self.num_chains < 1 {
	    return Err( BrlError::config( "num_chains", "must be at least 1" ));
	}
	if !( self.convergence_threshold > 1.0 ) {
	    return Err( BrlError::config( "convergence_threshold", format!( "must exceed 1, got {}", self.convergence_threshold )));
	}
	if let Some( limit ) = self.time_limit_secs {
	    check_positive( "time_limit_secs", limit )?;
	}
	Ok( () )
    }
}

impl Config {
    /// Reads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>( path: P ) -> Result<Config> {
	let reader = BufReader::new( File::open( path )? );
	Ok( serde_json::from_reader( reader )? )
    }

    /// Checks every constraint before any mining or sampling happens
    pub fn validate( &self, num_labels: usize ) -> Result<()> {
	self.mining.validate()?;
	self.model.validate( num_labels )?;
	self.sampler.validate()
    }
}

fn check_positive( parameter: &'static str, value: f64 ) -> Result<()> {
    if value > 0.0 && value.is_finite() {
	Ok( () )
    } else {
	Err( BrlError::config( parameter, format!( "must be positive, got {value}" )))
    }
}
