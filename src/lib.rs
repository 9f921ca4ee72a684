pub mod antecedent;
pub mod config;
pub mod data;
pub mod error;
pub mod estimate;
pub mod io;
pub mod learner;
pub mod miner;
pub mod model;
pub mod random;
pub mod rule_list;
pub mod sampler;

use tracing::*;

pub use antecedent::{Antecedent, AntecedentId, AntecedentPool, Expression};
pub use config::{Config, MiningConfig, ModelConfig, SamplerConfig};
pub use data::{Count, Dataset, Item, Label, Transaction, Vocabulary};
pub use error::{BrlError, Result};
pub use learner::{LearnedRuleList, RuleListLearner};
pub use miner::{FpGrowthMiner, Miner};
pub use model::{FittedRuleList, GenerativeModel};
pub use random::{RngSource, UniformSource};
pub use rule_list::RuleList;
pub use sampler::{Sampler, SamplerRun};

/// Objects that can be recorded in the log
pub trait Loggable {
    fn log( &self, message: &str, level: Level );
}

/// Emits a pre-formatted message at a level only known at runtime
pub(crate) fn log_at( level: Level, message: &str ) {
    if level == Level::ERROR {
	error!( "{message}" );
    } else if level == Level::WARN {
	warn!( "{message}" );
    } else if level == Level::INFO {
	info!( "{message}" );
    } else if level == Level::DEBUG {
	debug!( "{message}" );
    } else {
	trace!( "{message}" );
    }
}

/// Installs a formatting subscriber for the binaries
pub fn prepare_logging( level: tracing_subscriber::filter::LevelFilter ) -> std::result::Result<(), String> {
    let tracer = tracing_subscriber::fmt::fmt()
        .with_max_level( level )
        .finish();
    tracing::subscriber::set_global_default( tracer ).map_err( |e| e.to_string() )
}
