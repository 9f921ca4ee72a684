use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use brl::*;
use brl::sampler::ProposalKind;

/// Learns a Bayesian rule list from delimited, discretized records
#[derive( Parser, Debug )]
#[command( name = "brl", version )]
struct Cli {
    /// Records with one discretized value per feature and the integer label last
    #[arg( long )]
    data: PathBuf,

    #[arg( long, default_value = "," )]
    delimiter: String,

    /// First line holds the feature names
    #[arg( long )]
    header: bool,

    /// JSON configuration, missing fields take their defaults
    #[arg( long )]
    config: Option<PathBuf>,

    #[arg( long )]
    min_support: Option<f64>,

    #[arg( long )]
    max_length: Option<usize>,

    #[arg( long )]
    chains: Option<usize>,

    #[arg( long )]
    seed: Option<u64>,

    /// Stops sampling after this many iterations even without convergence
    #[arg( long )]
    max_iterations: Option<usize>,

    /// Stops sampling after this many seconds even without convergence
    #[arg( long )]
    time_limit: Option<f64>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg( long, default_value = "info" )]
    log_level: LevelFilter,

    /// Writes the selected rule list with its counts as JSON
    #[arg( long )]
    output: Option<PathBuf>,
}

impl Cli {
    fn configuration( &self ) -> Result<Config> {
	let mut config = match &self.config {
	    Some( path ) => Config::from_json_file( path )?,
	    None => Config::default(),
	};
	if let Some( min_support ) = self.min_support {
	    config.mining.min_support = min_support;
	}
	if let Some( max_length ) = self.max_length {
	    config.mining.max_antecedent_length = max_length;
	}
	if let Some( chains ) = self.chains {
	    config.sampler.num_chains = chains;
	}
	if self.seed.is_some() {
	    config.sampler.seed = self.seed;
	}
	if self.max_iterations.is_some() {
	    config.sampler.max_iterations = self.max_iterations;
	}
	if self.time_limit.is_some() {
	    config.sampler.time_limit_secs = self.time_limit;
	}
	Ok( config )
    }
}

fn main() -> std::result::Result<(), String> {
    let cli = Cli::parse();
    prepare_logging( cli.log_level )?;
    run( &cli ).map_err( |e| e.to_string() )
}

fn run( cli: &Cli ) -> Result<()> {
    let config = cli.configuration()?;
    let data = io::read_dataset( &cli.data, &cli.delimiter, cli.header )?;
    info!( "Read {} transactions with {} features and {} labels", data.len(), data.num_features(), data.num_labels() );

    let learned = RuleListLearner::new( config ).fit( &data )?;
    let diagnostics = learned.run.diagnostics();

    println!( "{}", learned.fitted );
    println!( "log posterior: {:.3}", learned.point.1 );
    println!( "iterations: {} (converged: {}, cancelled: {})", diagnostics.iterations, diagnostics.converged, diagnostics.cancelled );
    if let Some( r_hat ) = diagnostics.r_hat_history.last() {
	println!( "final R-hat: {r_hat:.4}" );
    }
    for kind in ProposalKind::ALL {
	if let Some( rate ) = diagnostics.moves.acceptance_rate( kind ) {
	    println!( "{kind:?} acceptance: {rate:.3}" );
	}
    }
    println!( "training accuracy: {:.3}", learned.fitted.accuracy( &data ));

    if let Some( path ) = &cli.output {
	io::write_json( &learned.fitted, path )?;
	info!( "Wrote rule list to {}", path.display() );
    }
    Ok( () )
}
