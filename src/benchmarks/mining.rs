use tracing::{info, debug};
use tracing_subscriber::filter::LevelFilter;

use rand::prelude::*;
use statrs::distribution::DiscreteUniform;

use std::time::*;

use brl::*;

fn main() -> std::result::Result<(), String> {
    prepare_logging( LevelFilter::INFO )?;

    let data = synthetic_data( 2000, 12, 4, 7 ).map_err( |e| e.to_string() )?;

    for min_support in [0.2, 0.1, 0.05] {
	for max_length in [2, 3] {
	    benchmark_mining( &data, min_support, max_length ).map_err( |e| e.to_string() )?;
	}
    }
    benchmark_sampling( &data, 500 ).map_err( |e| e.to_string() )?;

    Ok( () )
}

/// Uniform categorical features, the label follows the first feature with some noise
fn synthetic_data( num_transactions: usize, num_features: usize, num_values: i64, seed: u64 ) -> Result<Dataset> {
    let mut gen = StdRng::seed_from_u64( seed );
    let value_distribution = DiscreteUniform::new( 0, num_values - 1 )
	.map_err( |e| BrlError::InvalidConfig{ parameter: "num_values", reason: e.to_string() } )?;

    let mut records = Vec::with_capacity( num_transactions );
    let mut labels = Vec::with_capacity( num_transactions );
    for _ in 0 .. num_transactions {
	let record: Vec<String> = ( 0 .. num_features )
	    .map( |_| format!( "v{}", value_distribution.sample( &mut gen ) as i64 ))
	    .collect();
	let signal = record[0] == "v0";
	let label = if gen.gen::<f64>() < 0.1 { !signal } else { signal };
	records.push( record );
	labels.push( label as Label );
    }
    Dataset::from_records( &records, labels, 2 )
}

fn benchmark_mining( data: &Dataset, min_support: f64, max_antecedent_length: usize ) -> Result<AntecedentPool> {
    info!( "Start benchmark: mining with support {min_support} and length {max_antecedent_length}" );
    let mut miner = FpGrowthMiner::new( &MiningConfig{ min_support, max_antecedent_length } );

    let start = Instant::now();
    let pool = miner.mine( data )?;
    let time_spent = Instant::now().duration_since( start );

    let histogram: Vec<usize> = pool.cardinalities().map( |k| pool.count_with_cardinality( k )).collect();
    debug!( "antecedents by cardinality {histogram:?}" );
    info!( "Result: {} antecedents in {}ms", pool.len(), time_spent.as_millis() );
    Ok( pool )
}

fn benchmark_sampling( data: &Dataset, iterations: usize ) -> Result<()> {
    let pool = benchmark_mining( data, 0.1, 2 )?;
    let config = SamplerConfig{
	burn_in: iterations / 5,
	min_iterations: iterations,
	max_iterations: Some( iterations ),
	seed: Some( 0 ),
	..SamplerConfig::default()
    };
    info!( "Start benchmark: {iterations} iterations on {} chains", config.num_chains );
    let sampler = Sampler::new( GenerativeModel::new( &ModelConfig::default() ), config );

    let start = Instant::now();
    let run = sampler.run( &pool, data )?;
    let time_spent = Instant::now().duration_since( start );

    let diagnostics = run.diagnostics();
    info!( "Result: {} iterations took {}ms ({:.3}ms per iteration), {} samples",
	   diagnostics.iterations,
	   time_spent.as_millis(),
	   time_spent.as_secs_f64() * 1000.0 / diagnostics.iterations.max( 1 ) as f64,
	   run.num_samples() );
    Ok( () )
}
