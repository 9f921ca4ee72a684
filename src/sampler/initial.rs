use std::collections::BTreeMap;

use crate::*;
use crate::model::log_poisson_weight;

/// Draws the starting state of a chain from the prior.
/// The length comes from the truncated length prior, then every rule gets a cardinality and
/// an antecedent of that cardinality not chosen before.
/// Cardinalities whose antecedents are used up are no longer drawn.
pub fn sample_default_list<S: UniformSource + ?Sized>( model: &GenerativeModel, pool: &AntecedentPool, source: &mut S ) -> Result<RuleList> {
    if pool.is_empty() {
	return Err( BrlError::EmptyPool );
    }
    let length = sample_length( model, pool, source );

    let mut unchosen: BTreeMap<usize, Vec<AntecedentId>> = pool.cardinalities()
	.map( |k| (k, pool.with_cardinality( k ).to_vec()) )
	.collect();
    let mut rules: Vec<AntecedentId> = Vec::with_capacity( length );
    while rules.len() < length {
	let available: Vec<usize> = unchosen.keys().copied().collect();
	let cardinality = sample_cardinality( &available, model.eta(), source );
	let group = unchosen.get_mut( &cardinality ).expect( "sampled among available cardinalities" );
	let pick = source.index( group.len() );
	rules.push( group.remove( pick ));
	if group.is_empty() {
	    unchosen.remove( &cardinality );
	}
    }
    Ok( RuleList::new( rules ))
}

/// Inverse CDF over the length prior with a single draw
fn sample_length<S: UniformSource + ?Sized>( model: &GenerativeModel, pool: &AntecedentPool, source: &mut S ) -> usize {
    let probabilities = model.length_probabilities( pool );
    1 + inverse_cdf( &probabilities, source.uniform() )
}

/// Inverse CDF over Poisson weights restricted to the available cardinalities.
/// Pre: available is not empty
fn sample_cardinality<S: UniformSource + ?Sized>( available: &[usize], eta: f64, source: &mut S ) -> usize {
    let weights: Vec<f64> = available.iter()
	.map( |k| log_poisson_weight( *k, eta ).exp() )
	.collect();
    available[ inverse_cdf( &weights, source.uniform() ) ]
}

/// Index of the first weight whose cumulative sum exceeds draw times the total.
/// Weights need not be normalized.
fn inverse_cdf( weights: &[f64], draw: f64 ) -> usize {
    let total: f64 = weights.iter().sum();
    let target = draw * total;
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
	cumulative += weight;
	if cumulative > target {
	    return index;
	}
    }
    // rounding left the draw beyond the last step
    weights.len() - 1
}
