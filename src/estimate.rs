use tracing::*;

use crate::*;

/// Picks the representative list among posterior samples.
/// The average length is taken over lists, the average cardinality over all antecedents of all
/// samples. Samples whose length and own average cardinality lie within the floor and ceiling of
/// these averages are eligible, the best scoring among them wins. If none is eligible, the best overall.
pub fn select_point_estimate<'a, I>( samples: I, pool: &AntecedentPool ) -> Result<(RuleList, f64)> where
    I: IntoIterator<Item = (&'a RuleList, f64)>
{
    let samples: Vec<(&RuleList, f64)> = samples.into_iter().collect();
    if samples.is_empty() {
	return Err( BrlError::NoSamples );
    }

    let total_length: usize = samples.iter().map( |(list, _)| list.len() ).sum();
    let total_cardinality: usize = samples.iter()
	.flat_map( |(list, _)| list.iter() )
	.map( |id| pool.cardinality_of( id ))
	.sum();
    let average_length = total_length as f64 / samples.len() as f64;
    let average_cardinality = total_cardinality as f64 / total_length as f64;
    let cardinalities: Vec<f64> = samples.iter().map( |(list, _)| list.average_cardinality( pool )).collect();
    debug!( "Average sample length {average_length:.3}, average cardinality {average_cardinality:.3}" );

    let within = |value: f64, average: f64| value >= average.floor() && value <= average.ceil();
    let eligible = samples.iter().zip( &cardinalities )
	.filter( |((list, _), cardinality)| within( list.len() as f64, average_length ) && within( **cardinality, average_cardinality ))
	.map( |(sample, _)| sample );
    if let Some( selected ) = best_scoring( eligible ) {
	return Ok( selected );
    }

    debug!( "No sample matches the average length and cardinality, taking the best overall" );
    best_scoring( samples.iter() ).ok_or( BrlError::NoSamples )
}

fn best_scoring<'a>( candidates: impl Iterator<Item = &'a (&'a RuleList, f64)> ) -> Option<(RuleList, f64)> {
    candidates
	.max_by( |left, right| left.1.total_cmp( &right.1 ))
	.map( |(list, score)| ((*list).clone(), *score) )
}
