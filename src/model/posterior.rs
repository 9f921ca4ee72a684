use std::fmt;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::*;
use super::BucketCounts;

/// Rule list together with the label counts it induces on training data.
/// Predicts with the Dirichlet posterior of the bucket a transaction falls into.
#[derive( Debug, Clone, Serialize, Deserialize )]
pub struct FittedRuleList {
    antecedents: Vec<Antecedent>,
    /// readable form of every antecedent
    conditions: Vec<String>,
    counts: BucketCounts,
    alpha: Vec<f64>,
    log_posterior: f64,
}

/// Human oriented view of one rule
#[derive( Debug, Clone, Serialize, Deserialize )]
pub struct RuleSummary {
    /// None for the default rule
    pub condition: Option<String>,
    pub counts: Vec<Count>,
    pub posterior_mean: Vec<f64>,
}

impl FittedRuleList {

    pub fn fit( list: &RuleList, pool: &AntecedentPool, data: &Dataset, model: &GenerativeModel ) -> FittedRuleList {
	let counts = model.cover( list, pool, data );
	let log_posterior = model.calc_logprior( list, pool ) + model.calc_loglik( &counts );
	let antecedents: Vec<Antecedent> = list.iter().map( |id| pool.get( id ).clone() ).collect();
	let conditions = antecedents.iter().map( |a| a.describe( data.vocabulary() )).collect();
	FittedRuleList{
	    antecedents,
	    conditions,
	    counts,
	    alpha: model.alpha().to_vec(),
	    log_posterior,
	}
    }

    /// Number of explicit rules
    pub fn len( &self ) -> usize { self.antecedents.len() }
    pub fn is_empty( &self ) -> bool { self.antecedents.is_empty() }

    pub fn log_posterior( &self ) -> f64 { self.log_posterior }
    pub fn counts( &self ) -> &BucketCounts { &self.counts }

    pub fn bucket_of( &self, transaction: &[Item] ) -> usize {
	self.antecedents.iter()
	    .position( |a| a.holds( transaction ))
	    .map_or( 0, |position| position + 1 )
    }

    pub fn posterior_parameters( &self, bucket: usize ) -> Vec<f64> {
	self.counts.posterior_parameters( bucket, &self.alpha )
    }

    pub fn posterior_mean( &self, bucket: usize ) -> Vec<f64> {
	let parameters = self.posterior_parameters( bucket );
	let total: f64 = parameters.iter().sum();
	parameters.iter().map( |p| p / total ).collect()
    }

    pub fn predict_proba( &self, transaction: &[Item] ) -> Vec<f64> {
	self.posterior_mean( self.bucket_of( transaction ))
    }

    /// Label with the largest posterior parameter, the smallest label on ties
    pub fn predict( &self, transaction: &[Item] ) -> Label {
	let parameters = self.posterior_parameters( self.bucket_of( transaction ));
	let mut best = 0;
	for (label, parameter) in parameters.iter().enumerate() {
	    if *parameter > parameters[ best ] {
		best = label;
	    }
	}
	best
    }

    /// Fraction of correctly predicted transactions
    pub fn accuracy( &self, data: &Dataset ) -> f64 {
	let correct = data.iter()
	    .filter( |(transaction, label)| self.predict( transaction ) == *label )
	    .count();
	correct as f64 / data.len() as f64
    }

    /// Normal approximation of a central interval for the probability of label in bucket
    pub fn confidence_interval( &self, bucket: usize, label: Label, width: f64 ) -> Result<(f64, f64)> {
	if !( width > 0.0 && width < 1.0 ) {
	    return Err( BrlError::config( "confidence width", format!( "must lie in (0, 1), got {width}" )));
	}
	let parameters = self.posterior_parameters( bucket );
	let total: f64 = parameters.iter().sum();
	let value = parameters[ label ];

	let variance = value * ( total - value ) / ( total * total * ( total + 1.0 ));
	let standard_error = variance.sqrt() / total.sqrt();
	let mean = value / total;
	let normal = Normal::new( 0.0, 1.0 ).expect( "standard normal is valid" );
	let z = normal.inverse_cdf( 1.0 - ( 1.0 - width ) / 2.0 );
	Ok( (mean - z * standard_error, mean + z * standard_error) )
    }

    /// One summary per rule, default rule last
    pub fn summaries( &self ) -> Vec<RuleSummary> {
	let mut summaries: Vec<RuleSummary> = self.conditions.iter()
	    .enumerate()
	    .map( |(rule, condition)| RuleSummary{
		condition: Some( condition.clone() ),
		counts: self.counts.bucket( rule + 1 ).to_vec(),
		posterior_mean: self.posterior_mean( rule + 1 ),
	    })
	    .collect();
	summaries.push( RuleSummary{
	    condition: None,
	    counts: self.counts.bucket( 0 ).to_vec(),
	    posterior_mean: self.posterior_mean( 0 ),
	});
	summaries
    }
}

impl fmt::Display for FittedRuleList {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
	for (rule, summary) in self.summaries().iter().enumerate() {
	    let probabilities: Vec<String> = summary.posterior_mean.iter().map( |p| format!( "{p:.3}" )).collect();
	    let outcome = format!( "[{}] ({} samples)", probabilities.join( ", " ), summary.counts.iter().sum::<Count>() );
	    match &summary.condition {
		Some( condition ) if rule == 0 => writeln!( f, "If {condition} then {outcome}" )?,
		Some( condition ) => writeln!( f, "Else if {condition} then {outcome}" )?,
		None => writeln!( f, "Else {outcome}" )?,
	    }
	}
	Ok( () )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fitted() -> (FittedRuleList, Dataset) {
	let records = vec!(
	    vec!( "female", "first" ),
	    vec!( "female", "third" ),
	    vec!( "male", "first" ),
	    vec!( "male", "third" ),
	    vec!( "male", "third" ),
	    vec!( "female", "first" ),
	);
	let data = Dataset::from_records( &records, vec!( 1, 1, 0, 0, 0, 1 ), 2 ).unwrap();
	let female = data.vocabulary().get( 0, "female" ).unwrap();
	let pool = AntecedentPool::new( vec!( Antecedent::from_items( &[female], data.vocabulary() ).unwrap() ));
	let model = GenerativeModel::new( &ModelConfig::default() );
	(FittedRuleList::fit( &RuleList::new( vec!( 0 )), &pool, &data, &model ), data)
    }

    #[test]
    fn test_prediction() {
	let (fitted, data) = fitted();
	assert_eq!( fitted.len(), 1 );
	assert_eq!( fitted.counts().bucket( 1 ), &[0, 3] );
	assert_eq!( fitted.counts().bucket( 0 ), &[3, 0] );
	assert_eq!( fitted.posterior_mean( 1 ), vec!( 0.2, 0.8 ));
	assert_eq!( fitted.predict( &data.transactions()[0] ), 1 );
	assert_eq!( fitted.predict( &data.transactions()[2] ), 0 );
	assert_eq!( fitted.predict_proba( &data.transactions()[3] ), vec!( 0.8, 0.2 ));
	assert_eq!( fitted.accuracy( &data ), 1.0 );
    }

    #[test]
    fn test_confidence_interval() {
	let (fitted, _) = fitted();
	// parameters [1, 4]: variance 4 / (25 * 6), divided by sqrt(5) for the standard error
	let (low, high) = fitted.confidence_interval( 1, 1, 0.95 ).unwrap();
	let standard_error = ( 4.0f64 / 150.0 ).sqrt() / 5.0f64.sqrt();
	assert!( ( high - low - 2.0 * 1.959964 * standard_error ).abs() < 1e-5 );
	assert!( ( ( high + low ) / 2.0 - 0.8 ).abs() < 1e-12 );
	assert!( fitted.confidence_interval( 1, 1, 1.5 ).is_err() );
    }

    #[test]
    fn test_display() {
	let (fitted, _) = fitted();
	let text = fitted.to_string();
	let lines: Vec<&str> = text.lines().collect();
	assert_eq!( lines, vec!(
	    "If x0=female then [0.200, 0.800] (3 samples)",
	    "Else [0.800, 0.200] (3 samples)",
	));
    }
}
