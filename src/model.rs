use std::collections::BTreeMap;

use statrs::function::factorial::ln_factorial;
use statrs::function::gamma::ln_gamma;

use crate::*;

mod likelihood;
mod posterior;

pub use likelihood::BucketCounts;
pub use posterior::{FittedRuleList, RuleSummary};

/// The untruncated length prior replaces the exact one once the pool is this many times longer than the list.
pub const APPROXIMATION_FACTOR: usize = 10;

/// Generative model of rule lists and labels.
/// All probabilities are handled as natural logarithms.
#[derive( Debug, Clone )]
pub struct GenerativeModel {
    /// Dirichlet prior over the label distribution of every rule
    alpha: Vec<f64>,
    /// Poisson parameter of the list length
    lambda: f64,
    /// Poisson parameter of the antecedent cardinality
    eta: f64,
}

impl GenerativeModel {
    pub fn new( config: &ModelConfig ) -> GenerativeModel {
	GenerativeModel{
	    alpha: config.alpha.clone(),
	    lambda: config.lambda,
	    eta: config.eta,
	}
    }

    pub fn alpha( &self ) -> &[f64] { &self.alpha }
    pub fn lambda( &self ) -> f64 { self.lambda }
    pub fn eta( &self ) -> f64 { self.eta }
    pub fn num_labels( &self ) -> usize { self.alpha.len() }

    /// log p(m | A, lambda): Poisson over the list length truncated to 1 ..= |A|
    pub fn log_p_m( &self, length: usize, pool: &AntecedentPool ) -> f64 {
	log_truncated_poisson( length, pool.len(), self.lambda )
    }

    /// p(m | A, lambda) for every m in 1 ..= |A|, sharing the normalizer between lengths
    pub fn length_probabilities( &self, pool: &AntecedentPool ) -> Vec<f64> {
	let upper = pool.len();
	let log_exact = log_truncation_normalizer( upper, self.lambda );
	let log_untruncated = self.lambda.exp_m1().ln();
	( 1 ..= upper )
	    .map( |m| {
		let log_normalizer = if upper >= APPROXIMATION_FACTOR * m { log_untruncated } else { log_exact };
		( log_poisson_weight( m, self.lambda ) - log_normalizer ).exp()
	    })
	    .collect()
    }

    /// log p(c | A, eta): every cardinality drawn from a Poisson truncated to the cardinalities in the pool
    pub fn log_p_c( &self, list: &RuleList, pool: &AntecedentPool ) -> f64 {
	let log_normalizer = log_sum_exp( pool.cardinalities().map( |k| log_poisson_weight( k, self.eta )));
	list.iter()
	    .map( |id| log_poisson_weight( pool.cardinality_of( id ), self.eta ) - log_normalizer )
	    .sum()
    }

    /// log p(a | c, A): antecedents drawn uniformly without replacement within their cardinality
    pub fn log_p_a( &self, list: &RuleList, pool: &AntecedentPool ) -> f64 {
	let mut chosen: BTreeMap<usize, usize> = BTreeMap::new();
	let mut logprob = 0.0;
	for id in list.iter() {
	    let cardinality = pool.cardinality_of( id );
	    let already = chosen.entry( cardinality ).or_insert( 0 );
	    let remaining = pool.count_with_cardinality( cardinality ) - *already;
	    logprob -= ( remaining as f64 ).ln();
	    *already += 1;
	}
	logprob
    }

    /// log p(d | A, lambda, eta)
    pub fn calc_logprior( &self, list: &RuleList, pool: &AntecedentPool ) -> f64 {
	self.log_p_m( list.len(), pool ) + self.log_p_c( list, pool ) + self.log_p_a( list, pool )
    }

    /// Counts the labels of the transactions captured by each rule
    pub fn cover( &self, list: &RuleList, pool: &AntecedentPool, data: &Dataset ) -> BucketCounts {
	let mut cover = BucketCounts::new( list.len() + 1, self.num_labels() );
	for (transaction, label) in data.iter() {
	    cover.add( list.first_match( pool, transaction ), label );
	}
	cover
    }

    /// Dirichlet-multinomial log likelihood of the covered labels, log p(y | x, d, alpha)
    pub fn calc_loglik( &self, cover: &BucketCounts ) -> f64 {
	let mut loglik = 0.0;
	for bucket in 0 .. cover.num_buckets() {
	    let mut total = 0.0;
	    for (count, alpha) in cover.bucket( bucket ).iter().zip( &self.alpha ) {
		let concentration = *count as f64 + alpha;
		loglik += ln_gamma( concentration );
		total += concentration;
	    }
	    loglik -= ln_gamma( total );
	}
	loglik
    }

    pub fn log_likelihood( &self, list: &RuleList, pool: &AntecedentPool, data: &Dataset ) -> f64 {
	self.calc_loglik( &self.cover( list, pool, data ))
    }

    /// Unnormalized log posterior log p(d | x, y, A, alpha, lambda, eta)
    pub fn log_posterior( &self, list: &RuleList, pool: &AntecedentPool, data: &Dataset ) -> f64 {
	self.calc_logprior( list, pool ) + self.log_likelihood( list, pool, data )
    }
}

/// log of lambda^k / k!
pub fn log_poisson_weight( k: usize, lambda: f64 ) -> f64 {
    k as f64 * lambda.ln() - ln_factorial( k as u64 )
}

/// Poisson log probability of m truncated to 1 ..= upper.
/// Uses the untruncated closed form when upper is large compared to m.
pub fn log_truncated_poisson( m: usize, upper: usize, lambda: f64 ) -> f64 {
    if upper >= APPROXIMATION_FACTOR * m {
	return log_poisson_weight( m, lambda ) - lambda.exp_m1().ln();
    }
    log_poisson_weight( m, lambda ) - log_truncation_normalizer( upper, lambda )
}

/// log of the sum of lambda^i / i! over 1 ..= upper
fn log_truncation_normalizer( upper: usize, lambda: f64 ) -> f64 {
    log_sum_exp( ( 1 ..= upper ).map( |i| log_poisson_weight( i, lambda )))
}

/// Stable log of the sum of exponentials. Empty input gives negative infinity.
pub fn log_sum_exp<I: IntoIterator<Item = f64>>( values: I ) -> f64 {
    let values: Vec<f64> = values.into_iter().collect();
    let max = values.iter().copied().fold( f64::NEG_INFINITY, f64::max );
    if max == f64::NEG_INFINITY {
	return max;
    }
    max + values.iter().map( |v| ( v - max ).exp() ).sum::<f64>().ln()
}
