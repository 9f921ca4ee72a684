/// Running mean and variance of one chain
#[derive( Debug, Clone, Default )]
struct Moments {
    count: usize,
    mean: f64,
    /// sum of squared deviations from the mean
    squares: f64,
}

impl Moments {
    fn update( &mut self, value: f64 ) {
	self.count += 1;
	let delta = value - self.mean;
	self.mean += delta / self.count as f64;
	self.squares += delta * ( value - self.mean );
    }

    /// Sample variance. Pre: count > 1
    fn variance( &self ) -> f64 {
	self.squares / ( self.count - 1 ) as f64
    }
}

/// Gelman-Rubin potential scale reduction over the log posteriors of parallel chains.
/// Every chain receives one value per update.
#[derive( Debug, Clone )]
pub struct GelmanRubin {
    chains: Vec<Moments>,
}

impl GelmanRubin {
    pub fn new( num_chains: usize ) -> GelmanRubin {
	GelmanRubin{ chains: vec!( Moments::default(); num_chains ) }
    }

    /// Pre: one value per chain
    pub fn update( &mut self, values: &[f64] ) {
	debug_assert_eq!( values.len(), self.chains.len() );
	for (chain, value) in self.chains.iter_mut().zip( values ) {
	    chain.update( *value );
	}
    }

    /// Values recorded per chain
    pub fn samples( &self ) -> usize {
	self.chains.first().map_or( 0, |chain| chain.count )
    }

    /// None while fewer than two values per chain are recorded, or while the chains have no
    /// within-chain variance
    pub fn potential_scale_reduction( &self ) -> Option<f64> {
	let n = self.samples();
	let k = self.chains.len();
	if n < 2 || k == 0 {
	    return None;
	}
	let n_f = n as f64;
	let k_f = k as f64;

	let within = self.chains.iter().map( |chain| chain.variance() ).sum::<f64>() / k_f;
	if !( within > 0.0 ) {
	    return None;
	}

	let grand_mean = self.chains.iter().map( |chain| chain.mean ).sum::<f64>() / k_f;
	let between = if k > 1 {
	    n_f / ( k_f - 1.0 ) * self.chains.iter().map( |chain| ( chain.mean - grand_mean ).powi( 2 )).sum::<f64>()
	} else {
	    0.0
	};

	let pooled = ( n_f - 1.0 ) / n_f * within + ( k_f + 1.0 ) / ( k_f * n_f ) * between;
	let r_hat = pooled / within;
	r_hat.is_finite().then_some( r_hat )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! assert_approx {
	($real:expr, $expected:expr, $delta:expr) => {
	    if $real < $expected - $delta || $real > $expected + $delta {
		panic!( "Violate {:.4} == {:.4} (+-{:.4})", $real, $expected, $delta );
	    }
	}
    }

    #[test]
    fn test_constant_chains_never_converge() {
	let mut diagnostic = GelmanRubin::new( 3 );
	assert_eq!( diagnostic.potential_scale_reduction(), None );
	for _ in 0 .. 10 {
	    diagnostic.update( &[-4.0, -4.0, -4.0] );
	}
	assert_eq!( diagnostic.samples(), 10 );
	assert_eq!( diagnostic.potential_scale_reduction(), None );
    }

    #[test]
    fn test_shifted_chains() {
	let mut diagnostic = GelmanRubin::new( 3 );
	for step in 0 .. 3 {
	    let base = step as f64;
	    diagnostic.update( &[base + 1.0, base + 2.0, base + 3.0] );
	}
	/* means 2, 3, 4, variances 1
	   B = 3 / 2 * 2 = 3, V = 2/3 + 4/9 * 3 = 2
	*/
	assert_approx!( diagnostic.potential_scale_reduction().unwrap(), 2.0, 1e-9 );
    }

    #[test]
    fn test_single_chain() {
	let mut diagnostic = GelmanRubin::new( 1 );
	for value in [1.0, 3.0, 2.0, 4.0] {
	    diagnostic.update( &[value] );
	}
	// without between-chain variance only the (n - 1) / n shrinkage remains
	assert_approx!( diagnostic.potential_scale_reduction().unwrap(), 0.75, 1e-9 );
    }

    #[test]
    fn test_running_moments() {
	let mut moments = Moments::default();
	for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
	    moments.update( value );
	}
	assert_approx!( moments.mean, 5.0, 1e-9 );
	assert_approx!( moments.variance(), 32.0 / 7.0, 1e-9 );
    }
}
