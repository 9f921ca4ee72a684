use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform variates in [0, 1).
/// Every random decision of the miner and sampler is derived from these draws.
pub trait UniformSource {
    fn uniform( &mut self ) -> f64;

    /// Draws an index uniformly from 0 .. n.
    /// Pre: n > 0
    fn index( &mut self, n: usize ) -> usize {
	debug_assert!( n > 0 );
	let i = ( self.uniform() * n as f64 ) as usize;
	i.min( n - 1 )
    }
}

impl <S: UniformSource + ?Sized> UniformSource for &mut S {
    fn uniform( &mut self ) -> f64 { (**self).uniform() }
}

/// Draws uniforms from a `rand` generator
#[derive( Debug, Clone )]
pub struct RngSource<R = StdRng> {
    rng: R,
}

impl RngSource<StdRng> {
    pub fn seeded( seed: u64 ) -> RngSource<StdRng> {
	RngSource{ rng: StdRng::seed_from_u64( seed ) }
    }

    pub fn from_entropy() -> RngSource<StdRng> {
	RngSource{ rng: StdRng::from_entropy() }
    }
}

impl <R: Rng> RngSource<R> {
    pub fn new( rng: R ) -> RngSource<R> {
	RngSource{ rng }
    }
}

impl <R: Rng> UniformSource for RngSource<R> {
    fn uniform( &mut self ) -> f64 {
	self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence of draws. Used to pin down exact sampler traces in tests.
#[cfg(test)]
#[derive( Debug, Clone )]
pub(crate) struct ScriptedSource {
    draws: Vec<f64>,
    position: usize,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new( draws: Vec<f64> ) -> ScriptedSource {
	ScriptedSource{ draws, position: 0 }
    }

    pub fn consumed( &self ) -> usize { self.position }
}

#[cfg(test)]
impl UniformSource for ScriptedSource {
    fn uniform( &mut self ) -> f64 {
	let draw = *self.draws.get( self.position ).expect( "script has enough draws" );
	self.position += 1;
	draw
    }
}
