use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::*;

use crate::*;

pub mod convergence;
pub mod initial;
pub mod proposal;

pub use convergence::GelmanRubin;
pub use initial::sample_default_list;
pub use proposal::{propose, Proposal, ProposalKind};

/// Proposal and acceptance counts per move type
#[derive( Debug, Clone, Default, PartialEq, Eq, Serialize )]
pub struct MoveStats {
    pub proposed: [usize; 3],
    pub accepted: [usize; 3],
    /// steps without any applicable move
    pub stuck: usize,
}

impl MoveStats {
    fn record( &mut self, outcome: &StepOutcome ) {
	match outcome.kind {
	    Some( kind ) => {
		self.proposed[ kind.index() ] += 1;
		if outcome.accepted {
		    self.accepted[ kind.index() ] += 1;
		}
	    }
	    None => self.stuck += 1,
	}
    }

    fn merge( &mut self, other: &MoveStats ) {
	for kind in 0 .. 3 {
	    self.proposed[ kind ] += other.proposed[ kind ];
	    self.accepted[ kind ] += other.accepted[ kind ];
	}
	self.stuck += other.stuck;
    }

    pub fn acceptance_rate( &self, kind: ProposalKind ) -> Option<f64> {
	let proposed = self.proposed[ kind.index() ];
	( proposed > 0 ).then( || self.accepted[ kind.index() ] as f64 / proposed as f64 )
    }
}

#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct StepOutcome {
    /// None if the chain could not move
    pub kind: Option<ProposalKind>,
    pub accepted: bool,
}

/// min(1, ratio * exp(proposed - current)) computed in log space
pub fn acceptance_threshold( ratio: f64, proposed: f64, current: f64 ) -> f64 {
    ( ratio.ln() + proposed - current ).exp().min( 1.0 )
}

/// One Metropolis-Hastings chain over rule lists
#[derive( Debug, Clone )]
pub struct Chain<S> {
    current: RuleList,
    score: f64,
    source: S,
    samples: Vec<RuleList>,
    scores: Vec<f64>,
    stats: MoveStats,
}

impl <S: UniformSource> Chain<S> {
    pub fn new( initial: RuleList, source: S, model: &GenerativeModel, pool: &AntecedentPool, data: &Dataset ) -> Chain<S> {
	let score = model.log_posterior( &initial, pool, data );
	Chain{
	    current: initial,
	    score,
	    source,
	    samples: Vec::new(),
	    scores: Vec::new(),
	    stats: MoveStats::default(),
	}
    }

    /// Starts from a list drawn from the prior
    pub fn start( mut source: S, model: &GenerativeModel, pool: &AntecedentPool, data: &Dataset ) -> Result<Chain<S>> {
	let initial = sample_default_list( model, pool, &mut source )?;
	initial.log( "Initial rule list", Level::DEBUG );
	Ok( Chain::new( initial, source, model, pool, data ))
    }

    pub fn current( &self ) -> &RuleList { &self.current }
    pub fn score( &self ) -> f64 { self.score }
    pub fn samples( &self ) -> &[RuleList] { &self.samples }
    pub fn stats( &self ) -> &MoveStats { &self.stats }

    pub fn step( &mut self, model: &GenerativeModel, pool: &AntecedentPool, data: &Dataset ) -> StepOutcome {
	let outcome = match propose( &self.current, pool, &mut self.source ) {
	    None => StepOutcome{ kind: None, accepted: false },
	    Some( Proposal{ kind, candidate, ratio } ) => {
		let candidate_score = model.log_posterior( &candidate, pool, data );
		let threshold = acceptance_threshold( ratio, candidate_score, self.score );
		let accepted = self.source.uniform() < threshold;
		trace!( "{kind:?} to {:?}: {candidate_score:.3} against {:.3}, accepted {accepted}", candidate.rules(), self.score );
		if accepted {
		    self.current = candidate;
		    self.score = candidate_score;
		}
		StepOutcome{ kind: Some( kind ), accepted }
	    }
	};
	self.stats.record( &outcome );
	outcome
    }

    /// Keeps the current state as a posterior sample
    pub fn record( &mut self ) {
	self.samples.push( self.current.clone() );
	self.scores.push( self.score );
    }
}

/// Summary of a sampler run
#[derive( Debug, Clone, Default, Serialize )]
pub struct Diagnostics {
    pub iterations: usize,
    pub converged: bool,
    /// stopped early by the cancel flag or the time limit
    pub cancelled: bool,
    /// potential scale reduction after every recorded iteration where it is defined
    pub r_hat_history: Vec<f64>,
    pub moves: MoveStats,
    pub elapsed_secs: f64,
}

/// Post burn-in samples of every chain with their log posteriors
#[derive( Debug, Clone )]
pub struct SamplerRun {
    samples: Vec<Vec<RuleList>>,
    scores: Vec<Vec<f64>>,
    diagnostics: Diagnostics,
}

impl SamplerRun {
    pub fn chains( &self ) -> &[Vec<RuleList>] { &self.samples }
    pub fn scores( &self ) -> &[Vec<f64>] { &self.scores }
    pub fn diagnostics( &self ) -> &Diagnostics { &self.diagnostics }

    /// Samples of all chains, chain after chain
    pub fn samples( &self ) -> impl Iterator<Item = (&RuleList, f64)> + '_ {
	self.samples.iter().zip( &self.scores )
	    .flat_map( |(lists, scores)| lists.iter().zip( scores.iter().copied() ))
    }

    pub fn num_samples( &self ) -> usize {
	self.samples.iter().map( |lists| lists.len() ).sum()
    }
}

/// Runs parallel chains until the Gelman-Rubin diagnostic signals convergence
#[derive( Debug, Clone )]
pub struct Sampler {
    model: GenerativeModel,
    config: SamplerConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl Sampler {
    pub fn new( model: GenerativeModel, config: SamplerConfig ) -> Sampler {
	Sampler{ model, config, cancel: None }
    }

    /// The run stops before the next iteration once flag is set
    pub fn with_cancel_flag( mut self, flag: Arc<AtomicBool> ) -> Sampler {
	self.cancel = Some( flag );
	self
    }

    pub fn model( &self ) -> &GenerativeModel { &self.model }

    /// Chain i draws from a generator seeded with seed + i, or from entropy without a seed
    pub fn run( &self, pool: &AntecedentPool, data: &Dataset ) -> Result<SamplerRun> {
	let sources = ( 0 .. self.config.num_chains as u64 )
	    .map( |i| match self.config.seed {
		Some( seed ) => RngSource::seeded( seed.wrapping_add( i )),
		None => RngSource::from_entropy(),
	    })
	    .collect();
	self.run_with_sources( pool, data, sources )
    }

    pub fn run_with_sources<S: UniformSource + Send>( &self, pool: &AntecedentPool, data: &Dataset, sources: Vec<S> ) -> Result<SamplerRun> {
	let sampling_span = info_span!( "sampling", chains = sources.len() );
	let _guard = sampling_span.enter();

	self.config.validate()?;
	if pool.is_empty() {
	    return Err( BrlError::EmptyPool );
	}
	if sources.is_empty() {
	    return Err( BrlError::config( "num_chains", "must be at least 1" ));
	}

	let start = Instant::now();
	let deadline = self.config.time_limit_secs.map( |secs| start + Duration::from_secs_f64( secs ));
	let mut chains = sources.into_iter()
	    .map( |source| Chain::start( source, &self.model, pool, data ))
	    .collect::<Result<Vec<Chain<S>>>>()?;
	let mut diagnostic = GelmanRubin::new( chains.len() );
	let mut diagnostics = Diagnostics::default();

	loop {
	    if self.cancel.as_ref().is_some_and( |flag| flag.load( Ordering::Relaxed ))
		|| deadline.is_some_and( |deadline| Instant::now() >= deadline ) {
		info!( "Sampling cancelled after {} iterations", diagnostics.iterations );
		diagnostics.cancelled = true;
		break;
	    }
	    if self.config.max_iterations.is_some_and( |max| diagnostics.iterations >= max ) {
		info!( "Sampling stopped at the iteration limit without convergence" );
		break;
	    }

	    chains.par_iter_mut().for_each( |chain| {
		chain.step( &self.model, pool, data );
	    });
	    diagnostics.iterations += 1;

	    if diagnostics.iterations > self.config.burn_in {
		for chain in chains.iter_mut() {
		    chain.record();
		}
		let scores: Vec<f64> = chains.iter().map( |chain| chain.score() ).collect();
		diagnostic.update( &scores );
		if let Some( r_hat ) = diagnostic.potential_scale_reduction() {
		    diagnostics.r_hat_history.push( r_hat );
		    if r_hat < self.config.convergence_threshold && diagnostics.iterations >= self.config.min_iterations {
			diagnostics.converged = true;
			info!( "Converged after {} iterations with R-hat {r_hat:.4}", diagnostics.iterations );
			break;
		    }
		}
	    }

	    if diagnostics.iterations % 100 == 0 {
		debug!( "Iteration {}: R-hat {:?}, log posteriors {:?}",
			 diagnostics.iterations,
			 diagnostics.r_hat_history.last(),
			 chains.iter().map( |chain| chain.score() ).collect::<Vec<f64>>() );
	    }
	}

	let mut samples = Vec::with_capacity( chains.len() );
	let mut scores = Vec::with_capacity( chains.len() );
	for chain in chains {
	    diagnostics.moves.merge( &chain.stats );
	    samples.push( chain.samples );
	    scores.push( chain.scores );
	}
	diagnostics.elapsed_secs = start.elapsed().as_secs_f64();
	info!( "Sampled {} iterations in {:.2}s, {} lists kept per chain", diagnostics.iterations, diagnostics.elapsed_secs, diagnostic.samples() );

	Ok( SamplerRun{ samples, scores, diagnostics } )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::random::ScriptedSource;

    fn four_values() -> (AntecedentPool, Dataset) {
	let records = vec!( vec!( "a" ), vec!( "b" ), vec!( "c" ), vec!( "d" ), vec!( "a" ), vec!( "c" ));
	let data = Dataset::from_records( &records, vec!( 1, 0, 1, 0, 1, 0 ), 2 ).unwrap();
	let pool = AntecedentPool::new( ( 0 .. 4 ).map( |item| Antecedent::from_items( &[item], data.vocabulary() ).unwrap() ));
	(pool, data)
    }

    fn model() -> GenerativeModel {
	GenerativeModel::new( &ModelConfig::default() )
    }

    fn small_config() -> SamplerConfig {
	SamplerConfig{
	    num_chains: 2,
	    burn_in: 10,
	    min_iterations: 40,
	    max_iterations: Some( 150 ),
	    convergence_threshold: 1.05,
	    seed: Some( 17 ),
	    time_limit_secs: None,
	}
    }

    #[test]
    fn test_acceptance_threshold() {
	assert_eq!( acceptance_threshold( 1.0, -2.0, -3.0 ), 1.0 );
	assert!( ( acceptance_threshold( 1.0, -3.0, -2.0 ) - ( -1.0f64 ).exp() ).abs() < 1e-12 );
	assert!( ( acceptance_threshold( 0.5, -2.0, -2.0 ) - 0.5 ).abs() < 1e-12 );
    }

    #[test]
    fn test_scripted_trace() {
	let (pool, data) = four_values();
	let model = model();
	let source = ScriptedSource::new( vec!(
	    0.9, 0.5, 0.9, 0.0,
	    0.1, 0.2, 0.7, 1.0,
	    0.5, 0.1, 0.0,
	    0.1, 0.4, 0.8, 0.0, 0.0, 1.0,
	    0.7, 0.99, 0.6, 0.0,
	    0.95, 0.6, 0.5, 0.0,
	    0.2, 0.5, 0.5, 0.0, 0.9, 0.0,
	    0.9, 0.3, 0.99, 0.0,
	    0.8, 0.6, 0.3, 1.0,
	    0.5, 0.74, 0.0,
	));
	let mut chain = Chain::new( RuleList::new( vec!( 0 )), source, &model, &pool, &data );

	use ProposalKind::*;
	let expected: Vec<(ProposalKind, bool, Vec<AntecedentId>)> = vec!(
	    (Add, true, vec!( 0, 2 )),
	    (Move, false, vec!( 0, 2 )),
	    (Remove, true, vec!( 2 )),
	    (Add, false, vec!( 2 )),
	    (Add, true, vec!( 2, 3 )),
	    (Add, true, vec!( 2, 1, 3 )),
	    (Move, true, vec!( 1, 3, 2 )),
	    (Add, true, vec!( 1, 3, 2, 0 )),
	    (Remove, false, vec!( 1, 3, 2, 0 )),
	    (Remove, true, vec!( 1, 3, 0 )),
	);
	for (kind, accepted, rules) in expected {
	    let outcome = chain.step( &model, &pool, &data );
	    assert_eq!( outcome, StepOutcome{ kind: Some( kind ), accepted } );
	    assert_eq!( chain.current().rules(), rules.as_slice() );
	    let rescored = model.log_posterior( chain.current(), &pool, &data );
	    assert!( ( chain.score() - rescored ).abs() < 1e-9 );
	}
	assert_eq!( chain.source.consumed(), 42 );
	assert_eq!( chain.stats().proposed, [2, 3, 5] );
	assert_eq!( chain.stats().accepted, [1, 2, 4] );
    }

    #[test]
    fn test_seeded_runs_repeat() {
	let (pool, data) = four_values();
	let sampler = Sampler::new( model(), small_config() );
	let first = sampler.run( &pool, &data ).unwrap();
	let second = sampler.run( &pool, &data ).unwrap();

	let diagnostics = first.diagnostics();
	assert!( diagnostics.iterations <= 150 );
	assert!( !diagnostics.cancelled );
	assert_eq!( first.chains(), second.chains() );
	assert_eq!( first.scores(), second.scores() );
	assert_eq!( diagnostics.iterations, second.diagnostics().iterations );

	for lists in first.chains() {
	    assert_eq!( lists.len(), diagnostics.iterations - 10 );
	}
	if diagnostics.converged {
	    assert!( diagnostics.iterations >= 40 );
	    assert!( *diagnostics.r_hat_history.last().unwrap() < 1.05 );
	}
	for (list, score) in first.samples() {
	    assert!( ( model().log_posterior( list, &pool, &data ) - score ).abs() < 1e-9 );
	}
	let proposed: usize = diagnostics.moves.proposed.iter().sum();
	assert_eq!( proposed + diagnostics.moves.stuck, 2 * diagnostics.iterations );
    }

    #[test]
    fn test_cancelled_before_start() {
	let (pool, data) = four_values();
	let flag = Arc::new( AtomicBool::new( true ));
	let sampler = Sampler::new( model(), small_config() ).with_cancel_flag( flag );
	let run = sampler.run( &pool, &data ).unwrap();
	assert!( run.diagnostics().cancelled );
	assert!( !run.diagnostics().converged );
	assert_eq!( run.diagnostics().iterations, 0 );
	assert_eq!( run.num_samples(), 0 );
    }

    #[test]
    fn test_time_limit() {
	let (pool, data) = four_values();
	let config = SamplerConfig{ max_iterations: None, time_limit_secs: Some( 1e-9 ), ..small_config() };
	let run = Sampler::new( model(), config ).run( &pool, &data ).unwrap();
	assert!( run.diagnostics().cancelled );
	assert!( !run.diagnostics().converged );
	assert_eq!( run.diagnostics().iterations, 0 );
    }

    #[test]
    fn test_invalid_time_limit() {
	let (pool, data) = four_values();
	for limit in [-1.0, f64::NAN] {
	    let config = SamplerConfig{ time_limit_secs: Some( limit ), ..small_config() };
	    let result = Sampler::new( model(), config ).run( &pool, &data );
	    assert!( matches!( result, Err( BrlError::InvalidConfig{ parameter: "time_limit_secs", .. } )));
	}
    }

    #[test]
    fn test_stuck_chains_do_not_converge() {
	let records = vec!( vec!( "a" ), vec!( "a" ));
	let data = Dataset::from_records( &records, vec!( 0, 1 ), 2 ).unwrap();
	let pool = AntecedentPool::new( vec!( Antecedent::from_items( &[0], data.vocabulary() ).unwrap() ));
	let config = SamplerConfig{ burn_in: 0, min_iterations: 0, max_iterations: Some( 30 ), ..small_config() };
	let run = Sampler::new( model(), config ).run( &pool, &data ).unwrap();

	let diagnostics = run.diagnostics();
	assert!( !diagnostics.converged );
	assert_eq!( diagnostics.iterations, 30 );
	assert!( diagnostics.r_hat_history.is_empty() );
	assert_eq!( diagnostics.moves.stuck, 60 );
	assert_eq!( run.num_samples(), 60 );
    }

    #[test]
    fn test_empty_pool() {
	let (_, data) = four_values();
	let sampler = Sampler::new( model(), small_config() );
	assert!( matches!( sampler.run( &AntecedentPool::new( Vec::new() ), &data ), Err( BrlError::EmptyPool )));
    }
}
