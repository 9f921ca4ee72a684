use serde::{Deserialize, Serialize};

use crate::*;

/// The three ways a rule list is perturbed
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize )]
pub enum ProposalKind {
    /// Reposition one rule
    Move,
    Remove,
    /// Insert an antecedent from the pool that is not yet in the list
    Add,
}

impl ProposalKind {
    pub const ALL: [ProposalKind; 3] = [ProposalKind::Move, ProposalKind::Remove, ProposalKind::Add];

    pub fn index( &self ) -> usize {
	match self {
	    ProposalKind::Move => 0,
	    ProposalKind::Remove => 1,
	    ProposalKind::Add => 2,
	}
    }

    fn applicable( &self, length: usize, pool_size: usize ) -> bool {
	match self {
	    ProposalKind::Move | ProposalKind::Remove => length > 1,
	    ProposalKind::Add => length < pool_size,
	}
    }
}

/// Candidate state with the Hastings factor backward / forward of the move that produced it
#[derive( Debug, Clone )]
pub struct Proposal {
    pub kind: ProposalKind,
    pub candidate: RuleList,
    pub ratio: f64,
}

/// Draws a move type uniformly, redrawing inapplicable ones, and applies it to a copy of current.
/// None if no move applies, which happens only for a single rule taken from a pool of one.
pub fn propose<S: UniformSource + ?Sized>( current: &RuleList, pool: &AntecedentPool, source: &mut S ) -> Option<Proposal> {
    let length = current.len();
    let pool_size = pool.len();
    if !ProposalKind::ALL.iter().any( |kind| kind.applicable( length, pool_size )) {
	return None;
    }

    let kind = loop {
	let kind = ProposalKind::ALL[ source.index( ProposalKind::ALL.len() )];
	if kind.applicable( length, pool_size ) {
	    break kind;
	}
    };

    let mut candidate = current.clone();
    let ratio = match kind {
	ProposalKind::Move => {
	    let (from, to) = loop {
		let from = source.index( length );
		let to = source.index( length );
		if from != to {
		    break (from, to);
		}
	    };
	    candidate.move_rule( from, to );
	    1.0
	}
	ProposalKind::Remove => {
	    let position = source.index( length );
	    candidate.remove_at( position );
	    let forward = 1.0 / length as f64;
	    let backward = 1.0 / ( ( pool_size - candidate.len() ) as f64 * length as f64 );
	    backward / forward
	}
	ProposalKind::Add => {
	    let antecedent = pool.draw( source, current.rules() )?;
	    let position = source.index( length + 1 );
	    candidate.insert_at( position, antecedent );
	    let forward = 1.0 / ( ( pool_size - length ) as f64 * candidate.len() as f64 );
	    let backward = 1.0 / candidate.len() as f64;
	    backward / forward
	}
    };
    Some( Proposal{ kind, candidate, ratio } )
}
