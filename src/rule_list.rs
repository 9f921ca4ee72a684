use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::antecedent::{AntecedentId, AntecedentPool};
use crate::data::Item;
use crate::{Loggable, log_at};

/// Ordered list of distinct antecedents from a pool, followed by an implicit default rule.
/// Invariants: not empty, no antecedent occurs twice.
#[derive( Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize )]
pub struct RuleList {
    rules: Vec<AntecedentId>,
}

impl RuleList {
    /// Pre: rules is not empty and has no duplicates
    pub fn new( rules: Vec<AntecedentId> ) -> RuleList {
	debug_assert!( !rules.is_empty() );
	debug_assert!( rules.iter().enumerate().all( |(i, r)| !rules[ .. i ].contains( r )));
	RuleList{ rules }
    }

    pub fn len( &self ) -> usize { self.rules.len() }
    pub fn is_empty( &self ) -> bool { self.rules.is_empty() }

    pub fn get( &self, position: usize ) -> AntecedentId { self.rules[ position ] }

    pub fn rules( &self ) -> &[AntecedentId] { &self.rules }

    pub fn iter( &self ) -> impl Iterator<Item = AntecedentId> + '_ {
	self.rules.iter().copied()
    }

    pub fn contains( &self, antecedent: AntecedentId ) -> bool {
	self.rules.contains( &antecedent )
    }

    /// Takes the rule at from out and reinserts it at to
    pub fn move_rule( &mut self, from: usize, to: usize ) {
	let rule = self.rules.remove( from );
	self.rules.insert( to, rule );
    }

    pub fn remove_at( &mut self, position: usize ) -> AntecedentId {
	self.rules.remove( position )
    }

    /// Pre: antecedent is not in the list
    pub fn insert_at( &mut self, position: usize, antecedent: AntecedentId ) {
	debug_assert!( !self.contains( antecedent ));
	self.rules.insert( position, antecedent );
    }

    /// Bucket of the transaction: 1 + position of the first rule that holds, 0 if none holds
    pub fn first_match( &self, pool: &AntecedentPool, transaction: &[Item] ) -> usize {
	self.rules.iter()
	    .position( |id| pool.get( *id ).holds( transaction ))
	    .map_or( 0, |position| position + 1 )
    }

    pub fn average_cardinality( &self, pool: &AntecedentPool ) -> f64 {
	let total: usize = self.rules.iter().map( |id| pool.cardinality_of( *id )).sum();
	total as f64 / self.rules.len() as f64
    }
}

impl Loggable for RuleList {
    fn log( &self, message: &str, level: Level ) {
	log_at( level, &format!( "{message}: {:?}", self.rules ));
    }
}
