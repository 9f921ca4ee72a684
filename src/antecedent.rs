use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::data::{Item, Vocabulary};
use crate::random::UniformSource;
use crate::{Loggable, log_at};

/// Equality test of one feature against an expected value
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize )]
pub struct Expression {
    feature: usize,
    value: Item,
}

/// Conjunction of expressions. Holds if all of them hold.
#[derive( Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize )]
pub struct Antecedent {
    expressions: Vec<Expression>,
}

/// Position of an antecedent in its pool
pub type AntecedentId = usize;

/// All mined antecedents, grouped by cardinality. Read-only once built.
#[derive( Debug, Clone, Default )]
pub struct AntecedentPool {
    antecedents: Vec<Antecedent>,
    by_cardinality: BTreeMap<usize, Vec<AntecedentId>>,
    index: FxHashMap<Antecedent, AntecedentId>,
}

impl Expression {
    pub fn new( feature: usize, value: Item ) -> Expression {
	Expression{ feature, value }
    }

    pub fn feature( &self ) -> usize { self.feature }
    pub fn value( &self ) -> Item { self.value }

    pub fn holds( &self, transaction: &[Item] ) -> bool {
	transaction.get( self.feature ) == Some( &self.value )
    }

    pub fn describe( &self, vocabulary: &Vocabulary ) -> String {
	format!( "{}={}", vocabulary.feature_name( self.feature ), vocabulary.value_of( self.value ))
    }
}

impl Antecedent {
    /// Returns None for an empty conjunction
    pub fn new( expressions: Vec<Expression> ) -> Option<Antecedent> {
	if expressions.is_empty() {
	    None
	} else {
	    Some( Antecedent{ expressions } )
	}
    }

    /// Creates the antecedent testing for all items, ordered by feature
    pub fn from_items( items: &[Item], vocabulary: &Vocabulary ) -> Option<Antecedent> {
	let mut expressions: Vec<Expression> = items.iter()
	    .map( |item| Expression::new( vocabulary.feature_of( *item ), *item ))
	    .collect();
	expressions.sort();
	Antecedent::new( expressions )
    }

    pub fn len( &self ) -> usize { self.expressions.len() }

    /// Never true, antecedents have at least one expression
    pub fn is_empty( &self ) -> bool { self.expressions.is_empty() }

    pub fn expressions( &self ) -> &[Expression] { &self.expressions }

    pub fn holds( &self, transaction: &[Item] ) -> bool {
	self.expressions.iter().all( |expression| expression.holds( transaction ))
    }

    pub fn describe( &self, vocabulary: &Vocabulary ) -> String {
	self.expressions.iter()
	    .map( |expression| expression.describe( vocabulary ))
	    .collect::<Vec<String>>()
	    .join( " and " )
    }
}

impl AntecedentPool {

    /// Collects the antecedents, dropping repeated ones
    pub fn new<I: IntoIterator<Item = Antecedent>>( antecedents: I ) -> AntecedentPool {
	let mut pool = AntecedentPool::default();
	for antecedent in antecedents {
	    if pool.index.contains_key( &antecedent ) {
		continue;
	    }
	    let id = pool.antecedents.len();
	    pool.by_cardinality.entry( antecedent.len() ).or_default().push( id );
	    pool.index.insert( antecedent.clone(), id );
	    pool.antecedents.push( antecedent );
	}
	pool
    }

    pub fn len( &self ) -> usize { self.antecedents.len() }
    pub fn is_empty( &self ) -> bool { self.antecedents.is_empty() }

    pub fn get( &self, id: AntecedentId ) -> &Antecedent { &self.antecedents[ id ] }

    pub fn id_of( &self, antecedent: &Antecedent ) -> Option<AntecedentId> {
	self.index.get( antecedent ).copied()
    }

    pub fn cardinality_of( &self, id: AntecedentId ) -> usize { self.antecedents[ id ].len() }

    /// Cardinalities with at least one antecedent, ascending
    pub fn cardinalities( &self ) -> impl Iterator<Item = usize> + '_ {
	self.by_cardinality.keys().copied()
    }

    pub fn count_with_cardinality( &self, cardinality: usize ) -> usize {
	self.by_cardinality.get( &cardinality ).map_or( 0, |ids| ids.len() )
    }

    pub fn with_cardinality( &self, cardinality: usize ) -> &[AntecedentId] {
	self.by_cardinality.get( &cardinality ).map_or( &[], |ids| ids.as_slice() )
    }

    /// Draws uniformly among the antecedents not in excluded with a single draw.
    /// None if every antecedent is excluded.
    pub fn draw<S: UniformSource + ?Sized>( &self, source: &mut S, excluded: &[AntecedentId] ) -> Option<AntecedentId> {
	let candidates: Vec<AntecedentId> = ( 0 .. self.len() ).filter( |id| !excluded.contains( id )).collect();
	if candidates.is_empty() {
	    return None;
	}
	Some( candidates[ source.index( candidates.len() )] )
    }

    pub fn iter( &self ) -> impl Iterator<Item = (AntecedentId, &Antecedent)> + '_ {
	self.antecedents.iter().enumerate()
    }
}

impl Loggable for AntecedentPool {
    fn log( &self, message: &str, level: Level ) {
	let histogram: Vec<String> = self.by_cardinality.iter()
	    .map( |(cardinality, ids)| format!( "{cardinality}: {}", ids.len() ))
	    .collect();
	log_at( level, &format!( "{message}: {} antecedents by cardinality [{}]", self.len(), histogram.join( ", " )));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::random::ScriptedSource;

    fn antecedent( pairs: &[(usize, Item)] ) -> Antecedent {
	Antecedent::new( pairs.iter().map( |(f, v)| Expression::new( *f, *v )).collect() ).unwrap()
    }

    #[test]
    fn test_evaluation() {
	let transaction = vec!( 0, 3, 5 );
	assert!( antecedent( &[(1, 3)] ).holds( &transaction ));
	assert!( antecedent( &[(0, 0), (2, 5)] ).holds( &transaction ));
	assert!( !antecedent( &[(0, 0), (2, 4)] ).holds( &transaction ));
	// features outside the transaction never hold
	assert!( !antecedent( &[(7, 0)] ).holds( &transaction ));
	assert!( Antecedent::new( vec!() ).is_none() );
    }

    #[test]
    fn test_equality_respects_order() {
	let left = antecedent( &[(0, 1), (1, 2)] );
	let right = antecedent( &[(1, 2), (0, 1)] );
	assert_ne!( left, right );
	assert_eq!( left, antecedent( &[(0, 1), (1, 2)] ));
    }

    #[test]
    fn test_pool_groups() {
	let pool = AntecedentPool::new( vec!(
	    antecedent( &[(0, 1)] ),
	    antecedent( &[(0, 1), (1, 2)] ),
	    antecedent( &[(1, 2)] ),
	    antecedent( &[(0, 1)] ), // duplicate
	));
	assert_eq!( pool.len(), 3 );
	assert_eq!( pool.cardinalities().collect::<Vec<usize>>(), vec!( 1, 2 ));
	assert_eq!( pool.count_with_cardinality( 1 ), 2 );
	assert_eq!( pool.count_with_cardinality( 3 ), 0 );
	assert_eq!( pool.with_cardinality( 2 ), &[1] );
	assert_eq!( pool.id_of( &antecedent( &[(1, 2)] )), Some( 2 ));
    }

    #[test]
    fn test_draw() {
	let pool = AntecedentPool::new( vec!(
	    antecedent( &[(0, 1)] ),
	    antecedent( &[(0, 1), (1, 2)] ),
	    antecedent( &[(1, 2)] ),
	    antecedent( &[(1, 3)] ),
	));
	let mut source = ScriptedSource::new( vec!( 0.0, 0.5, 0.99, 0.0, 0.99 ));
	assert_eq!( pool.draw( &mut source, &[] ), Some( 0 ));
	assert_eq!( pool.draw( &mut source, &[] ), Some( 2 ));
	assert_eq!( pool.draw( &mut source, &[] ), Some( 3 ));
	// candidates 1 and 3 remain
	assert_eq!( pool.draw( &mut source, &[2, 0] ), Some( 1 ));
	assert_eq!( pool.draw( &mut source, &[2, 0] ), Some( 3 ));
	assert_eq!( source.consumed(), 5 );

	// nothing left to draw, no draw consumed
	assert_eq!( pool.draw( &mut source, &[0, 1, 2, 3] ), None );
	assert_eq!( source.consumed(), 5 );
    }

    #[test]
    fn test_describe() {
	let mut vocabulary = Vocabulary::with_feature_names( vec!( "sex".to_string(), "class".to_string() ));
	let female = vocabulary.intern( 0, "female" );
	let first = vocabulary.intern( 1, "first" );
	let rule = Antecedent::from_items( &[first, female], &vocabulary ).unwrap();
	assert_eq!( rule.describe( &vocabulary ), "sex=female and class=first" );
    }
}
