use tracing::*;

use crate::*;
use crate::data::pattern_tree::PatternTree;

/// Produces the candidate antecedents for the rule lists.
pub trait Miner {
    fn mine( &mut self, data: &Dataset ) -> Result<AntecedentPool>;
}

/// Frequent itemset mining by recursive conditional pattern trees.
#[derive( Debug, Clone )]
pub struct FpGrowthMiner {
    min_support: f64,
    max_antecedent_length: usize,
}

impl Miner for FpGrowthMiner {
    fn mine( &mut self, data: &Dataset ) -> Result<AntecedentPool> {
	let mining_span = info_span!( "mining", transactions = data.len() );
	let _guard = mining_span.enter();

	if data.is_empty() {
	    return Err( BrlError::EmptyDataset );
	}

	let tree = PatternTree::build( data.transactions(), self.min_support );
	debug!( "Pattern tree holds {} frequent items", tree.num_items() );

	let mut itemsets: Vec<Vec<Item>> = Vec::new();
	self.find_itemsets( &tree, &[], data.len() as Count, &mut itemsets );

	let vocabulary = data.vocabulary();
	let antecedents = itemsets.iter()
	    .filter_map( |items| Antecedent::from_items( items, vocabulary ));
	let pool = AntecedentPool::new( antecedents );
	if pool.is_empty() {
	    return Err( BrlError::NothingFrequent{ min_support: self.min_support } );
	}

	pool.log( "Mined", Level::INFO );
	Ok( pool )
    }
}

impl FpGrowthMiner {
    pub fn new( config: &MiningConfig ) -> FpGrowthMiner {
	FpGrowthMiner{
	    min_support: config.min_support,
	    max_antecedent_length: config.max_antecedent_length,
	}
    }

    /// Appends to output every frequent itemset that extends suffix within this tree.
    /// Items are tried least frequent first, and every itemset precedes its extensions.
    pub fn find_itemsets( &self, tree: &PatternTree, suffix: &[Item], total_transactions: Count, output: &mut Vec<Vec<Item>> ) {
	for item in tree.items_ascending() {
	    let support = tree.item_count( item ) as f64 / total_transactions as f64;
	    if support < self.min_support || suffix.contains( &item ) {
		continue;
	    }

	    let mut itemset = Vec::with_capacity( suffix.len() + 1 );
	    itemset.push( item );
	    itemset.extend_from_slice( suffix );
	    trace!( "Frequent itemset {itemset:?} with support {support:.3}" );

	    if itemset.len() <= self.max_antecedent_length {
		output.push( itemset.clone() );
	    }
	    // longer itemsets would exceed the maximum anyway
	    if itemset.len() < self.max_antecedent_length {
		let conditional = tree.conditional_tree( item );
		if !conditional.is_empty() {
		    self.find_itemsets( &conditional, &itemset, total_transactions, output );
		}
	    }
	}
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    /// Six transactions over the features A, B and C
    fn six_transactions() -> Dataset {
	let records = vec!(
	    vec!( "a1", "b1", "c1" ),
	    vec!( "a1", "b1", "c2" ),
	    vec!( "a1", "b2", "c1" ),
	    vec!( "a2", "b1", "c1" ),
	    vec!( "a1", "b1", "c1" ),
	    vec!( "a2", "b2", "c2" ),
	);
	Dataset::from_records( &records, vec!( 1, 1, 0, 0, 1, 0 ), 2 ).unwrap()
    }

    fn described( pool: &AntecedentPool, data: &Dataset ) -> HashSet<String> {
	pool.iter().map( |(_, a)| a.describe( data.vocabulary() )).collect()
    }

    fn support( antecedent: &Antecedent, data: &Dataset ) -> f64 {
	let holding = data.transactions().iter().filter( |t| antecedent.holds( t )).count();
	holding as f64 / data.len() as f64
    }

    #[test]
    fn test_hand_computed_itemsets() {
	let data = six_transactions();
	let config = MiningConfig{ min_support: 0.3, max_antecedent_length: 2 };
	let pool = FpGrowthMiner::new( &config ).mine( &data ).unwrap();

	/* supports
	   a1 4/6, a2 2/6, b1 4/6, b2 2/6, c1 4/6, c2 2/6
	   a1 b1 3/6, a1 c1 3/6, b1 c1 3/6
	   a2 b1 1/6, a1 b2 1/6, a2 c1 1/6, a1 c2 1/6, b1 c2 1/6, b2 c1 1/6, a2 b2 1/6, b2 c2 1/6, a2 c2 1/6
	   a1 b1 c1 2/6 is too long
	*/
	let expected: HashSet<String> = [
	    "x0=a1", "x0=a2", "x1=b1", "x1=b2", "x2=c1", "x2=c2",
	    "x0=a1 and x1=b1", "x0=a1 and x2=c1", "x1=b1 and x2=c1",
	].iter().map( |s| s.to_string() ).collect();
	assert_eq!( described( &pool, &data ), expected );
	assert_eq!( pool.count_with_cardinality( 1 ), 6 );
	assert_eq!( pool.count_with_cardinality( 2 ), 3 );
    }

    #[test]
    fn test_support_and_length_bounds() {
	let data = six_transactions();
	for (min_support, max_length) in [(0.2, 3), (0.3, 1), (0.5, 3), (0.15, 2)] {
	    let config = MiningConfig{ min_support, max_antecedent_length: max_length };
	    let pool = FpGrowthMiner::new( &config ).mine( &data ).unwrap();
	    for (_, antecedent) in pool.iter() {
		assert!( support( antecedent, &data ) >= min_support );
		assert!( antecedent.len() >= 1 && antecedent.len() <= max_length );
	    }
	}
    }

    #[test]
    fn test_matches_brute_force() {
	let data = six_transactions();
	let config = MiningConfig{ min_support: 0.3, max_antecedent_length: 3 };
	let pool = FpGrowthMiner::new( &config ).mine( &data ).unwrap();
	// a1 b1 c1 is frequent at 2/6
	assert_eq!( pool.count_with_cardinality( 3 ), 1 );
	assert_eq!( pool.len(), 10 );
    }

    #[test]
    fn test_itemsets_precede_their_extensions() {
	let data = six_transactions();
	let miner = FpGrowthMiner::new( &MiningConfig{ min_support: 0.3, max_antecedent_length: 3 } );
	let tree = PatternTree::build( data.transactions(), 0.3 );
	let mut itemsets: Vec<Vec<Item>> = Vec::new();
	miner.find_itemsets( &tree, &[], data.len() as Count, &mut itemsets );

	// the first itemset is a single item, found before anything is extended
	assert_eq!( itemsets[0].len(), 1 );
	for (position, itemset) in itemsets.iter().enumerate() {
	    if itemset.len() > 1 {
		let extended = itemsets.iter().position( |other| other.as_slice() == &itemset[ 1 .. ] ).unwrap();
		assert!( extended < position, "{:?} emitted after its extension {:?}", itemsets[ extended ], itemset );
	    }
	}
    }

    #[test]
    fn test_nothing_frequent() {
	let data = six_transactions();
	let config = MiningConfig{ min_support: 0.9, max_antecedent_length: 2 };
	let result = FpGrowthMiner::new( &config ).mine( &data );
	assert!( matches!( result, Err( BrlError::NothingFrequent{ .. } )));
    }
}
