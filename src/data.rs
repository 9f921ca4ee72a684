use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::error::{BrlError, Result};

pub mod pattern_tree;

/// Dense identifier of a (feature, value) pair
pub type Item = usize;
pub type Label = usize;
pub type Count = u64;
/// One item per feature, indexed by feature
pub type Transaction = Vec<Item>;

/// Maps discretized feature values to items and back.
#[derive( Debug, Clone, Default )]
pub struct Vocabulary {
    /// feature and value of every item, indexed by item
    items: Vec<(usize, String)>,
    lookup: FxHashMap<(usize, String), Item>,
    feature_names: Vec<String>,
}

/// Labeled, discretized training or test data.
#[derive( Debug, Clone )]
pub struct Dataset {
    transactions: Vec<Transaction>,
    labels: Vec<Label>,
    num_labels: usize,
    num_features: usize,
    vocabulary: Vocabulary,
}

impl Vocabulary {
    pub fn new() -> Vocabulary {
	Default::default()
    }

    pub fn with_feature_names( names: Vec<String> ) -> Vocabulary {
	Vocabulary{ feature_names: names, ..Default::default() }
    }

    /// Returns the item for the value, creating it on first sight
    pub fn intern( &mut self, feature: usize, value: &str ) -> Item {
	match self.lookup.entry( (feature, value.to_string()) ) {
	    Entry::Occupied( entry ) => *entry.get(),
	    Entry::Vacant( entry ) => {
		let item = self.items.len();
		self.items.push( (feature, value.to_string()) );
		entry.insert( item );
		item
	    }
	}
    }

    pub fn get( &self, feature: usize, value: &str ) -> Option<Item> {
	self.lookup.get( &(feature, value.to_string()) ).copied()
    }

    pub fn feature_of( &self, item: Item ) -> usize {
	self.items[ item ].0
    }

    pub fn value_of( &self, item: Item ) -> &str {
	self.items[ item ].1.as_str()
    }

    /// Name given on construction, or a positional placeholder
    pub fn feature_name( &self, feature: usize ) -> String {
	self.feature_names.get( feature ).cloned().unwrap_or_else( || format!( "x{feature}" ))
    }

    pub fn len( &self ) -> usize { self.items.len() }
    pub fn is_empty( &self ) -> bool { self.items.is_empty() }
}

impl Dataset {

    /// Encodes records of feature values into transactions with a fresh vocabulary.
    pub fn from_records<R, S>( records: &[R], labels: Vec<Label>, num_labels: usize ) -> Result<Dataset> where
	R: AsRef<[S]>,
	S: AsRef<str>,
    {
	Dataset::from_records_with_vocabulary( records, labels, num_labels, Vocabulary::new() )
    }

    /// Encodes records while extending an existing vocabulary.
    /// Test data should reuse the training vocabulary so equal values map to equal items.
    pub fn from_records_with_vocabulary<R, S>( records: &[R], labels: Vec<Label>, num_labels: usize, mut vocabulary: Vocabulary ) -> Result<Dataset> where
	R: AsRef<[S]>,
	S: AsRef<str>,
    {
	if records.is_empty() {
	    return Err( BrlError::EmptyDataset );
	}
	if records.len() != labels.len() {
	    return Err( BrlError::LabelCountMismatch{ transactions: records.len(), labels: labels.len() } );
	}
	let num_features = records[0].as_ref().len();

	let mut transactions = Vec::with_capacity( records.len() );
	for (index, record) in records.iter().enumerate() {
	    let values = record.as_ref();
	    if values.len() != num_features {
		return Err( BrlError::RaggedTransaction{ index, expected: num_features, found: values.len() } );
	    }
	    let transaction: Transaction = values.iter()
		.enumerate()
		.map( |(feature, value)| vocabulary.intern( feature, value.as_ref() ))
		.collect();
	    transactions.push( transaction );
	}
	for (index, label) in labels.iter().enumerate() {
	    if *label >= num_labels {
		return Err( BrlError::LabelOutOfRange{ index, label: *label, num_labels } );
	    }
	}

	Ok( Dataset{ transactions, labels, num_labels, num_features, vocabulary } )
    }

    pub fn transactions( &self ) -> &[Transaction] { &self.transactions }
    pub fn labels( &self ) -> &[Label] { &self.labels }
    pub fn num_labels( &self ) -> usize { self.num_labels }
    pub fn num_features( &self ) -> usize { self.num_features }
    pub fn vocabulary( &self ) -> &Vocabulary { &self.vocabulary }
    pub fn len( &self ) -> usize { self.transactions.len() }
    pub fn is_empty( &self ) -> bool { self.transactions.is_empty() }

    /// Iterates over pairs of transaction and label
    pub fn iter( &self ) -> impl Iterator<Item = (&Transaction, Label)> + '_ {
	self.transactions.iter().zip( self.labels.iter().copied() )
    }
}

/// Counts item occurrences and remembers the order in which items were first seen.
pub fn calc_item_frequencies <'a, It> ( items: It ) -> (FxHashMap<Item, Count>, Vec<Item>) where
    It: Iterator<Item = &'a Item>,
{
    let mut counts: FxHashMap<Item, Count> = FxHashMap::default();
    let mut first_seen: Vec<Item> = Vec::new();
    for item in items {
	match counts.get_mut( item ) {
	    Some( count ) => *count += 1,
	    None => {
		counts.insert( *item, 1 );
		first_seen.push( *item );
	    }
	}
    }
    (counts, first_seen)
}

/// Orders items by decreasing score. Ties keep the order of `items`.
pub fn order_by_score <S: Ord> ( items: &[Item], item_to_score: &FxHashMap<Item, S> ) -> Vec<Item> {
    let mut ordered: Vec<Item> = items.to_vec();
    let compare = |left: &Item, right: &Item| {
	let left_score = item_to_score.get( left ).expect( "every item has a score" );
	let right_score = item_to_score.get( right ).expect( "every item has a score" );
	left_score.cmp( right_score ).reverse()
    };
    // stable, so first-seen order breaks ties
    ordered.sort_by( compare );
    ordered
}
