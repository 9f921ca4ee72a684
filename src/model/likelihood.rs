use serde::{Deserialize, Serialize};

use crate::data::{Count, Label};

/// Label counts per bucket of a rule list.
/// Bucket 0 collects transactions no rule captures, bucket i + 1 those captured first by rule i.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
pub struct BucketCounts {
    counts: Vec<Vec<Count>>,
}

impl BucketCounts {
    pub fn new( num_buckets: usize, num_labels: usize ) -> BucketCounts {
	BucketCounts{ counts: vec!( vec!( 0; num_labels ); num_buckets ) }
    }

    pub fn add( &mut self, bucket: usize, label: Label ) {
	self.counts[ bucket ][ label ] += 1;
    }

    pub fn get( &self, bucket: usize, label: Label ) -> Count {
	self.counts[ bucket ][ label ]
    }

    pub fn bucket( &self, bucket: usize ) -> &[Count] {
	&self.counts[ bucket ]
    }

    pub fn num_buckets( &self ) -> usize { self.counts.len() }

    /// Number of transactions that ended up in the bucket
    pub fn total( &self, bucket: usize ) -> Count {
	self.counts[ bucket ].iter().sum()
    }

    /// Dirichlet posterior parameters alpha + N of the bucket
    pub fn posterior_parameters( &self, bucket: usize, alpha: &[f64] ) -> Vec<f64> {
	self.counts[ bucket ].iter()
	    .zip( alpha )
	    .map( |(count, a)| *count as f64 + a )
	    .collect()
    }
}
