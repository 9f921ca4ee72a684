use rustc_hash::FxHashMap;

use super::{Count, Item, Transaction, calc_item_frequencies, order_by_score};

/// Index of a node in the tree's arena
pub type NodeId = usize;

const ROOT: NodeId = 0;

/// Prefix-sharing tree over transactions (FP-tree).
/// Nodes live in an arena and refer to each other by index.
#[derive( Debug, Clone )]
pub struct PatternTree {
    nodes: Vec<Node>,
    /// sum of the counts of all nodes with the item
    item_counts: FxHashMap<Item, Count>,
    /// every node with the item, in insertion order
    item_occurrences: FxHashMap<Item, Vec<NodeId>>,
    /// items in order of their first insertion
    item_order: Vec<Item>,
}

#[derive( Debug, Clone )]
struct Node {
    /// None only for the root
    attribute: Option<Item>,
    count: Count,
    parent: Option<NodeId>,
    /// invariant: attributes of the children are distinct
    children: Vec<NodeId>,
}

impl Node {
    fn new( attribute: Option<Item>, count: Count, parent: Option<NodeId> ) -> Node {
	Node{ attribute, count, parent, children: Vec::new() }
    }
}

impl Default for PatternTree {
    fn default() -> PatternTree {
	PatternTree::new()
    }
}

impl PatternTree {

    pub fn new() -> PatternTree {
	PatternTree{
	    nodes: vec!( Node::new( None, 0, None )),
	    item_counts: FxHashMap::default(),
	    item_occurrences: FxHashMap::default(),
	    item_order: Vec::new(),
	}
    }

    /// Builds the tree over all items whose support reaches min_support.
    /// Items of every transaction are inserted by decreasing global frequency, ties broken by first sight.
    pub fn build( transactions: &[Transaction], min_support: f64 ) -> PatternTree {
	let (frequencies, first_seen) = calc_item_frequencies( transactions.iter().flatten() );
	let total = transactions.len() as f64;
	let frequent: Vec<Item> = first_seen.into_iter()
	    .filter( |item| frequencies[ item ] as f64 / total >= min_support )
	    .collect();
	let canonical = order_by_score( &frequent, &frequencies );
	let rank: FxHashMap<Item, usize> = canonical.iter()
	    .enumerate()
	    .map( |(position, item)| (*item, position) )
	    .collect();

	let mut tree = PatternTree::new();
	let mut buffer: Vec<Item> = Vec::new();
	for transaction in transactions {
	    buffer.clear();
	    buffer.extend( transaction.iter().filter( |item| rank.contains_key( *item )) );
	    buffer.sort_by_key( |item| rank[ item ] );
	    tree.insert( &buffer );
	}
	tree
    }

    /// Inserts an ordered sequence of items, adding one to the count of every node on its path
    pub fn insert( &mut self, items: &[Item] ) {
	let mut parent = ROOT;
	for item in items {
	    parent = self.add_to_child( parent, *item, 1 );
	}
    }

    pub fn root( &self ) -> NodeId { ROOT }

    pub fn attribute( &self, node: NodeId ) -> Option<Item> { self.nodes[ node ].attribute }
    pub fn count( &self, node: NodeId ) -> Count { self.nodes[ node ].count }
    pub fn parent( &self, node: NodeId ) -> Option<NodeId> { self.nodes[ node ].parent }
    pub fn children( &self, node: NodeId ) -> &[NodeId] { &self.nodes[ node ].children }

    pub fn item_count( &self, item: Item ) -> Count {
	self.item_counts.get( &item ).copied().unwrap_or( 0 )
    }

    pub fn occurrences( &self, item: Item ) -> &[NodeId] {
	self.item_occurrences.get( &item ).map_or( &[], |nodes| nodes.as_slice() )
    }

    pub fn num_items( &self ) -> usize { self.item_counts.len() }
    pub fn is_empty( &self ) -> bool { self.item_counts.is_empty() }

    /// Items by increasing count. Ties keep the order of first insertion into this tree.
    pub fn items_ascending( &self ) -> Vec<Item> {
	let mut items = self.item_order.clone();
	items.sort_by_key( |item| self.item_counts[ item ] );
	items
    }

    /// Path from below the root down to node, in root-to-node order
    pub fn path_to( &self, node: NodeId ) -> Vec<NodeId> {
	let mut path = Vec::new();
	let mut current = node;
	while let Some( parent ) = self.nodes[ current ].parent {
	    path.push( current );
	    current = parent;
	}
	path.reverse();
	path
    }

    /// One root-to-node path per occurrence of the item
    pub fn prefix_paths( &self, item: Item ) -> Vec<Vec<NodeId>> {
	self.occurrences( item ).iter()
	    .map( |node| self.path_to( *node ))
	    .collect()
    }

    /// Conditional tree of item, built from its prefix paths in this tree
    pub fn conditional_tree( &self, item: Item ) -> PatternTree {
	let paths = self.prefix_paths( item );
	self.tree_from_prefix_paths( &paths, item )
    }

    /// Replays the paths into a fresh tree where only the target's nodes carry counts,
    /// propagates the target counts to their ancestors and finally removes the target.
    /// Pre: every path ends in a node of target
    pub fn tree_from_prefix_paths( &self, paths: &[Vec<NodeId>], target: Item ) -> PatternTree {
	let mut tree = PatternTree::new();
	for path in paths {
	    let mut parent = ROOT;
	    for node in path {
		let attribute = self.nodes[ *node ].attribute.expect( "paths exclude the root" );
		let count = if attribute == target { self.nodes[ *node ].count } else { 0 };
		parent = tree.add_to_child( parent, attribute, count );
	    }
	}

	let target_nodes: Vec<NodeId> = tree.occurrences( target ).to_vec();
	for target_node in target_nodes {
	    let count = tree.nodes[ target_node ].count;
	    let mut ancestor = tree.nodes[ target_node ].parent;
	    while let Some( node ) = ancestor {
		if node == ROOT {
		    break;
		}
		tree.nodes[ node ].count += count;
		let attribute = tree.nodes[ node ].attribute.expect( "only the root lacks an attribute" );
		*tree.item_counts.entry( attribute ).or_insert( 0 ) += count;
		ancestor = tree.nodes[ node ].parent;
	    }
	}

	tree.remove_item( target );
	tree
    }

    /// Detaches every node of the item and forgets the item.
    /// Pre: nodes of the item are leaves
    fn remove_item( &mut self, item: Item ) {
	let removed = self.item_occurrences.remove( &item ).unwrap_or_default();
	for node in removed {
	    if let Some( parent ) = self.nodes[ node ].parent {
		self.nodes[ parent ].children.retain( |child| *child != node );
	    }
	}
	self.item_counts.remove( &item );
	self.item_order.retain( |other| *other != item );
    }

    /// Adds count to the child of parent labeled with item, creating the child if needed
    fn add_to_child( &mut self, parent: NodeId, item: Item, count: Count ) -> NodeId {
	let existing = self.nodes[ parent ].children.iter()
	    .copied()
	    .find( |child| self.nodes[ *child ].attribute == Some( item ));

	let child = match existing {
	    Some( child ) => {
		self.nodes[ child ].count += count;
		child
	    },
	    None => {
		let child = self.nodes.len();
		self.nodes.push( Node::new( Some( item ), count, Some( parent )));
		self.nodes[ parent ].children.push( child );
		let occurrences = self.item_occurrences.entry( item ).or_default();
		if occurrences.is_empty() {
		    self.item_order.push( item );
		}
		occurrences.push( child );
		child
	    }
	};
	*self.item_counts.entry( item ).or_insert( 0 ) += count;
	child
    }
}
