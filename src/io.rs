use std::path::Path;
use std::fs::File;
use std::io::{BufReader, BufRead, BufWriter, Write};

use crate::*;

pub type DataGenerator<T> = Box<dyn Iterator<Item = Result<T>>>;

/// Reads a text file line by line through the converter. Blank lines are skipped.
/// A line the converter rejects yields a parse error carrying its line number.
pub fn read_data<T, F, P>( path: P, converter: F ) -> Result<DataGenerator<T>> where
    F: Fn(&str) -> std::result::Result<T, String> + 'static,
    P: AsRef<Path>,
{
    let file = File::open( path )?;
    let reader = BufReader::new( file );
    let generator = reader.lines()
	.enumerate()
	.filter( |(_, line)| !matches!( line, Ok( l ) if l.trim().is_empty() ))
	.map( move |(index, line)| {
	    let line = line?;
	    converter( &line ).map_err( |reason| BrlError::Parse{ line: index + 1, reason } )
	});
    Ok( Box::new( generator ))
}

/// Splits a delimited line into its feature values and the label in the last column
pub fn parse_record( line: &str, delimiter: &str ) -> std::result::Result<(Vec<String>, Label), String> {
    let mut values: Vec<String> = line.split( delimiter ).map( |v| v.trim().to_string() ).collect();
    if values.len() < 2 {
	return Err( format!( "expected feature values and a label, found {} column(s)", values.len() ));
    }
    let label = values.pop().unwrap_or_default();
    let label = label.parse::<Label>().map_err( |e| format!( "label '{label}': {e}" ))?;
    Ok( (values, label) )
}

/// Reads a labeled dataset with the label in the last column.
/// With a header the first line names the features. The number of labels is one above the
/// largest label, but at least two.
pub fn read_dataset<P: AsRef<Path>>( path: P, delimiter: &str, header: bool ) -> Result<Dataset> {
    let path = path.as_ref();
    let vocabulary = if header {
	let mut first = String::new();
	BufReader::new( File::open( path )? ).read_line( &mut first )?;
	let mut names: Vec<String> = first.trim_end().split( delimiter ).map( |n| n.trim().to_string() ).collect();
	names.pop();
	Vocabulary::with_feature_names( names )
    } else {
	Vocabulary::new()
    };

    let delimiter = delimiter.to_string();
    let generator = read_data( path, move |line| parse_record( line, &delimiter ))?;
    let mut records = Vec::new();
    let mut labels = Vec::new();
    for record in generator.skip( header as usize ) {
	let (values, label) = record?;
	records.push( values );
	labels.push( label );
    }

    let num_labels = labels.iter().max().map_or( 2, |max| ( max + 1 ).max( 2 ));
    Dataset::from_records_with_vocabulary( &records, labels, num_labels, vocabulary )
}

/// Writes a serializable value as JSON
pub fn write_json<M: serde::Serialize, P: AsRef<Path>>( value: &M, path: P ) -> Result<()> {
    let mut writer = BufWriter::new( File::create( path )? );
    serde_json::to_writer_pretty( &mut writer, value )?;
    writer.flush()?;
    Ok( () )
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn temporary_file( name: &str, content: &str ) -> PathBuf {
	let path = std::env::temp_dir().join( format!( "brl_io_{}_{name}", std::process::id() ));
	std::fs::write( &path, content ).unwrap();
	path
    }

    #[test]
    fn test_parse_record() {
	let (values, label) = parse_record( "female, first ,1", "," ).unwrap();
	assert_eq!( values, vec!( "female".to_string(), "first".to_string() ));
	assert_eq!( label, 1 );
	assert!( parse_record( "1", "," ).is_err() );
	assert!( parse_record( "female,first,yes", "," ).is_err() );
    }

    #[test]
    fn test_read_dataset_with_header() {
	let path = temporary_file( "header.csv", "sex,class,survived\nfemale,first,1\n\nmale,third,0\nmale,first,0\n" );
	let data = read_dataset( &path, ",", true ).unwrap();
	std::fs::remove_file( &path ).unwrap();

	assert_eq!( data.len(), 3 );
	assert_eq!( data.num_features(), 2 );
	assert_eq!( data.num_labels(), 2 );
	assert_eq!( data.labels(), &[1, 0, 0] );
	assert_eq!( data.vocabulary().feature_name( 1 ), "class" );
	let female = data.vocabulary().get( 0, "female" ).unwrap();
	assert_eq!( data.transactions()[0][0], female );
    }

    #[test]
    fn test_parse_error_has_line_number() {
	let path = temporary_file( "broken.csv", "a,b,0\n\na,b,x\n" );
	let result = read_dataset( &path, ",", false );
	std::fs::remove_file( &path ).unwrap();
	assert!( matches!( result, Err( BrlError::Parse{ line: 3, .. } )));
    }

    #[test]
    fn test_write_json() {
	let path = std::env::temp_dir().join( format!( "brl_io_{}_list.json", std::process::id() ));
	let list = RuleList::new( vec!( 2, 0 ));
	write_json( &list, &path ).unwrap();
	let read: RuleList = serde_json::from_str( &std::fs::read_to_string( &path ).unwrap() ).unwrap();
	std::fs::remove_file( &path ).unwrap();
	assert_eq!( read, list );
    }
}
