use tracing::*;

use crate::*;
use crate::estimate::select_point_estimate;

/// Everything a full fit produces
#[derive( Debug, Clone )]
pub struct LearnedRuleList {
    pub pool: AntecedentPool,
    pub run: SamplerRun,
    /// representative sample with its log posterior
    pub point: (RuleList, f64),
    pub fitted: FittedRuleList,
}

/// Validates, mines, samples, selects and fits in one go
#[derive( Debug, Clone, Default )]
pub struct RuleListLearner {
    config: Config,
}

impl RuleListLearner {
    pub fn new( config: Config ) -> RuleListLearner {
	RuleListLearner{ config }
    }

    pub fn config( &self ) -> &Config { &self.config }

    pub fn fit( &self, data: &Dataset ) -> Result<LearnedRuleList> {
	self.config.validate( data.num_labels() )?;
	if data.is_empty() {
	    return Err( BrlError::EmptyDataset );
	}

	let pool = FpGrowthMiner::new( &self.config.mining ).mine( data )?;
	let model = GenerativeModel::new( &self.config.model );
	let sampler = Sampler::new( model.clone(), self.config.sampler.clone() );
	let run = sampler.run( &pool, data )?;

	let point = select_point_estimate( run.samples(), &pool )?;
	point.0.log( "Selected rule list", Level::INFO );
	let fitted = FittedRuleList::fit( &point.0, &pool, data, &model );
	info!( "Log posterior of the selected list {:.3}", point.1 );

	Ok( LearnedRuleList{ pool, run, point, fitted } )
    }
}
