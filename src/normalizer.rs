use error_stack::{Report, bail};

use crate::error::AnalysisError;
use crate::model::PriceSeries;

/// Guard a freshly fetched series before indicator computation.
///
/// Ordering and date uniqueness are the data source's responsibility; the
/// only check made here is that at least one bar exists.
pub fn normalize(series: PriceSeries) -> Result<PriceSeries, Report<AnalysisError>> {
    if series.is_empty() {
        bail!(AnalysisError::DataUnavailable {
            ticker: series.ticker,
        });
    }
    Ok(series)
}
