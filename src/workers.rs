// Worker-pool construction shared by the per-record stages.
//
// Records are independent, so stages parallelize per record. Results are
// collected with rayon's indexed collect, which preserves submission order;
// output files therefore keep the input record order.

use crate::error::{PipelineError, Result};

/// Build a pool of `processes` workers.
pub(crate) fn pool(processes: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(processes)
        .build()
        .map_err(|e| PipelineError::Config(format!("worker pool: {e}")))
}
