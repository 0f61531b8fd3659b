//! Generation job counters.

use metrics::counter;

pub mod names {
    pub const JOBS_LAUNCHED: &str = "reelgen_jobs_launched_total";
    pub const JOBS_SUCCEEDED: &str = "reelgen_jobs_succeeded_total";
    pub const JOBS_FAILED: &str = "reelgen_jobs_failed_total";
    pub const JOBS_ABANDONED: &str = "reelgen_jobs_abandoned_total";
}

pub fn record_launched() {
    counter!(names::JOBS_LAUNCHED).increment(1);
}

/// `stage` is where the item failed: `launch`, `remote` or `upload`.
pub fn record_failed(stage: &'static str) {
    counter!(names::JOBS_FAILED, "stage" => stage).increment(1);
}

pub fn record_succeeded() {
    counter!(names::JOBS_SUCCEEDED).increment(1);
}

pub fn record_abandoned(count: usize) {
    if count > 0 {
        counter!(names::JOBS_ABANDONED).increment(count as u64);
    }
}
