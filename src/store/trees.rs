pub const TRACKED_JOBS: &str = "tracked_jobs";
pub const JOB_DAILY_PERFORMANCE: &str = "job_daily_performance";
pub const DAILY_IMPRESSIONS: &str = "daily_impressions";
pub const META: &str = "meta";
