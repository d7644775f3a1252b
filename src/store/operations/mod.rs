pub mod impressions;
pub mod jobs;
pub mod performance;
