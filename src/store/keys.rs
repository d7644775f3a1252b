use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn tracked_job_key(job_id: u64) -> String {
    format!("{:020}", job_id)
}

pub fn job_daily_performance_key(job_id: u64, date: NaiveDate) -> String {
    format!("{:020}:{}", job_id, date_key(date))
}

pub fn job_daily_performance_prefix(job_id: u64) -> String {
    format!("{:020}:", job_id)
}

pub fn daily_impressions_key(date: NaiveDate) -> String {
    date_key(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_keys_sort_by_job_then_date() {
        let d1 = NaiveDate::from_ymd_opt(2020, 1, 9).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 1, 10).unwrap();
        assert!(job_daily_performance_key(7, d1) < job_daily_performance_key(7, d2));
        assert!(job_daily_performance_key(7, d2) < job_daily_performance_key(70, d1));
    }

    #[test]
    fn prefix_does_not_match_longer_ids() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 9).unwrap();
        let key = job_daily_performance_key(10, d);
        assert!(key.starts_with(&job_daily_performance_prefix(10)));
        assert!(!key.starts_with(&job_daily_performance_prefix(1)));
    }

    #[test]
    fn date_key_is_iso() {
        let d = NaiveDate::from_ymd_opt(2019, 12, 20).unwrap();
        assert_eq!(daily_impressions_key(d), "2019-12-20");
    }
}
