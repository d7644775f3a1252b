//! Daily channel impressions aggregation.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::constants::FALLBACK_CHANNEL;
use crate::etl::classify::canonical_channel;
use crate::etl::query::{QueryAdapter, Report};
use crate::etl::row::ImpressionRow;
use crate::etl::EtlError;
use crate::store::operations::impressions::{DailyImpressions, ImpressionDetail};
use crate::store::Store;

/// Group rows by `(channel, duration)`.
///
/// Channel variants collapse onto their known channel; unrecognized channels
/// are folded into the fallback channel, so they never appear in the output.
/// `event_count` sums over the group while `client_count` is taken from the
/// group's first row.
pub fn aggregate(date: NaiveDate, rows: Vec<Value>) -> DailyImpressions {
    let mut groups: BTreeMap<(&'static str, String), (u64, u64)> = BTreeMap::new();

    for row in rows.into_iter().filter_map(ImpressionRow::from_value) {
        let channel = canonical_channel(&row.channel).unwrap_or_else(|| {
            tracing::debug!(
                channel = %row.channel,
                fallback = FALLBACK_CHANNEL,
                "Folding impressions for unrecognized channel"
            );
            FALLBACK_CHANNEL
        });
        match groups.entry((channel, row.duration.trim().to_string())) {
            Entry::Vacant(slot) => {
                slot.insert((row.counts, row.no_clients));
            }
            Entry::Occupied(mut slot) => {
                let (event_count, _) = slot.get_mut();
                *event_count = event_count.saturating_add(row.counts);
            }
        }
    }

    let details = groups
        .into_iter()
        .map(|((channel, duration), (event_count, client_count))| ImpressionDetail {
            channel: channel.to_string(),
            duration,
            event_count,
            client_count,
        })
        .collect();

    DailyImpressions { date, details }
}

/// Returns the number of `(channel, duration)` groups written.
pub async fn run(
    adapter: &QueryAdapter,
    store: &Store,
    date: NaiveDate,
) -> Result<usize, EtlError> {
    let rows = adapter.fetch(Report::ChannelImpressions, date).await?;
    let rows_seen = rows.len();

    let record = aggregate(date, rows);
    store.replace_daily_impressions(&record)?;

    let groups = record.details.len();
    tracing::info!(%date, rows = rows_seen, groups, "Daily impressions aggregated");
    Ok(groups)
}
