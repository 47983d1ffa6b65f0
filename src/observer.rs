//! Out-of-band ground-truth observer for Ryu's `ofctl_rest` REST API.
//!
//! This talks to the SDN controller directly and is never consulted by the
//! attack path itself (spec.md §7 Non-goals) — an attacker with no network
//! visibility could not call it. It exists purely so `experiment` can record
//! the real flow count alongside the blind measurement for evaluation.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AggregateFlowEntry {
    flow_count: u64,
}

pub struct RyuObserver {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl RyuObserver {
    /// `host` is `host:port`, e.g. `127.0.0.1:8080`.
    pub fn new(host: &str) -> Self {
        Self {
            base_url: format!("http://{host}"),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn aggregate_flow_stats(&self, dpid: u64) -> anyhow::Result<Option<u64>> {
        let url = format!("{}/stats/aggregateflow/{}", self.base_url, dpid);
        let resp = self.client.get(&url).send()?;
        if !resp.status().is_success() {
            log::warn!("error fetching {} response", url);
            return Ok(None);
        }
        let body: std::collections::HashMap<String, Vec<AggregateFlowEntry>> = resp.json()?;
        Ok(body.get(&dpid.to_string()).and_then(|entries| entries.first()).map(|e| e.flow_count))
    }

    /// Sums aggregate flow counts across `dpids`. Note this may double-count
    /// flows installed on both switches along a path, matching the reference.
    pub fn total_flow_count(&self, dpids: &[u64]) -> anyhow::Result<u64> {
        let mut count = 0;
        for &dpid in dpids {
            if let Some(n) = self.aggregate_flow_stats(dpid)? {
                count += n;
            }
        }
        Ok(count)
    }
}
