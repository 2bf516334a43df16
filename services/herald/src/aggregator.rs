//! Reconciles monitor data with the tracked service list

use std::collections::{BTreeMap, HashMap};

use crate::config::TrackedService;
use crate::kuma::{HeartbeatFeed, MonitorDirectory};
use crate::status::{ServiceStatus, StatusSnapshot};

/// Build a snapshot holding exactly one status per tracked service.
///
/// Services whose monitor is missing from the directory, or whose monitor has
/// no heartbeats, are reported offline.
pub fn reconcile(
    directory: &MonitorDirectory,
    heartbeats: &HeartbeatFeed,
    services: &[TrackedService],
) -> StatusSnapshot {
    let mut id_by_name: HashMap<&str, &str> = HashMap::new();
    for entry in directory {
        // first listing of a name wins
        id_by_name
            .entry(entry.monitor_name.as_str())
            .or_insert(entry.monitor_id.as_str());
    }

    let monitor_status: HashMap<&str, ServiceStatus> = heartbeats
        .iter()
        .filter_map(|(monitor_id, beats)| {
            let latest = beats.last()?;
            let status = latest
                .status
                .map(ServiceStatus::from_heartbeat_code)
                .unwrap_or(ServiceStatus::Offline);
            Some((monitor_id.as_str(), status))
        })
        .collect();

    let statuses: BTreeMap<String, ServiceStatus> = services
        .iter()
        .map(|service| {
            let status = id_by_name
                .get(service.monitor_name.as_str())
                .and_then(|id| monitor_status.get(id))
                .copied()
                .unwrap_or(ServiceStatus::Offline);
            (service.id.clone(), status)
        })
        .collect();

    StatusSnapshot::new(statuses)
}
