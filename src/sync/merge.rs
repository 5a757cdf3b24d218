use std::collections::{HashMap, HashSet};

use crate::storage::entities::Record;

/// Last-write-wins merge of a local and a remote snapshot.
///
/// Every remote record is kept, in remote order, unless the local copy with the same id is at least
/// as new (`updated_at`, falling back to `created_at`, missing timestamps being the oldest). Records
/// only known locally come first, in local order.
pub fn merge_by_id<T: Record + Clone>(local: &[T], remote: &[T]) -> Vec<T> {
    let remote_ids = remote.iter().map(|r| r.id()).collect::<HashSet<_>>();
    let mut local_by_id = HashMap::new();
    for record in local {
        local_by_id.entry(record.id()).or_insert(record);
    }

    let mut merged = local
        .iter()
        .filter(|l| !remote_ids.contains(l.id()))
        .cloned()
        .collect::<Vec<_>>();

    for record in remote {
        let kept = match local_by_id.get(record.id()) {
            Some(local) if local.last_modified() >= record.last_modified() => *local,
            _ => record,
        };
        merged.push(kept.clone());
    }
    merged
}
