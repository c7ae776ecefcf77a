//! Value substitution tables declared on resource operations.
//!
//! A table maps device text (key) to external text (value). Writes search by
//! value and substitute the key; reads search by key and substitute the value.
//! When several entries share a value the first in declared order wins.

use smol_str::SmolStr;
use tracing::warn;

use crate::profile::MappingTable;

/// External candidate to device text. A miss on a non-empty table is logged
/// and the candidate is returned unchanged.
pub fn resolve_write<'a>(resource: &str, table: &'a MappingTable, candidate: &'a str) -> &'a str {
    if table.is_empty() {
        return candidate;
    }
    match table.iter().find(|(_, external)| external.as_str() == candidate) {
        Some((device, _)) => device.as_str(),
        None => {
            warn!(
                "resource operation {resource} mapping value ({candidate}) failed with the mapping table: {table:?}"
            );
            candidate
        }
    }
}

/// External form of `device_text`, if the table maps it.
pub fn resolve_read<'a>(table: &'a MappingTable, device_text: &str) -> Option<&'a str> {
    table.get(device_text).map(SmolStr::as_str)
}
