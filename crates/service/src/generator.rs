//! Synthetic update generation.
//!
//! Every notification follows one fixed interface-statistics path template;
//! only the port key and the in-octets value vary across emissions. The
//! builder is a pure function so the wire shape can be tested without IO.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use gnmi_emu_schemas::gnmi::{typed_value, Notification, Path, PathElem, TypedValue, Update};

/// Leaf updated by every synthetic notification.
const LEAF_NAME: &str = "in-octets";

/// Wall-clock time as nanoseconds since the Unix epoch.
pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Synthetic port name for a port index ("1/1/1" for index 0).
fn port_id(port_index: usize) -> String {
    format!("1/1/{}", port_index + 1)
}

fn elem(name: &str) -> PathElem {
    PathElem {
        name: name.to_string(),
        key: HashMap::new(),
    }
}

/// Prefix path: `state/port[port-id=1/1/{i+1}]/ethernet/statistics`.
fn prefix(port_index: usize) -> Path {
    let mut port = elem("port");
    port.key.insert("port-id".to_string(), port_id(port_index));
    Path {
        elem: vec![elem("state"), port, elem("ethernet"), elem("statistics")],
        ..Path::default()
    }
}

/// Build one synthetic notification for a port index at the given timestamp.
///
/// The in-octets value is the timestamp rendered as a decimal JSON number:
/// monotonically growing, unique enough to spot drops, and free of any
/// modeled device state.
pub fn notification(port_index: usize, timestamp_ns: i64) -> Notification {
    Notification {
        timestamp: timestamp_ns,
        prefix: Some(prefix(port_index)),
        update: vec![Update {
            path: Some(Path {
                elem: vec![elem(LEAF_NAME)],
                ..Path::default()
            }),
            val: Some(TypedValue {
                value: Some(typed_value::Value::JsonVal(
                    timestamp_ns.to_string().into_bytes(),
                )),
            }),
            duplicates: 0,
        }],
        delete: Vec::new(),
        atomic: false,
    }
}
