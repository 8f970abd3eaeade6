//! IP-range geolocation.
//!
//! - **address**: dotted-quad and integer address keys
//! - **index**: sorted interval index with binary-search lookup
//! - **join**: attaches the looked-up payload to a table

pub mod address;
pub mod index;
pub mod join;

pub use address::{AddressKey, address_key, extract_key, ip_to_key, key_to_ip};
pub use index::IntervalIndex;
pub use join::RangeJoinEngine;
