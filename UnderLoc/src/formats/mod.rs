//! File format handlers
//!
//! `nrbf` is the .NET binary record stream, `udlg` the container that
//! carries it.

pub mod nrbf;
pub mod udlg;

// Re-export main document types
pub use nrbf::{Primitive, Record, Value};
pub use udlg::{
    UdlgDocument, UdlgOptions, parse_udlg_bytes, read_udlg, read_udlg_json, serialize_udlg,
    write_udlg, write_udlg_json,
};
