//! Input readers: the IP range dataset and the access log stream

pub mod access_log;
pub mod ranges;

pub use access_log::{parse_line, AccessLog};
pub use ranges::{read_ranges, read_ranges_file};
