//! onionreq-cli - path files, loopback network, and simulation runner
//! behind the `onionreq` binary

pub mod config;
pub mod loopback;
pub mod path_file;
pub mod simulate;

pub use config::Config;
pub use loopback::LoopbackNetwork;
pub use path_file::PathFile;
