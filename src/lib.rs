//! HLS relay: fetches playlists and segments on behalf of players, retrying
//! denied requests with disguise headers, rewriting playlists so every
//! reference routes back through `/proxy`, and streaming segments with range
//! headers preserved.

pub mod config;
pub mod error;
pub mod hls;
pub mod metrics;
pub mod server;
pub mod upstream;
