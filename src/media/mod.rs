pub mod playback;
pub mod source;
pub mod timeline;

pub use playback::{AudioTransport, PlaybackController, PlaybackStatus, TransportEvent};
pub use source::{MediaSet, MediaSource};
pub use timeline::{Timeline, compute_timeline};
