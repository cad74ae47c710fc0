// src/lib.rs
//
// Library entry point. `handle::Handle` is the boundary a host embeds;
// everything else is exported for Rust consumers that want finer-grained
// control (building a `Player` directly, registering custom processor
// types, driving `Module` loading themselves) and for the integration
// test suite, which exercises the device graph and channel/voice layers
// directly rather than only through `Handle`.

pub mod audio_unit;
pub mod cgiter;
pub mod channel;
pub mod device;
pub mod envelope;
pub mod error;
pub mod event_handler;
pub mod handle;
pub mod master;
pub mod math;
pub mod model;
pub mod pattern;
pub mod player;
pub mod processor;
pub mod processors;
pub mod random;
pub mod streader;
pub mod time_env_state;
pub mod tstamp;
pub mod value;
pub mod voice;
pub mod work_buffer;

pub use device::{Device, DeviceId, DeviceKind};
pub use error::{KqtError, KqtResult};
pub use handle::Handle;
pub use master::PlaybackMode;
pub use model::Module;
pub use player::Player;
pub use processor::{ProcessorImpl, ProcessorRegistry, ProcessorVoiceState};
pub use tstamp::Tstamp;
pub use value::Value;
pub use voice::Priority;
