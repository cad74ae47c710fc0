// src/processors/mod.rs
//
// The representative processor set: enough device types to exercise every
// corner of the graph (voice-capable sources, mixed-capable effects, a
// pure control-signal generator) without trying to be a complete synth
// library. Each processor registers itself under the type tag used in
// model data (`proc_NN/p_name.json` -> `"volume"`, `"noise"`, ...).

pub mod compress;
pub mod debug;
pub mod force;
pub mod noise;
pub mod panning;
pub mod pitch;
pub mod pulse;
pub mod sample;
pub mod slope;
pub mod stream;
pub mod volume;

use crate::processor::ProcessorRegistry;

pub fn register_all(reg: &mut ProcessorRegistry) {
    reg.register("volume", || Box::new(volume::Volume::default()));
    reg.register("panning", || Box::new(panning::Panning::default()));
    reg.register("pitch", || Box::new(pitch::PitchSource::default()));
    reg.register("force", || Box::new(force::Force::default()));
    reg.register("noise", || Box::new(noise::Noise::default()));
    reg.register("pulse", || Box::new(pulse::Pulse::default()));
    reg.register("sample", || Box::new(sample::Sample::default()));
    reg.register("stream", || Box::new(stream::Stream::default()));
    reg.register("slope", || Box::new(slope::Slope::default()));
    reg.register("compress", || Box::new(compress::Compress::default()));
    reg.register("debug", || Box::new(debug::Debug::default()));
}
