// src/player.rs
//
// The render loop: owns a loaded Module's flattened device graph, drives
// playback position forward pattern by pattern, fires the Triggers it
// passes over through EventHandlerTable, and renders audio a block at a
// time. Rendering walks the graph in precomputed topological order
// (`Connections::render_order`) with an explicit memo table (`outputs`)
// rather than recursing per device -- the flat graph here is built fresh
// per model load rather than per note, so there is no recursion-depth or
// borrow-aliasing hazard to design around, only the memoisation itself.

use std::collections::HashMap;

use crate::channel::Channel;
use crate::cgiter::Cgiter;
use crate::device::connections::Connections;
use crate::device::state::{DeviceState, DeviceThreadState};
use crate::device::{Device, DeviceId, DeviceKind, DEVICE_PORTS_MAX};
use crate::error::{KqtError, KqtResult};
use crate::event_handler::{EventContext, EventHandlerTable};
use crate::master::{MasterParams, PlaybackMode};
use crate::model::{Module, MASTER_DEVICE_ID};
use crate::processor::{MixedRenderContext, ProcessorRegistry, VoiceRenderContext};
use crate::tstamp::Tstamp;
use crate::value::Value;
use crate::voice::pool::VoicePool;
use crate::voice::Priority;
use crate::work_buffer::WorkBuffer;

/// One track's walk state, persisted across render calls (Cgiter itself
/// borrows the order list it walks, so it cannot be stored across calls --
/// we keep its three primitive fields here and rebuild a transient Cgiter
/// from them each time we need to advance).
#[derive(Debug, Clone, Copy)]
struct TrackCursor {
    system: u32,
    pat_offset: Tstamp,
    pat_length: Tstamp,
}

pub struct Player {
    module: Module,
    devices: HashMap<DeviceId, Device>,
    connections: Connections,
    processors: HashMap<DeviceId, DeviceThreadState>,
    passthrough: HashMap<DeviceId, DeviceState>,
    voices: VoicePool,
    channels: Vec<Channel>,
    /// `channels[i]` fires notes into the instrument audio unit
    /// `channel_instrument[i]`, or nowhere if unset.
    channel_instrument: Vec<Option<u32>>,
    master: MasterParams,
    event_handlers: EventHandlerTable,
    audio_rate: f64,
    block_size: usize,
    cursor: Option<(u32, TrackCursor)>,
}

impl Player {
    /// Build a render-ready player from a loaded Module: flattens the
    /// device graph, validates it acyclic, and allocates one
    /// `DeviceThreadState` (with `voices_max` pre-allocated per-voice
    /// states) per processor device.
    pub fn new(
        module: Module,
        registry: &ProcessorRegistry,
        audio_rate: f64,
        block_size: usize,
        voices_max: usize,
        channels_max: usize,
        initial_tempo: f64,
    ) -> KqtResult<Self> {
        let (devices, edges) = module.build_render_graph();
        let connections = Connections::build(&devices, &edges, MASTER_DEVICE_ID)
            .map_err(|e| KqtError::Resource(e.to_string()))?;

        let mut processors = HashMap::new();
        let mut passthrough = HashMap::new();
        for device in devices.values() {
            match device.kind {
                DeviceKind::Processor(tag) => {
                    let processor_impl = registry
                        .create(tag)
                        .ok_or_else(|| KqtError::Resource(format!("unknown processor type '{tag}'")))?;
                    processors.insert(
                        device.id,
                        DeviceThreadState::new(DEVICE_PORTS_MAX, block_size, processor_impl, voices_max),
                    );
                }
                DeviceKind::AudioUnit(_) | DeviceKind::Master => {
                    passthrough.insert(device.id, DeviceState::new(DEVICE_PORTS_MAX, block_size));
                }
            }
        }

        let random_seed = module.random_seed;
        let channels = (0..channels_max)
            .map(|i| Channel::new(audio_rate, initial_tempo, random_seed, i as u64))
            .collect();

        Ok(Self {
            module,
            devices,
            connections,
            processors,
            passthrough,
            voices: VoicePool::new(voices_max),
            channels,
            channel_instrument: vec![None; channels_max],
            master: MasterParams::new(audio_rate, initial_tempo, random_seed),
            event_handlers: EventHandlerTable::new(),
            audio_rate,
            block_size,
            cursor: None,
        })
    }

    /// Set the global mixing volume immediately (no slide), in dB. Used at
    /// startup to apply a host-configured level before any `=` event has
    /// run.
    pub fn set_mixing_volume(&mut self, db: f64) {
        self.master.global_volume.start(db, Tstamp::ZERO);
        self.master.global_volume.change_target(db, Tstamp::ZERO);
    }

    pub fn bind_channel_instrument(&mut self, channel: usize, audio_unit_id: u32) {
        self.channel_instrument[channel] = Some(audio_unit_id);
    }

    pub fn set_playback_mode(&mut self, mode: PlaybackMode) {
        self.master.mode = mode;
        self.cursor = None;
    }

    pub fn set_track(&mut self, track: u32) {
        self.master.position.track = track;
        self.cursor = None;
    }

    pub fn stop(&mut self) {
        self.master.begin_fade_out();
    }

    pub fn is_stopped(&self) -> bool {
        self.master.is_stopped()
    }

    /// Fire one event directly (bypassing pattern playback), e.g. from a
    /// live MIDI-style input path rather than a column trigger.
    pub fn fire_event(&mut self, channel: usize, name: &str, args: &Value) -> KqtResult<()> {
        let bound_processor = self.channel_instrument[channel];
        let mut ctx = EventContext {
            channel: &mut self.channels[channel],
            voices: &mut self.voices,
            master: &mut self.master,
            channel_index: channel as u32,
            bound_processor,
        };
        self.event_handlers.dispatch(&mut ctx, name, args)
    }

    /// Render one block of up to `block_size` frames. Returns the number of
    /// frames actually rendered (always `block_size` unless the mix rate or
    /// tempo change mid-playback forces a shorter sub-chunk -- this player
    /// does not yet split sub-chunks on a mid-block tempo change, since
    /// `set_data` only ever touches a stopped player; live tempo/rate
    /// changes land whole between blocks).
    pub fn process(&mut self, frame_count: usize) -> KqtResult<usize> {
        let frame_count = frame_count.min(self.block_size);
        if self.master.is_stopped() {
            return Ok(0);
        }

        self.advance_triggers(frame_count)?;
        self.render_graph(frame_count);
        self.apply_master_gain(frame_count);

        Ok(frame_count)
    }

    pub fn master_output(&self, port: u8) -> Option<&WorkBuffer> {
        self.passthrough.get(&MASTER_DEVICE_ID)?.send_bufs.get(port as usize)?.as_ref()
    }

    // -----------------------------------------------------------------
    // Pattern playback
    // -----------------------------------------------------------------

    fn pattern_length(&self, track: u32, system: u32) -> Tstamp {
        self.module
            .tracks
            .track(track)
            .and_then(|ol| ol.at(system))
            .and_then(|entry| self.module.patterns.get(&(entry.pat_inst.pattern as u32)))
            .map(|p| p.length)
            .unwrap_or(Tstamp::from_beats(16))
    }

    fn advance_triggers(&mut self, frame_count: usize) -> KqtResult<()> {
        let track = self.master.position.track;
        let Some(order_list) = self.module.tracks.track(track) else {
            return Ok(());
        };
        if order_list.is_empty() {
            return Ok(());
        }

        if self.cursor.map(|(t, _)| t) != Some(track) {
            let pat_length = self.pattern_length(track, 0);
            self.cursor = Some((track, TrackCursor { system: 0, pat_offset: Tstamp::ZERO, pat_length }));
        }
        let (_, mut tc) = self.cursor.unwrap();

        let tempo = self.master.tempo.value();
        let delta = Tstamp::from_frames(frame_count as f64, tempo, self.audio_rate);

        let Some(entry) = order_list.at(tc.system) else {
            self.master.begin_fade_out();
            return Ok(());
        };
        let Some(pattern) = self.module.patterns.get(&(entry.pat_inst.pattern as u32)) else {
            return Ok(());
        };

        let window_end = tc.pat_offset + delta;
        for (ch_idx, column) in pattern.columns.iter().enumerate() {
            if ch_idx >= self.channels.len() {
                break;
            }
            let start_idx = column.from_pos(tc.pat_offset);
            for trigger in &column.triggers()[start_idx..] {
                if trigger.pos >= window_end {
                    break;
                }
                let bound_processor = self.channel_instrument[ch_idx];
                let mut ctx = EventContext {
                    channel: &mut self.channels[ch_idx],
                    voices: &mut self.voices,
                    master: &mut self.master,
                    channel_index: ch_idx as u32,
                    bound_processor,
                };
                if let Err(e) = self.event_handlers.dispatch(&mut ctx, &trigger.event_name, &trigger.args) {
                    log::warn!("trigger '{}' at {:?} rejected: {e}", trigger.event_name, trigger.pos);
                }
            }
        }

        let next_system = tc.system + 1;
        let next_length = self.pattern_length(track, next_system);
        let order_list = self.module.tracks.track(track).expect("checked above");
        let mut it = Cgiter::new(order_list, track, tc.pat_length);
        it.jump(tc.system, tc.pat_offset, tc.pat_length);
        let crossed = it.advance(delta, || next_length);
        let pos = it.position();
        tc.system = pos.system;
        tc.pat_offset = pos.pat_offset;
        if crossed {
            tc.pat_length = self.pattern_length(track, tc.system);
        }

        if it.at_end() && self.master.mode == PlaybackMode::PatternInstance {
            self.master.begin_fade_out();
        }

        self.cursor = Some((track, tc));
        Ok(())
    }

    // -----------------------------------------------------------------
    // Device graph evaluation
    // -----------------------------------------------------------------

    fn render_graph(&mut self, frame_count: usize) {
        for state in self.processors.values_mut() {
            state.mixed.reset_for_block();
        }
        for state in self.passthrough.values_mut() {
            state.reset_for_block();
        }

        let active_voices: Vec<crate::voice::Voice> = self.voices.active_voices().copied().collect();
        let mut to_deactivate = Vec::new();

        let mut outputs: HashMap<DeviceId, Vec<WorkBuffer>> = HashMap::new();

        for &device_id in self.connections.render_order() {
            let Some(device) = self.devices.get(&device_id) else { continue };
            let node = self.connections.node(device_id).cloned().unwrap_or_default();

            let gathered = gather_inputs(&node, &outputs, self.block_size);
            let input_refs: Vec<Option<&WorkBuffer>> = gathered.iter().map(|b| b.as_ref()).collect();

            match device.kind {
                DeviceKind::Processor(_) => {
                    let state = self.processors.get_mut(&device_id).expect("prepared at construction");

                    if state.processor_impl.is_voice_capable() {
                        if let Some(send0) = state.mixed.send_bufs[0].as_mut() {
                            send0.clear(0, frame_count);
                            for voice in active_voices.iter().filter(|v| v.processor == Some(device_id >> 16)) {
                                let channel = &mut self.channels[voice.channel as usize];
                                let ctx = VoiceRenderContext {
                                    frame_count,
                                    audio_rate: self.audio_rate,
                                    tempo: self.master.tempo.value(),
                                    pitch_cents: channel.pitch_cents.value(),
                                    force_db: channel.force_db.value(),
                                    note_on: voice.note_on,
                                    released: voice.released,
                                    rand: &mut channel.voice_random,
                                };
                                let vs = &mut state.voice_states[voice.id];
                                let end = vs.render(&device.params, &ctx, &mut state.temp_voice);
                                send0.mix(&state.temp_voice, 0, frame_count);
                                if end.is_some() {
                                    to_deactivate.push(voice.id);
                                }
                            }
                        }
                    }

                    if state.processor_impl.is_mixed_capable() {
                        for port in 0..DEVICE_PORTS_MAX {
                            if !device.ports.send_exists(port) {
                                continue;
                            }
                            let ctx = MixedRenderContext {
                                inputs: &input_refs,
                                frame_count,
                                audio_rate: self.audio_rate,
                                tempo: self.master.tempo.value(),
                            };
                            if let Some(buf) = state.mixed.send_bufs[port].as_mut() {
                                state.processor_impl.render_mixed(&device.params, &ctx, port as u8, buf);
                            }
                        }
                    }

                    outputs.insert(device_id, state.mixed.send_bufs.iter().map(|b| b.clone().unwrap_or_else(|| WorkBuffer::new(self.block_size))).collect());
                }
                DeviceKind::AudioUnit(_) | DeviceKind::Master => {
                    let state = self.passthrough.get_mut(&device_id).expect("prepared at construction");
                    for (port, input) in gathered.into_iter().enumerate() {
                        if let (Some(input), Some(send)) = (input, state.send_bufs.get_mut(port).and_then(|b| b.as_mut())) {
                            send.copy(&input, 0, frame_count);
                        }
                    }
                    outputs.insert(device_id, state.send_bufs.iter().map(|b| b.clone().unwrap_or_else(|| WorkBuffer::new(self.block_size))).collect());
                }
            }
        }

        for id in to_deactivate {
            self.voices.deactivate(id);
        }
    }

    fn apply_master_gain(&mut self, frame_count: usize) {
        let fade_gain = self.master.step_fade(frame_count, self.audio_rate);
        let volume_gain = crate::math::db_to_scale(self.master.global_volume.value());
        let gain = (fade_gain * volume_gain) as f32;

        if let Some(state) = self.passthrough.get_mut(&MASTER_DEVICE_ID) {
            for buf in state.send_bufs.iter_mut().flatten() {
                for sample in &mut buf.get_contents_mut()[0..frame_count] {
                    *sample *= gain;
                }
            }
        }
    }
}

fn gather_inputs(
    node: &crate::device::connections::DeviceNode,
    outputs: &HashMap<DeviceId, Vec<WorkBuffer>>,
    block_size: usize,
) -> Vec<Option<WorkBuffer>> {
    let mut gathered: Vec<Option<WorkBuffer>> = vec![None; DEVICE_PORTS_MAX];
    for edge in &node.incoming {
        let Some(src_outputs) = outputs.get(&edge.from_device) else { continue };
        let Some(src_buf) = src_outputs.get(edge.from_port as usize) else { continue };
        let to_port = edge.to_port as usize;
        if to_port >= gathered.len() {
            continue;
        }
        let slot = gathered[to_port].get_or_insert_with(|| WorkBuffer::new(block_size));
        slot.mix(src_buf, 0, block_size.min(src_buf.len()));
    }
    gathered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_module() -> Module {
        Module::new()
    }

    #[test]
    fn empty_module_renders_silence() {
        let module = silent_module();
        let registry = ProcessorRegistry::with_builtins();
        let mut player = Player::new(module, &registry, 48_000.0, 64, 4, 4, 120.0).unwrap();
        let rendered = player.process(64).unwrap();
        assert_eq!(rendered, 64);
        let out = player.master_output(0).unwrap();
        assert!(out.get_contents().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn single_volume_processor_passes_mixed_audio_to_master() {
        let mut module = Module::new();
        module.set_data("au_00/proc_00/p_type.json", b"\"volume\"").unwrap();
        module.set_data("au_00/proc_00/p_volume.jsonf", b"0.0").unwrap();
        module.set_data("au_00/p_connections.json", br#"[[0, 0, -1, 0]]"#).unwrap();
        module.set_data("p_connections.json", br#"[[0, 0, -1, 0]]"#).unwrap();

        let registry = ProcessorRegistry::with_builtins();
        let mut player = Player::new(module, &registry, 48_000.0, 64, 4, 4, 120.0).unwrap();
        let rendered = player.process(64).unwrap();
        assert_eq!(rendered, 64);
    }
}
