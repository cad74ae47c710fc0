// src/event_handler.rs
//
// Dispatches a parsed Trigger to the channel/voice-pool/master state it
// targets. Each event name maps to a small validator+handler pair: the
// validator checks the argument `Value` has the right shape (returning a
// KqtError::Argument on mismatch, never panicking on malformed pattern
// data), the handler applies it. Keeping validation and application
// separate means a dry "does this pattern even parse" pass (used by
// `Module::set_data` before swapping in new data) can run the validators
// alone.

use std::collections::HashMap;

use crate::channel::Channel;
use crate::envelope::SliderMode;
use crate::error::{KqtError, KqtResult};
use crate::master::MasterParams;
use crate::tstamp::Tstamp;
use crate::value::Value;
use crate::voice::pool::VoicePool;
use crate::voice::Priority;

/// Everything one event handler needs to act: the firing channel's
/// persistent state, the shared voice pool (for note on/off), and master
/// params (for global events like tempo slides).
pub struct EventContext<'a> {
    pub channel: &'a mut Channel,
    pub voices: &'a mut VoicePool,
    pub master: &'a mut MasterParams,
    pub channel_index: u32,
    pub bound_processor: Option<u32>,
}

pub type EventHandlerFn = fn(&mut EventContext, &Value) -> KqtResult<()>;

#[derive(Default)]
pub struct EventHandlerTable {
    handlers: HashMap<&'static str, EventHandlerFn>,
}

impl EventHandlerTable {
    pub fn new() -> Self {
        let mut table = Self::default();
        table.register_builtins();
        table
    }

    pub fn register(&mut self, name: &'static str, handler: EventHandlerFn) {
        self.handlers.insert(name, handler);
    }

    pub fn dispatch(&self, ctx: &mut EventContext, name: &str, args: &Value) -> KqtResult<()> {
        match self.handlers.get(name) {
            Some(handler) => handler(ctx, args),
            None => Err(KqtError::Argument(format!("unknown event '{name}'"))),
        }
    }

    fn register_builtins(&mut self) {
        self.register("n+", note_on);
        self.register("n-", note_off);
        self.register("/p", set_pitch_slide_length);
        self.register("/f", set_force_slide_length);
        self.register("(", channel_mute);
        self.register(")", channel_unmute);
    }
}

fn expect_float(args: &Value, event: &'static str) -> KqtResult<f64> {
    args.as_float()
        .ok_or_else(|| KqtError::Argument(format!("'{event}' expects a numeric argument")))
}

fn expect_tstamp(args: &Value, event: &'static str) -> KqtResult<Tstamp> {
    args.as_tstamp()
        .ok_or_else(|| KqtError::Argument(format!("'{event}' expects a tstamp argument")))
}

/// `n+ <pitch in cents>`: reserve (or preempt) a voice at new-note
/// priority and seed its pitch/force from the channel's current sliders.
fn note_on(ctx: &mut EventContext, args: &Value) -> KqtResult<()> {
    let pitch = expect_float(args, "n+")?;

    let group_id = ctx.channel.channel_random.next_u64();
    let voice_id = ctx
        .voices
        .reserve(ctx.bound_processor, group_id, ctx.channel_index, Priority::NewNote)
        .ok_or_else(|| KqtError::Resource("voice pool exhausted: note dropped".to_string()))?;

    ctx.channel.active_group_id = Some(group_id);
    ctx.channel.reseed_voice_random(ctx.master.random_seed, group_id);
    ctx.channel.pitch_cents.start(pitch, Tstamp::ZERO);
    ctx.channel.pitch_cents.change_target(pitch, Tstamp::ZERO);

    log::debug!("channel {}: note-on voice {voice_id} pitch {pitch}c", ctx.channel_index);
    Ok(())
}

/// `n-`: release the channel's currently active voice group (their
/// processors' force envelopes continue into their release tail).
fn note_off(ctx: &mut EventContext, _args: &Value) -> KqtResult<()> {
    if let Some(group_id) = ctx.channel.active_group_id.take() {
        ctx.voices.release_group(group_id);
    }
    Ok(())
}

fn set_pitch_slide_length(ctx: &mut EventContext, args: &Value) -> KqtResult<()> {
    let length = expect_tstamp(args, "/p")?;
    ctx.channel.pitch_cents.set_mode(SliderMode::Linear);
    ctx.channel.pitch_cents.change_target(ctx.channel.pitch_cents.target(), length);
    Ok(())
}

fn set_force_slide_length(ctx: &mut EventContext, args: &Value) -> KqtResult<()> {
    let length = expect_tstamp(args, "/f")?;
    ctx.channel.force_db.change_target(ctx.channel.force_db.target(), length);
    Ok(())
}

fn channel_mute(ctx: &mut EventContext, _args: &Value) -> KqtResult<()> {
    ctx.channel.mute = true;
    Ok(())
}

fn channel_unmute(ctx: &mut EventContext, _args: &Value) -> KqtResult<()> {
    ctx.channel.mute = false;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::master::MasterParams;
    use crate::voice::pool::VoicePool;

    fn make_ctx<'a>(channel: &'a mut Channel, voices: &'a mut VoicePool, master: &'a mut MasterParams) -> EventContext<'a> {
        EventContext { channel, voices, master, channel_index: 0, bound_processor: Some(1) }
    }

    #[test]
    fn note_on_reserves_a_voice() {
        let mut channel = Channel::new(48_000.0, 120.0, 1, 0);
        let mut voices = VoicePool::new(4);
        let mut master = MasterParams::new(48_000.0, 120.0, 1);
        let table = EventHandlerTable::new();

        let mut ctx = make_ctx(&mut channel, &mut voices, &mut master);
        table.dispatch(&mut ctx, "n+", &Value::Float(0.0)).unwrap();
        assert_eq!(voices.active_voices().count(), 1);
    }

    #[test]
    fn note_on_rejects_non_numeric_argument() {
        let mut channel = Channel::new(48_000.0, 120.0, 1, 0);
        let mut voices = VoicePool::new(4);
        let mut master = MasterParams::new(48_000.0, 120.0, 1);
        let table = EventHandlerTable::new();

        let mut ctx = make_ctx(&mut channel, &mut voices, &mut master);
        let err = table.dispatch(&mut ctx, "n+", &Value::None).unwrap_err();
        assert!(matches!(err, KqtError::Argument(_)));
    }

    #[test]
    fn note_off_releases_active_group() {
        let mut channel = Channel::new(48_000.0, 120.0, 1, 0);
        let mut voices = VoicePool::new(4);
        let mut master = MasterParams::new(48_000.0, 120.0, 1);
        let table = EventHandlerTable::new();

        let mut ctx = make_ctx(&mut channel, &mut voices, &mut master);
        table.dispatch(&mut ctx, "n+", &Value::Float(0.0)).unwrap();
        table.dispatch(&mut ctx, "n-", &Value::None).unwrap();
        assert!(voices.active_voices().all(|v| v.released));
    }

    #[test]
    fn unknown_event_is_an_argument_error() {
        let mut channel = Channel::new(48_000.0, 120.0, 1, 0);
        let mut voices = VoicePool::new(4);
        let mut master = MasterParams::new(48_000.0, 120.0, 1);
        let table = EventHandlerTable::new();

        let mut ctx = make_ctx(&mut channel, &mut voices, &mut master);
        let err = table.dispatch(&mut ctx, "??", &Value::None).unwrap_err();
        assert!(matches!(err, KqtError::Argument(_)));
    }
}
