// tests/scenarios.rs
//
// The six literal end-to-end scenarios every implementation of this
// render pipeline must reproduce: silence, a bypass-only effect, a
// dry/wet mix, one step of pattern iteration, voice-pool preemption under
// saturation, and a control-signal slide landing on its target.

use kunquat_core::device::{DeviceParams, ParamValue};
use kunquat_core::handle::Handle;
use kunquat_core::model::Module;
use kunquat_core::pattern::{Column, OrderList, OrderListEntry, Pattern, Trigger};
use kunquat_core::player::Player;
use kunquat_core::processor::{MixedRenderContext, ProcessorImpl, ProcessorRegistry};
use kunquat_core::processors::stream::Stream;
use kunquat_core::tstamp::Tstamp;
use kunquat_core::value::{PatInstRef, Value};
use kunquat_core::voice::pool::VoicePool;
use kunquat_core::voice::Priority;
use kunquat_core::work_buffer::WorkBuffer;

const PATTERN: [f32; 4] = [1.0, 0.5, 0.5, 0.5];

fn repeated_pattern(n: usize) -> Vec<f32> {
    (0..n).map(|i| PATTERN[i % PATTERN.len()]).collect()
}

/// Scenario 1: new handle, validate, play(128) -> 128 frames of silence.
#[test]
fn silence() {
    let mut handle = Handle::new();
    handle.set_audio_buffer_size(128);
    assert!(handle.validate());
    assert_eq!(handle.get_frames_available(), 128);
    let audio = handle.get_audio(0).unwrap();
    assert!(audio.get_contents().iter().all(|&s| s == 0.0));
}

/// Minimal instrument (debug voice source + pitch source, debug wired to
/// its audio unit's output) feeding a single effect audio unit into
/// master. Shared setup for scenarios 2 and 3; the effect's own internal
/// wiring is supplied by the caller.
fn wire_instrument_and_effect(module: &mut Module, effect_edges: &str) {
    module.set_data("au_00/proc_00/p_type.json", b"\"debug\"").unwrap();
    module.set_data("au_00/proc_01/p_type.json", b"\"pitch\"").unwrap();
    module.set_data("au_00/p_connections.json", br#"[[0, 0, -1, 0]]"#).unwrap();

    module.set_data("au_01/p_connections.json", effect_edges.as_bytes()).unwrap();

    module.set_data("p_connections.json", br#"[[0, 0, 1, 0], [1, 0, -1, 0]]"#).unwrap();
}

fn fire_note_on(player: &mut Player) {
    player.bind_channel_instrument(0, 0);
    player.fire_event(0, "n+", &Value::Float(-3600.0)).unwrap();
}

/// Scenario 2: identity effect. An effect audio unit containing only an
/// in->out edge passes the instrument's debug pattern through unchanged.
#[test]
fn identity_effect() {
    let mut module = Module::new();
    wire_instrument_and_effect(&mut module, r#"[[-1, 0, -1, 0]]"#);

    let registry = ProcessorRegistry::with_builtins();
    let mut player = Player::new(module, &registry, 220.0, 64, 4, 1, 120.0).unwrap();
    fire_note_on(&mut player);

    player.process(40).unwrap();
    let out = player.master_output(0).unwrap();
    assert_eq!(&out.get_contents()[..40], repeated_pattern(40).as_slice());
}

/// Scenario 3: volume-doubled bypass mix. The effect runs the debug
/// pattern through a +6 dB volume processor AND a direct bypass, both
/// summing into the effect's output -- so the result is the dry pattern
/// plus a gained copy of it.
///
/// Deviation from the literal scenario: the walkthrough states the exact
/// result `[3.0, 1.5, 1.5, 1.5]`, i.e. +6 dB treated as a clean doubling.
/// `volume.rs` computes real dB-to-linear gain (`10^(dB/20)`), under which
/// +6 dB is ~1.995x, not exactly 2x -- this processor already has its own
/// unit test asserting against that real value rather than 2.0. Rather
/// than special-case the volume processor to hit an exact 2x at +6 dB
/// (which would make its gain curve wrong everywhere else), this test
/// asserts against the real-dB-math expected value with a float epsilon,
/// and documents here that it therefore reproduces the scenario's shape
/// (dry + gained bypass summed) rather than its literal printed numbers.
#[test]
fn volume_doubled_bypass_mix() {
    let mut module = Module::new();
    wire_instrument_and_effect(
        &mut module,
        r#"[[-1, 0, 0, 0], [0, 0, -1, 0], [-1, 0, -1, 0]]"#,
    );
    module.set_data("au_01/proc_00/p_type.json", b"\"volume\"").unwrap();
    module.set_data("au_01/proc_00/p_volume.jsonf", b"6.0").unwrap();

    let registry = ProcessorRegistry::with_builtins();
    let mut player = Player::new(module, &registry, 220.0, 64, 4, 1, 120.0).unwrap();
    fire_note_on(&mut player);

    player.process(40).unwrap();
    let out = player.master_output(0).unwrap();
    let gain = 1.0 + 10f32.powf(6.0 / 20.0);
    for (i, &sample) in out.get_contents()[..40].iter().enumerate() {
        let expected = PATTERN[i % PATTERN.len()] * gain;
        assert!((sample - expected).abs() < 1e-4, "sample {i}: {sample} vs {expected}");
    }
}

/// Scenario 4: column iteration. A 16-beat pattern with a single trigger
/// at beat 0 yields exactly one trigger on the first query, and advancing
/// by the full pattern length lands exactly on its end.
#[test]
fn column_iteration() {
    let mut pattern = Pattern::new(Tstamp::from_beats(16), 1);
    pattern.columns[0] = {
        let mut col = Column::default();
        col.insert(Trigger { pos: Tstamp::ZERO, event_name: "n+".to_string(), args: Value::Float(0.0) });
        col
    };

    let start = pattern.columns[0].from_pos(Tstamp::ZERO);
    let visible = &pattern.columns[0].triggers()[start..];
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].event_name, "n+");

    let mut order_list = OrderList::default();
    order_list.push(OrderListEntry { system_pos: 0, pat_inst: PatInstRef { pattern: 0, instance: 0 } });

    let mut it = kunquat_core::cgiter::Cgiter::new(&order_list, 0, pattern.length);
    let crossed = it.advance(Tstamp::from_beats(16), || Tstamp::from_beats(16));
    assert!(!crossed, "no further system is defined, so this stays within the pattern");
    assert_eq!(it.position().pat_offset, Tstamp::from_beats(16));
}

/// Scenario 5: voice pool preemption. A pool of 4 fired five times at
/// equal (new-note) priority must recycle the oldest voice on the fifth
/// fire rather than drop the note, and never hold more than 4 live voices.
#[test]
fn voice_pool_preemption() {
    let mut pool = VoicePool::new(4);
    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(pool.reserve(Some(0), i, 0, Priority::NewNote).unwrap());
    }
    assert_eq!(pool.active_voices().count(), 4);

    let fifth = pool.reserve(Some(0), 4, 0, Priority::NewNote).unwrap();
    assert_eq!(fifth, ids[0], "the oldest voice is the weakest under equal priority");
    assert_eq!(pool.active_voices().count(), 4);

    let active_ids: std::collections::HashSet<_> = pool.active_voices().map(|v| v.id).collect();
    assert_eq!(active_ids.len(), 4, "no two live voices share a slot");
}

/// Scenario 6: stream slide. A stream processor sliding from 0 to 1.0
/// over one beat at tempo 60 (== 1 second) reaches exactly its target at
/// 48000 frames and the slide's midpoint at 24000 frames, at 48 kHz.
#[test]
fn stream_slide() {
    let mut params = DeviceParams::default();
    params.set("p_target.jsonf", ParamValue::Float(1.0));
    params.set("p_slide_length.json", ParamValue::Tstamp(Tstamp::from_beats(1)));

    let mut stream = Stream::default();
    let ctx = MixedRenderContext { inputs: &[], frame_count: 24_000, audio_rate: 48_000.0, tempo: 60.0 };

    let mut first_half = WorkBuffer::new(24_000);
    stream.render_mixed(&params, &ctx, 0, &mut first_half);
    assert!((first_half.get_contents()[24_000 - 1] - 0.5).abs() < 1e-6);

    let mut second_half = WorkBuffer::new(24_000);
    stream.render_mixed(&params, &ctx, 0, &mut second_half);
    assert!((second_half.get_contents()[24_000 - 1] - 1.0).abs() < 1.0e-6);
}
