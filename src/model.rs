// src/model.rs
//
// Module owns everything loaded from model data: the device graph (one
// top-level AudioUnit per instrument/effect slot plus the master
// Connections that mixes them), patterns, and track/order lists. Loading
// goes entirely through `set_data`, which routes a slash-delimited key
// (`"au_00/proc_00/p_volume.jsonf"`-shaped, per spec) to the right part of
// the tree and parses its value with a Streader -- nothing else touches
// raw model bytes.

use std::collections::HashMap;

use crate::audio_unit::{AudioUnit, AU_SINK};
use crate::device::connections::Connections;
use crate::device::{Device, DeviceId, DeviceKind, ParamValue, DEVICE_PORTS_MAX};
use crate::error::{KqtError, KqtResult};
use crate::pattern::{OrderList, OrderListEntry, Pattern, TrackList};
use crate::streader::Streader;
use crate::tstamp::Tstamp;

/// Sentinel device id for the master mix, distinct from every
/// `au_output_device_id`/`proc_device_id` (which are built from small
/// `au_NN`/`proc_NN` indices and never reach `u32::MAX`).
pub const MASTER_DEVICE_ID: DeviceId = u32::MAX;

/// Sentinel `au_NN` index meaning "route straight to master" in
/// `Module::master_edges`.
pub const MASTER_SINK: u32 = u32::MAX;

pub struct Module {
    pub audio_units: HashMap<u32, AudioUnit>,
    pub master_connections: Connections,
    /// Raw top-level edges in terms of `au_NN` indices, mirroring
    /// `AudioUnit::edges`: `(from_au, from_port, to_au, to_port)`, with
    /// `to_au == MASTER_SINK` meaning "into the master mix".
    pub master_edges: Vec<(u32, u8, u32, u8)>,
    pub patterns: HashMap<u32, Pattern>,
    pub tracks: TrackList,
    pub random_seed: u64,
}

impl Default for Module {
    fn default() -> Self {
        Self {
            audio_units: HashMap::new(),
            master_connections: Connections::default(),
            master_edges: Vec::new(),
            patterns: HashMap::new(),
            tracks: TrackList::default(),
            random_seed: 0,
        }
    }
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one `(key, bytes)` model-data write. Keys are slash
    /// delimited: a leading `au_NN/...` or `pat_NNN/...` segment selects
    /// the subtree, with the remainder interpreted by that subtree's own
    /// rules. Unrecognised top-level prefixes are accepted as no-ops
    /// (forward compatibility with keys this build does not understand):
    /// unknown keys are ignored, not rejected.
    pub fn set_data(&mut self, key: &str, bytes: &[u8]) -> KqtResult<()> {
        let mut parts = key.splitn(2, '/');
        let head = parts.next().unwrap_or("");
        let rest = parts.next();

        if let Some(idx) = parse_indexed(head, "au_") {
            let rest = rest.ok_or_else(|| KqtError::Format(format!("key '{key}' missing subpath")))?;
            let au = self.audio_units.entry(idx).or_insert_with(|| AudioUnit::new(idx, true));
            set_audio_unit_data(au, rest, bytes)?;
            return Ok(());
        }

        if let Some(idx) = parse_indexed(head, "song_") {
            let rest = rest.unwrap_or("");
            if rest == "p_order_list.json" {
                self.tracks.set_track(idx, parse_order_list(bytes)?);
            }
            return Ok(());
        }

        if let Some(idx) = parse_indexed(head, "pat_") {
            let rest = rest.unwrap_or("");
            set_pattern_data(self.patterns.entry(idx).or_insert_with(|| Pattern::new(Tstamp::from_beats(16), 1)), rest, bytes)?;
            return Ok(());
        }

        if head == "p_random_seed.jsoni" {
            let mut sr = Streader::new(bytes);
            self.random_seed = sr.read_int()?.max(0) as u64;
            return Ok(());
        }

        if head == "p_connections.json" {
            self.master_edges = parse_edges_json(bytes, MASTER_SINK)?;
            return Ok(());
        }

        Ok(())
    }

    pub fn audio_unit(&self, id: u32) -> Option<&AudioUnit> {
        self.audio_units.get(&id)
    }

    /// Flatten every audio unit's processors and one level of internal
    /// wiring, plus the top-level master wiring, into a single device
    /// table and edge list (see DESIGN.md for why nesting collapses to
    /// one level). Each audio unit contributes two synthetic devices: an
    /// input interface (what the outer graph feeds it) and an output
    /// interface (what the outer graph reads back) -- kept distinct so an
    /// effect that both reads its own input internally *and* feeds its own
    /// output from an internal processor (a dry/wet mix) is two edges
    /// through a DAG, not a false self-cycle through one merged node.
    pub fn build_render_graph(&self) -> (HashMap<DeviceId, Device>, Vec<(DeviceId, u8, DeviceId, u8)>) {
        let mut devices = HashMap::new();
        devices.insert(MASTER_DEVICE_ID, Device::new(MASTER_DEVICE_ID, DeviceKind::Master));
        let mut edges = Vec::new();

        for au in self.audio_units.values() {
            let output_id = au_output_device_id(au.id);
            let input_id = au_input_device_id(au.id);
            for id in [output_id, input_id] {
                let mut interface = Device::new(id, DeviceKind::AudioUnit(au.id));
                for p in 0..DEVICE_PORTS_MAX {
                    interface.ports.set_receive(p, true);
                    interface.ports.set_send(p, true);
                }
                devices.insert(id, interface);
            }

            for &device_id in au.proc_table.values() {
                if let Some(device) = au.devices.get(&device_id) {
                    devices.insert(device_id, device.clone());
                }
            }

            for &(from_idx, from_port, to_idx, to_port) in &au.edges {
                let from_id = if from_idx == AU_SINK {
                    input_id
                } else {
                    *au.proc_table.get(&from_idx).unwrap_or(&proc_device_id(au.id, from_idx))
                };
                let to_id = if to_idx == AU_SINK {
                    output_id
                } else {
                    *au.proc_table.get(&to_idx).unwrap_or(&proc_device_id(au.id, to_idx))
                };
                edges.push((from_id, from_port, to_id, to_port));
            }
        }

        for &(from_au, from_port, to_au, to_port) in &self.master_edges {
            let from_id = au_output_device_id(from_au);
            let to_id = if to_au == MASTER_SINK { MASTER_DEVICE_ID } else { au_input_device_id(to_au) };
            edges.push((from_id, from_port, to_id, to_port));
        }

        (devices, edges)
    }
}

fn parse_indexed(head: &str, prefix: &str) -> Option<u32> {
    head.strip_prefix(prefix).and_then(|n| n.parse().ok())
}

fn set_audio_unit_data(au: &mut AudioUnit, key: &str, bytes: &[u8]) -> KqtResult<()> {
    let mut parts = key.splitn(2, '/');
    let head = parts.next().unwrap_or("");
    let rest = parts.next();

    if let Some(idx) = parse_indexed(head, "proc_") {
        let rest = rest.ok_or_else(|| KqtError::Format(format!("proc key '{key}' missing subpath")))?;
        let device_id = proc_device_id(au.id, idx);
        let device = au
            .devices
            .entry(device_id)
            .or_insert_with(|| Device::new(device_id, DeviceKind::Processor("")));
        au.proc_table.insert(idx, device_id);
        set_processor_data(device, rest, bytes)?;
        return Ok(());
    }

    if let Some(idx) = parse_indexed(head, "au_") {
        let rest = rest.unwrap_or("");
        let nested = au.au_table.entry(idx).or_insert_with(|| AudioUnit::new(idx, false));
        set_audio_unit_data(nested, rest, bytes)?;
        return Ok(());
    }

    if head == "p_connections.json" {
        au.edges = parse_edges_json(bytes, crate::audio_unit::AU_SINK)?;
        return Ok(());
    }

    Ok(())
}

/// Parse `[[from, from_port, to, to_port], ...]`, with `to == -1` mapped
/// to `sink_sentinel` (either `MASTER_SINK` or `AU_SINK` depending on
/// which level is being parsed).
fn parse_edges_json(bytes: &[u8], sink_sentinel: u32) -> KqtResult<Vec<(u32, u8, u32, u8)>> {
    let mut sr = Streader::new(bytes);
    let value = sr.read_all()?;
    let rows = value.as_list().ok_or_else(|| KqtError::Format("connections data must be a list".to_string()))?;
    let mut edges = Vec::with_capacity(rows.len());
    for row in rows {
        let fields = row.as_list().ok_or_else(|| KqtError::Format("connection row must be a list".to_string()))?;
        if fields.len() != 4 {
            return Err(KqtError::Format("connection row must be [from, from_port, to, to_port]".to_string()));
        }
        let from = fields[0].as_int().ok_or_else(|| KqtError::Format("connection 'from' must be an int".to_string()))?;
        let from_port = fields[1].as_int().ok_or_else(|| KqtError::Format("connection from_port must be an int".to_string()))?;
        let to = fields[2].as_int().ok_or_else(|| KqtError::Format("connection 'to' must be an int".to_string()))?;
        let to_port = fields[3].as_int().ok_or_else(|| KqtError::Format("connection to_port must be an int".to_string()))?;
        let from = if from < 0 { sink_sentinel } else { from as u32 };
        let to = if to < 0 { sink_sentinel } else { to as u32 };
        edges.push((from, from_port as u8, to, to_port as u8));
    }
    Ok(edges)
}

/// Parse `[[pattern, instance], ...]`, placing each entry at the system
/// position given by its index in the list.
fn parse_order_list(bytes: &[u8]) -> KqtResult<OrderList> {
    let mut sr = Streader::new(bytes);
    let value = sr.read_all()?;
    let rows = value.as_list().ok_or_else(|| KqtError::Format("order list data must be a list".to_string()))?;
    let mut order_list = OrderList::default();
    for (system_pos, row) in rows.iter().enumerate() {
        let fields = row.as_list().ok_or_else(|| KqtError::Format("order list entry must be [pattern, instance]".to_string()))?;
        if fields.len() != 2 {
            return Err(KqtError::Format("order list entry must have exactly 2 elements".to_string()));
        }
        let pattern = fields[0].as_int().ok_or_else(|| KqtError::Format("order list pattern must be an int".to_string()))?;
        let instance = fields[1].as_int().ok_or_else(|| KqtError::Format("order list instance must be an int".to_string()))?;
        order_list.push(OrderListEntry { system_pos: system_pos as u32, pat_inst: crate::value::PatInstRef { pattern, instance } });
    }
    Ok(order_list)
}

/// Bit reserved in a processor device id's low 16 bits to flag the audio
/// unit's synthetic input interface, so `proc_NN` indices (which occupy
/// `1..=0x7fff`) never collide with it.
const AU_INPUT_BIT: u32 = 0x8000;

fn proc_device_id(au_id: u32, proc_idx: u32) -> DeviceId {
    (au_id << 16) | (proc_idx + 1)
}

/// The device id standing in for an audio unit's own output interface
/// within the flat render graph. Never collides with a `proc_device_id`
/// for the same `au_id` since those are always offset by at least one, nor
/// with `au_input_device_id` which sets `AU_INPUT_BIT`.
pub fn au_output_device_id(au_id: u32) -> DeviceId {
    au_id << 16
}

/// The device id standing in for an audio unit's own input interface
/// (what the outer graph feeds it). Kept distinct from
/// `au_output_device_id` so an audio unit that both reads its own input
/// internally and feeds its own output from a processor forms a genuine
/// two-edge DAG path rather than a one-node cycle.
pub fn au_input_device_id(au_id: u32) -> DeviceId {
    (au_id << 16) | AU_INPUT_BIT
}

fn set_processor_data(device: &mut Device, key: &str, bytes: &[u8]) -> KqtResult<()> {
    if key == "p_type.json" {
        let mut sr = Streader::new(bytes);
        let tag = sr.read_string()?;
        let tag = leak_type_tag(&tag);
        device.kind = DeviceKind::Processor(tag);
        apply_default_ports(device, tag);
        return Ok(());
    }

    let mut sr = Streader::new(bytes);
    if key.ends_with(".jsonb") {
        device.params.set(key.to_string(), ParamValue::Bool(sr.read_bool()?));
    } else if key.ends_with(".jsoni") {
        device.params.set(key.to_string(), ParamValue::Int(sr.read_int()?));
    } else if key.ends_with(".jsonf") {
        device.params.set(key.to_string(), ParamValue::Float(sr.read_float()?));
    } else if key == "p_env_force.json" {
        let env = parse_envelope(&mut sr)?;
        device.params.set(key.to_string(), ParamValue::Envelope(env));
    } else if key.ends_with(".json") {
        match sr.read_value()? {
            crate::value::Value::Tstamp(t) => device.params.set(key.to_string(), ParamValue::Tstamp(t)),
            crate::value::Value::String(s) => device.params.set(key.to_string(), ParamValue::String(s)),
            _ => {}
        }
    }
    Ok(())
}

/// A minimal envelope encoding: `[[x0, y0], [x1, y1], ...]`.
fn parse_envelope(sr: &mut Streader) -> KqtResult<crate::envelope::Envelope> {
    let value = sr.read_value()?;
    let items = value
        .as_list()
        .ok_or_else(|| KqtError::Format("envelope data must be a list of nodes".to_string()))?;
    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        let pair = item
            .as_list()
            .ok_or_else(|| KqtError::Format("envelope node must be [x, y]".to_string()))?;
        if pair.len() != 2 {
            return Err(KqtError::Format("envelope node must have exactly 2 elements".to_string()));
        }
        let x = pair[0].as_float().ok_or_else(|| KqtError::Format("envelope x must be numeric".to_string()))?;
        let y = pair[1].as_float().ok_or_else(|| KqtError::Format("envelope y must be numeric".to_string()))?;
        nodes.push((x, y));
    }
    let mut env = crate::envelope::Envelope::new();
    env.set_nodes(nodes);
    Ok(env)
}

/// Leaking the type tag is acceptable: processor type names come from a
/// small, fixed vocabulary and are loaded once per model, not per note --
/// this trades a handful of bytes for `&'static str` typed dispatch
/// through the rest of the render path.
fn leak_type_tag(tag: &str) -> &'static str {
    match tag {
        "volume" => "volume",
        "panning" => "panning",
        "pitch" => "pitch",
        "force" => "force",
        "noise" => "noise",
        "pulse" => "pulse",
        "sample" => "sample",
        "stream" => "stream",
        "slope" => "slope",
        "compress" => "compress",
        "debug" => "debug",
        _ => Box::leak(tag.to_string().into_boxed_str()),
    }
}

/// Receive/send port existence is fixed per processor type rather than
/// declared in model data (the set of built-in processor types is closed,
/// and every one has a known fixed port shape). `panning` is the one
/// built-in with two output ports (left/right); everything else uses port 0
/// for both its one input (if any) and its one output.
fn apply_default_ports(device: &mut Device, tag: &'static str) {
    let takes_input = matches!(tag, "volume" | "panning" | "slope" | "compress" | "debug");
    if takes_input {
        device.ports.set_receive(0, true);
    }
    device.ports.set_send(0, true);
    if tag == "panning" {
        device.ports.set_send(1, true);
    }
}

fn set_pattern_data(pattern: &mut Pattern, key: &str, bytes: &[u8]) -> KqtResult<()> {
    if key == "p_pattern.json" {
        let mut sr = Streader::new(bytes);
        pattern.length = sr.read_tstamp()?;
        return Ok(());
    }

    if let Some(rest) = key.strip_prefix("col_") {
        let (idx_str, tail) = rest.split_once('/').unwrap_or((rest, ""));
        let idx: usize = idx_str.parse().map_err(|_| KqtError::Format(format!("bad column index in '{key}'")))?;
        if tail == "p_triggers.json" {
            while pattern.columns.len() <= idx {
                pattern.columns.push(crate::pattern::Column::default());
            }
            let mut sr = Streader::new(bytes);
            let list = sr.read_all()?;
            let rows = list.as_list().ok_or_else(|| KqtError::Format("triggers must be a list".to_string()))?;
            for row in rows {
                let fields = row.as_list().ok_or_else(|| KqtError::Format("trigger row must be a list".to_string()))?;
                if fields.len() != 3 {
                    return Err(KqtError::Format("trigger row must be [pos, name, args]".to_string()));
                }
                let pos = fields[0].as_tstamp().ok_or_else(|| KqtError::Format("trigger pos must be a tstamp".to_string()))?;
                let name = fields[1]
                    .as_str()
                    .ok_or_else(|| KqtError::Format("trigger name must be a string".to_string()))?
                    .to_string();
                pattern.columns[idx].insert(crate::pattern::Trigger { pos, event_name: name, args: fields[2].clone() });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_processor_float_param() {
        let mut module = Module::new();
        module.set_data("au_00/proc_00/p_type.json", b"\"volume\"").unwrap();
        module.set_data("au_00/proc_00/p_volume.jsonf", b"6.0").unwrap();

        let au = module.audio_unit(0).unwrap();
        let device = au.processor_device(0).unwrap();
        assert_eq!(device.kind, DeviceKind::Processor("volume"));
        assert_eq!(device.params.get_float("p_volume.jsonf", -1.0), 6.0);
    }

    #[test]
    fn unknown_top_level_key_is_ignored() {
        let mut module = Module::new();
        assert!(module.set_data("totally_unknown_key", b"1").is_ok());
    }

    #[test]
    fn routes_pattern_length() {
        let mut module = Module::new();
        module.set_data("pat_000/p_pattern.json", br#""4/1""#).unwrap();
        assert_eq!(module.patterns.get(&0).unwrap().length.beats, 4);
    }

    #[test]
    fn routes_song_order_list() {
        let mut module = Module::new();
        module.set_data("song_00/p_order_list.json", br#"[[3, 0], [1, 0]]"#).unwrap();
        let track = module.tracks.track(0).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.at(0).unwrap().pat_inst.pattern, 3);
        assert_eq!(track.at(1).unwrap().pat_inst.pattern, 1);
    }

    #[test]
    fn routes_pattern_triggers() {
        let mut module = Module::new();
        module
            .set_data("pat_000/col_00/p_triggers.json", br#"[["0/1", "n+", 0.0]]"#)
            .unwrap();
        let pattern = module.patterns.get(&0).unwrap();
        assert_eq!(pattern.columns[0].triggers().len(), 1);
        assert_eq!(pattern.columns[0].triggers()[0].event_name, "n+");
    }
}
