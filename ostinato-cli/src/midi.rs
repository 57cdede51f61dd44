//! MIDI plumbing: port discovery, keyboard input into the arpeggiator and
//! arpeggiated notes out to a device.

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use ostinato_core::{ArpSender, NoteSink};
use ostinato_types::NoteEvent;

const CLIENT_NAME: &str = "ostinato";

/// Information about an available MIDI port
#[derive(Debug, Clone)]
pub struct MidiPortInfo {
    pub index: usize,
    pub name: String,
}

pub fn input_ports() -> Vec<MidiPortInfo> {
    let Ok(midi_in) = MidiInput::new(CLIENT_NAME) else {
        return Vec::new();
    };
    midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_in
                .port_name(port)
                .ok()
                .map(|name| MidiPortInfo { index, name })
        })
        .collect()
}

pub fn output_ports() -> Vec<MidiPortInfo> {
    let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) else {
        return Vec::new();
    };
    midi_out
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_out
                .port_name(port)
                .ok()
                .map(|name| MidiPortInfo { index, name })
        })
        .collect()
}

/// Connect an input port and forward its key presses to the arpeggiator.
/// Messages on every channel are accepted. The returned connection must be
/// kept alive for as long as input is wanted.
pub fn connect_input(port_index: usize, sender: ArpSender) -> Result<MidiInputConnection<()>, String> {
    let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| e.to_string())?;
    let ports = midi_in.ports();
    let port = ports
        .get(port_index)
        .ok_or_else(|| format!("Invalid input port index: {}", port_index))?;
    let port_name = midi_in
        .port_name(port)
        .unwrap_or_else(|_| "Unknown".to_string());

    let connection = midi_in
        .connect(
            port,
            "ostinato-input",
            move |_timestamp, message, _| match parse_note_message(message) {
                Some(NoteEvent::NoteOn { note, velocity }) => sender.note_on(note, velocity),
                Some(NoteEvent::NoteOff { note }) => sender.note_off(note),
                None => {}
            },
            (),
        )
        .map_err(|e| e.to_string())?;

    log::info!(target: "midi", "input connected: {}", port_name);
    Ok(connection)
}

/// Decode a raw MIDI message into a key event. Note-on with velocity 0 is a
/// note-off; everything else is ignored.
pub fn parse_note_message(data: &[u8]) -> Option<NoteEvent> {
    if data.len() < 3 {
        return None;
    }

    let note = data[1] & 0x7F;
    match data[0] & 0xF0 {
        0x80 => Some(NoteEvent::NoteOff { note }),
        0x90 => {
            let velocity = data[2] & 0x7F;
            if velocity == 0 {
                Some(NoteEvent::NoteOff { note })
            } else {
                Some(NoteEvent::NoteOn { note, velocity })
            }
        }
        _ => None,
    }
}

/// Sends arpeggiated notes to a MIDI output port on a fixed channel.
pub struct MidiOutSink {
    connection: MidiOutputConnection,
    channel: u8,
}

impl MidiOutSink {
    pub fn connect(port_index: usize, channel: u8) -> Result<Self, String> {
        let channel = channel.min(15);
        let midi_out = MidiOutput::new(CLIENT_NAME).map_err(|e| e.to_string())?;
        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| format!("Invalid output port index: {}", port_index))?;
        let port_name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let connection = midi_out
            .connect(port, "ostinato-output")
            .map_err(|e| e.to_string())?;

        log::info!(target: "midi", "output connected: {} (channel {})", port_name, channel + 1);
        Ok(Self { connection, channel })
    }

    fn send(&mut self, message: [u8; 3]) {
        if let Err(e) = self.connection.send(&message) {
            log::warn!(target: "midi", "send failed: {}", e);
        }
    }
}

impl NoteSink for MidiOutSink {
    fn note_on(&mut self, note: u8, velocity: u8) {
        self.send(note_on_bytes(self.channel, note, velocity));
    }

    fn note_off(&mut self, note: u8) {
        self.send(note_off_bytes(self.channel, note));
    }
}

impl Drop for MidiOutSink {
    fn drop(&mut self) {
        // All Notes Off (CC 123)
        self.send([0xB0 | self.channel, 123, 0]);
    }
}

fn note_on_bytes(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
}

fn note_off_bytes(channel: u8, note: u8) -> [u8; 3] {
    [0x80 | (channel & 0x0F), note & 0x7F, 0]
}

/// Fallback sink when no output port is chosen: prints each event.
pub struct PrintSink;

impl NoteSink for PrintSink {
    fn note_on(&mut self, note: u8, velocity: u8) {
        println!("on  {:>3} vel {:>3}", note, velocity);
    }

    fn note_off(&mut self, note: u8) {
        println!("off {:>3}", note);
    }
}
