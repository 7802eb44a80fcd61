use crate::chord_translator::note_name_to_midi;
use crate::synth::{SynthError, Synthesizer};
use log::{debug, info};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::UdpSocket;
use std::time::Duration;

/// Forwards chords to an external synth as OSC over UDP.
///
/// Messages per chord:
///   /chord/on    [note names...]          (strings)
///   /chord/midi  [midi numbers...]        (ints)
///   /chord/dur   duration in seconds      (float)
pub struct OscSynth {
    target: String,
    socket: Option<UdpSocket>,
}

impl OscSynth {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            socket: None,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn send(&self, socket: &UdpSocket, addr: &str, args: Vec<OscType>) -> Result<(), SynthError> {
        let msg = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let buf = rosc::encoder::encode(&msg)?;
        socket.send_to(&buf, &self.target)?;
        Ok(())
    }
}

impl Synthesizer for OscSynth {
    fn activate(&mut self) -> Result<(), SynthError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        info!("OSC synth → {}", self.target);
        self.socket = Some(socket);
        Ok(())
    }

    fn play_chord(&mut self, notes: &[String], duration: Duration, _at: Duration) -> Result<(), SynthError> {
        let socket = self.socket.as_ref().ok_or(SynthError::NotActivated)?;
        let names = notes.iter().map(|n| OscType::String(n.clone())).collect();
        let midi = notes
            .iter()
            .filter_map(|n| note_name_to_midi(n))
            .map(|m| OscType::Int(m as i32))
            .collect();
        self.send(socket, "/chord/on", names)?;
        self.send(socket, "/chord/midi", midi)?;
        self.send(socket, "/chord/dur", vec![OscType::Float(duration.as_secs_f32())])?;
        debug!("OSC chord {:?}", notes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::decoder::decode_udp;

    #[test]
    fn test_play_before_activate_fails() {
        let mut synth = OscSynth::new("127.0.0.1:9");
        let err = synth
            .play_chord(&["C4".to_string()], Duration::from_millis(250), Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, SynthError::NotActivated));
    }

    #[test]
    fn test_sends_chord_messages() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let mut synth = OscSynth::new(target);
        synth.activate().unwrap();
        let notes: Vec<String> = ["D4", "F4", "A4", "C5"].iter().map(|s| s.to_string()).collect();
        synth.play_chord(&notes, Duration::from_millis(250), Duration::ZERO).unwrap();

        let mut buf = [0u8; 1024];
        let mut addrs = Vec::new();
        for _ in 0..3 {
            let (n, _) = listener.recv_from(&mut buf).unwrap();
            let (_, packet) = decode_udp(&buf[..n]).unwrap();
            match packet {
                OscPacket::Message(msg) => {
                    if msg.addr == "/chord/midi" {
                        assert_eq!(
                            msg.args,
                            vec![OscType::Int(62), OscType::Int(65), OscType::Int(69), OscType::Int(72)]
                        );
                    }
                    addrs.push(msg.addr);
                }
                OscPacket::Bundle(_) => panic!("unexpected bundle"),
            }
        }
        assert_eq!(addrs, vec!["/chord/on", "/chord/midi", "/chord/dur"]);
    }
}
