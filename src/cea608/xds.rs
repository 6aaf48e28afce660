//! XDS (eXtended Data Services): the 608 field-2 side channel carrying
//! program metadata, decoded in parallel with caption text.
//!
//! Grounded on `original_source/src/xds.c`'s class/type packet framing
//! and checksum.

/// The 8 XDS class values, CEA-608 Table 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XdsClass {
    Current,
    Future,
    Channel,
    Misc,
    PublicService,
    Reserved,
    Private,
    End,
}

impl XdsClass {
    /// Decodes the class a start *or* continuation code belongs to.
    /// Odd `b1` in `0x01..=0x0D` opens a packet; even `b1` in
    /// `0x02..=0x0E` continues one. Both halves of a class's pair share
    /// the same `(b1-1)/2` class index (e.g. 0x01 and 0x02 are both
    /// class 0), which is how a continuation code picks its packet back
    /// up without repeating the odd start code.
    fn from_b1(b1: u8) -> Option<Self> {
        let class_index = (b1.checked_sub(1))? / 2;
        Some(match class_index {
            0 => XdsClass::Current,
            1 => XdsClass::Future,
            2 => XdsClass::Channel,
            3 => XdsClass::Misc,
            4 => XdsClass::PublicService,
            5 => XdsClass::Reserved,
            6 => XdsClass::Private,
            7 => XdsClass::End,
            _ => return None,
        })
    }
}

/// A fully reassembled, checksum-verified XDS packet.
#[derive(Debug, Clone)]
pub struct XdsPacket {
    pub class: XdsClass,
    pub xds_type: u8,
    pub payload: Vec<u8>,
}

/// Notifications the pipeline's activity interface should be informed of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XdsEvent {
    ProgramName(String),
    NetworkName(String),
    CallLetters(String),
}

#[derive(Default)]
struct PendingPacket {
    class: Option<XdsClass>,
    xds_type: Option<u8>,
    bytes: Vec<u8>,
}

/// Buffers up to 9 concurrently interleaved `(class, type)` packets and
/// emits completed, checksum-verified ones.
pub struct XdsDecoder {
    pending: Vec<PendingPacket>,
    /// Index into `pending` that the next data pair (or `0x0F` close)
    /// applies to; set by the most recent start or continuation code.
    current: Option<usize>,
    last_program_name: Option<String>,
    last_call_letters: Option<String>,
}

const MAX_CONCURRENT_PACKETS: usize = 9;

impl Default for XdsDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl XdsDecoder {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(MAX_CONCURRENT_PACKETS),
            current: None,
            last_program_name: None,
            last_call_letters: None,
        }
    }

    /// Feeds one field-2 `(b1, b2)` pair. Returns a completed packet (if
    /// `b1 == 0x0F` closed one and its checksum verified) and any
    /// activity-interface event it produced.
    pub fn feed(&mut self, b1: u8, b2: u8) -> (Option<XdsPacket>, Option<XdsEvent>) {
        if b1 == 0x0F {
            return (self.close_packet(b2), None);
        }

        if (0x01..=0x0D).contains(&b1) && b1 % 2 == 1 {
            self.open_packet(b1, b2);
        } else if (0x02..=0x0E).contains(&b1) && b1 % 2 == 0 {
            self.continue_packet(b1, b2);
        } else {
            // Plain data bytes: append to whichever packet a prior start
            // or continuation code selected.
            self.append_to_current(b1, b2);
        }
        (None, None)
    }

    /// Finds the pending packet matching this exact `(class, type)`, the
    /// same pairing both a start and a continuation code name.
    fn find_pending(&self, class: XdsClass, xds_type: u8) -> Option<usize> {
        self.pending
            .iter()
            .position(|p| p.class == Some(class) && p.xds_type == Some(xds_type))
    }

    fn reserve_slot(&mut self, class: XdsClass, xds_type: u8) -> usize {
        if let Some(idx) = self.find_pending(class, xds_type) {
            return idx;
        }
        if self.pending.len() >= MAX_CONCURRENT_PACKETS {
            self.pending.remove(0);
        }
        self.pending.push(PendingPacket::default());
        self.pending.len() - 1
    }

    fn open_packet(&mut self, b1: u8, b2: u8) {
        let Some(class) = XdsClass::from_b1(b1) else { return };
        let idx = self.reserve_slot(class, b2);
        // Whatever was in this slot belonged to an interrupted packet.
        self.pending[idx] = PendingPacket {
            class: Some(class),
            xds_type: Some(b2),
            bytes: vec![b1, b2],
        };
        self.current = Some(idx);
    }

    fn continue_packet(&mut self, b1: u8, b2: u8) {
        let Some(class) = XdsClass::from_b1(b1) else { return };
        // The continuation code itself isn't added to the packet; it
        // only re-selects which pending packet subsequent data belongs
        // to, which is how two classes can interleave mid-packet.
        if let Some(idx) = self.find_pending(class, b2) {
            self.current = Some(idx);
            return;
        }
        let idx = self.reserve_slot(class, b2);
        self.pending[idx] = PendingPacket {
            class: Some(class),
            xds_type: Some(b2),
            bytes: Vec::new(),
        };
        self.current = Some(idx);
    }

    fn append_to_current(&mut self, b1: u8, b2: u8) {
        if let Some(entry) = self.current.and_then(|idx| self.pending.get_mut(idx)) {
            entry.bytes.push(b1);
            entry.bytes.push(b2);
        }
    }

    fn close_packet(&mut self, b2: u8) -> Option<XdsPacket> {
        let idx = self.current.take()?;
        if idx >= self.pending.len() {
            return None;
        }
        let entry = self.pending.remove(idx);
        let class = entry.class?;
        let xds_type = entry.xds_type?;
        if entry.bytes.len() < 2 {
            return None;
        }

        let sum: u32 = entry
            .bytes
            .iter()
            .map(|&b| b as u32)
            .chain(std::iter::once(0x0Fu32))
            .sum();
        let checksum = (sum + b2 as u32) % 128;
        if checksum != 0 {
            return None;
        }

        let payload = entry.bytes[2..].to_vec();
        let packet = XdsPacket {
            class,
            xds_type,
            payload,
        };
        Some(packet)
    }

    /// Interprets a completed packet, updating cached program identity
    /// state and returning an activity event when the program name or
    /// call letters changed.
    pub fn interpret(&mut self, packet: &XdsPacket) -> Option<XdsEvent> {
        match (packet.class, packet.xds_type) {
            (XdsClass::Current | XdsClass::Future, 0x03) => {
                let name = decode_xds_string(&packet.payload);
                if self.last_program_name.as_deref() != Some(name.as_str()) {
                    self.last_program_name = Some(name.clone());
                    return Some(XdsEvent::ProgramName(name));
                }
                None
            }
            (XdsClass::Channel, 0x02) => {
                let letters = decode_xds_string(&packet.payload);
                if self.last_call_letters.as_deref() != Some(letters.as_str()) {
                    self.last_call_letters = Some(letters.clone());
                    return Some(XdsEvent::CallLetters(letters));
                }
                None
            }
            (XdsClass::Channel, 0x01) => Some(XdsEvent::NetworkName(decode_xds_string(&packet.payload))),
            _ => None,
        }
    }
}

fn decode_xds_string(payload: &[u8]) -> String {
    payload
        .iter()
        .filter(|&&b| (0x20..=0x7F).contains(&b))
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end()
        .to_string()
}
