use bytes::{Buf, BufMut};

use super::{Error, Head, Kind, StreamId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingId {
    HeaderTableSize,
    EnablePush,
    MaxConcurrentStreams,
    InitialWindowSize,
    MaxFrameSize,
    MaxHeaderListSize,
    Unknown(u16),
}

impl SettingId {
    fn from_u16(v: u16) -> SettingId {
        use SettingId::*;
        match v {
            0x1 => HeaderTableSize,
            0x2 => EnablePush,
            0x3 => MaxConcurrentStreams,
            0x4 => InitialWindowSize,
            0x5 => MaxFrameSize,
            0x6 => MaxHeaderListSize,
            other => Unknown(other),
        }
    }

    fn into_u16(self) -> u16 {
        use SettingId::*;
        match self {
            HeaderTableSize => 0x1,
            EnablePush => 0x2,
            MaxConcurrentStreams => 0x3,
            InitialWindowSize => 0x4,
            MaxFrameSize => 0x5,
            MaxHeaderListSize => 0x6,
            Unknown(v) => v,
        }
    }
}

const ACK_FLAG: u8 = 0x1;
const SETTING_LEN: usize = 6;

/// A `SETTINGS` frame: connection-level configuration exchanged at the
/// start of the session (and occasionally afterward).
#[derive(Debug, Default)]
pub struct Settings {
    ack: bool,
    entries: Vec<(SettingId, u32)>,
}

impl Settings {
    pub fn new() -> Settings {
        Settings::default()
    }

    pub fn ack() -> Settings {
        Settings {
            ack: true,
            entries: Vec::new(),
        }
    }

    pub fn is_ack(&self) -> bool {
        self.ack
    }

    pub fn push(&mut self, id: SettingId, value: u32) {
        self.entries.push((id, value));
    }

    pub fn initial_window_size(&self) -> Option<u32> {
        self.get(SettingId::InitialWindowSize)
    }

    pub fn max_frame_size(&self) -> Option<u32> {
        self.get(SettingId::MaxFrameSize)
    }

    fn get(&self, id: SettingId) -> Option<u32> {
        self.entries.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
    }

    pub fn load(head: Head, mut payload: bytes::Bytes) -> Result<Settings, Error> {
        if !head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }

        let ack = head.flag() & ACK_FLAG != 0;

        if ack {
            if !payload.is_empty() {
                return Err(Error::BadFrameSize);
            }
            return Ok(Settings {
                ack: true,
                entries: Vec::new(),
            });
        }

        if payload.len() % SETTING_LEN != 0 {
            return Err(Error::PartialSettingLength);
        }

        let mut entries = Vec::with_capacity(payload.len() / SETTING_LEN);
        while payload.has_remaining() {
            let id = SettingId::from_u16(payload.get_u16());
            let value = payload.get_u32();
            entries.push((id, value));
        }

        Ok(Settings { ack, entries })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let flag = if self.ack { ACK_FLAG } else { 0 };
        let head = Head::new(Kind::Settings, flag, StreamId::ZERO);
        head.encode(self.entries.len() * SETTING_LEN, dst);

        for (id, value) in &self.entries {
            dst.put_u16(id.into_u16());
            dst.put_u32(*value);
        }
    }
}

impl From<Settings> for super::Frame {
    fn from(src: Settings) -> Self {
        super::Frame::Settings(src)
    }
}

/// Default settings sent at session start, per the design's external
/// interface: `INITIAL_WINDOW_SIZE = 32 MiB`, `HEADER_TABLE_SIZE = 65536`,
/// `ENABLE_PUSH = 0`.
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 32 * 1024 * 1024;
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 65_536;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;

/// RFC 7540 §6.9.2: every HTTP/2 connection and stream starts with a
/// 65535-byte flow-control window until changed by SETTINGS/WINDOW_UPDATE.
/// This is the peer's starting window for data *we* send, independent of
/// whatever we advertise about our own receive window.
pub const HTTP2_DEFAULT_WINDOW_SIZE: u32 = 65_535;

pub fn startup_settings() -> Settings {
    let mut settings = Settings::new();
    settings.push(SettingId::InitialWindowSize, DEFAULT_INITIAL_WINDOW_SIZE);
    settings.push(SettingId::HeaderTableSize, DEFAULT_HEADER_TABLE_SIZE);
    settings.push(SettingId::EnablePush, 0);
    settings
}
