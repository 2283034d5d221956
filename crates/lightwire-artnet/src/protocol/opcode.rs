//! Art-Net OpCodes

use std::fmt;

/// Every OpCode defined by Art-Net 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OpCode {
    Poll = 0x2000,
    PollReply = 0x2100,
    DiagData = 0x2300,
    Command = 0x2400,
    /// OpOutput and OpDmx share this value
    Dmx = 0x5000,
    Nzs = 0x5100,
    Address = 0x6000,
    Input = 0x7000,
    TodRequest = 0x8000,
    TodData = 0x8100,
    TodControl = 0x8200,
    Rdm = 0x8300,
    RdmSub = 0x8400,
    VideoSetup = 0xa010,
    VideoPalette = 0xa020,
    VideoData = 0xa040,
    MacMaster = 0xf000,
    MacSlave = 0xf100,
    FirmwareMaster = 0xf200,
    FirmwareReply = 0xf300,
    FileTnMaster = 0xf400,
    FileFnMaster = 0xf500,
    FileFnReply = 0xf600,
    IpProg = 0xf800,
    IpProgReply = 0xf900,
    Media = 0x9000,
    MediaPatch = 0x9100,
    MediaControl = 0x9200,
    MediaControlReply = 0x9300,
    TimeCode = 0x9700,
    TimeSync = 0x9800,
    Trigger = 0x9900,
    Directory = 0x9a00,
    DirectoryReply = 0x9b00,
}

impl OpCode {
    /// OpOutput, the protocol name for DMX output
    pub const OUTPUT: OpCode = OpCode::Dmx;

    pub fn from_u16(value: u16) -> Option<Self> {
        use OpCode::*;
        let op = match value {
            0x2000 => Poll,
            0x2100 => PollReply,
            0x2300 => DiagData,
            0x2400 => Command,
            0x5000 => Dmx,
            0x5100 => Nzs,
            0x6000 => Address,
            0x7000 => Input,
            0x8000 => TodRequest,
            0x8100 => TodData,
            0x8200 => TodControl,
            0x8300 => Rdm,
            0x8400 => RdmSub,
            0xa010 => VideoSetup,
            0xa020 => VideoPalette,
            0xa040 => VideoData,
            0xf000 => MacMaster,
            0xf100 => MacSlave,
            0xf200 => FirmwareMaster,
            0xf300 => FirmwareReply,
            0xf400 => FileTnMaster,
            0xf500 => FileFnMaster,
            0xf600 => FileFnReply,
            0xf800 => IpProg,
            0xf900 => IpProgReply,
            0x9000 => Media,
            0x9100 => MediaPatch,
            0x9200 => MediaControl,
            0x9300 => MediaControlReply,
            0x9700 => TimeCode,
            0x9800 => TimeSync,
            0x9900 => Trigger,
            0x9a00 => Directory,
            0x9b00 => DirectoryReply,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl From<OpCode> for u16 {
    fn from(op: OpCode) -> Self {
        op as u16
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Op{:?} ({:#06x})", self, self.as_u16())
    }
}
