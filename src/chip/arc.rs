use thiserror::Error;

use super::{
    coordinate_manager::CoordinateManager,
    coords::CoreCoord,
    harvesting::{HarvestingError, HarvestingMask},
    noc::{ensure_translated, NocError, NocId, NocInterface},
    Arch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Busy,
    ShortIdle,
    LongIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcState {
    A0,
    A1,
    A3,
    A5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwType {
    ArcL2,
    FwBundle,
    FwBundleSPI,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArcMsg {
    Nop,
    Test { arg: u32 },
    ArcGoToSleep,

    SetPowerState(PowerState),

    FwVersion(FwType),
    GetSmbusTelemetryAddr,

    SetArcState { state: ArcState },

    ResetSafeClks { arg: u32 },
    ToggleTensixReset { arg: u32 },
    DeassertRiscVReset,
    GetAiclk,
    TriggerReset,
    GetHarvesting,
    TriggerSpiCopyLtoR,
    GetSpiDumpAddr,
    SpiRead { addr: u32 },
    SpiWrite,
    Raw { msg_code: u16, arg0: u16, arg1: u16 },
}

impl ArcMsg {
    pub fn msg_code(&self) -> u16 {
        let short_code = match self {
            ArcMsg::Nop => 0x11,
            ArcMsg::ArcGoToSleep => 0x55,
            ArcMsg::Test { .. } => 0x90,
            ArcMsg::GetSmbusTelemetryAddr => 0x2C,
            ArcMsg::TriggerSpiCopyLtoR => 0x50,
            ArcMsg::SetPowerState(state) => match state {
                PowerState::Busy => 0x52,
                PowerState::ShortIdle => 0x53,
                PowerState::LongIdle => 0x54,
            },
            ArcMsg::TriggerReset => 0x56,
            ArcMsg::GetHarvesting => 0x57,
            ArcMsg::DeassertRiscVReset => 0xba,
            ArcMsg::ResetSafeClks { .. } => 0xbb,
            ArcMsg::ToggleTensixReset { .. } => 0xaf,
            ArcMsg::GetAiclk => 0x34,
            ArcMsg::SetArcState { state } => match state {
                ArcState::A0 => 0xA0,
                ArcState::A1 => 0xA1,
                ArcState::A3 => 0xA3,
                ArcState::A5 => 0xA5,
            },
            ArcMsg::FwVersion(_) => 0xb9,
            ArcMsg::GetSpiDumpAddr => 0x29,
            ArcMsg::SpiRead { .. } => 0x2A,
            ArcMsg::SpiWrite => 0x2B,
            ArcMsg::Raw { msg_code, .. } => *msg_code,
        };

        0xaa00 | short_code
    }

    pub fn args(&self) -> (u16, u16) {
        match self {
            ArcMsg::Raw { arg0, arg1, .. } => (*arg0, *arg1),
            ArcMsg::Test { arg }
            | ArcMsg::ResetSafeClks { arg }
            | ArcMsg::ToggleTensixReset { arg }
            | ArcMsg::SpiRead { addr: arg } => {
                ((arg & 0xFFFF) as u16, ((arg >> 16) & 0xFFFF) as u16)
            }
            ArcMsg::SpiWrite => (0xFFFF, 0xFFFF),
            ArcMsg::Nop
            | ArcMsg::ArcGoToSleep
            | ArcMsg::GetSmbusTelemetryAddr
            | ArcMsg::SetPowerState(_)
            | ArcMsg::DeassertRiscVReset
            | ArcMsg::GetAiclk
            | ArcMsg::TriggerReset
            | ArcMsg::GetHarvesting
            | ArcMsg::GetSpiDumpAddr
            | ArcMsg::TriggerSpiCopyLtoR
            | ArcMsg::SetArcState { .. } => (0, 0),
            ArcMsg::FwVersion(ty) => match ty {
                FwType::ArcL2 => (0, 0),
                FwType::FwBundle => (1, 0),
                FwType::FwBundleSPI => (2, 0),
            },
        }
    }

    /// Decodes a short message code and its arguments. Codes without a dedicated variant,
    /// or with arguments no variant accepts, come back as [`ArcMsg::Raw`].
    pub fn from_values(msg: u16, arg0: u16, arg1: u16) -> Self {
        let arg = ((arg1 as u32) << 16) | arg0 as u32;
        match msg {
            0x11 => ArcMsg::Nop,
            0x34 => ArcMsg::GetAiclk,
            0x56 => ArcMsg::TriggerReset,
            0xbb => ArcMsg::ResetSafeClks { arg },
            0xaf => ArcMsg::ToggleTensixReset { arg },
            0xba => ArcMsg::DeassertRiscVReset,
            0x50 => ArcMsg::TriggerSpiCopyLtoR,
            0x52 => ArcMsg::SetPowerState(PowerState::Busy),
            0x53 => ArcMsg::SetPowerState(PowerState::ShortIdle),
            0x54 => ArcMsg::SetPowerState(PowerState::LongIdle),
            0x57 => ArcMsg::GetHarvesting,
            0x90 => ArcMsg::Test { arg },
            0xA0 => ArcMsg::SetArcState {
                state: ArcState::A0,
            },
            0xA1 => ArcMsg::SetArcState {
                state: ArcState::A1,
            },
            0xA3 => ArcMsg::SetArcState {
                state: ArcState::A3,
            },
            0xA5 => ArcMsg::SetArcState {
                state: ArcState::A5,
            },
            0xB9 if arg <= 2 => ArcMsg::FwVersion(match arg {
                0 => FwType::ArcL2,
                1 => FwType::FwBundle,
                _ => FwType::FwBundleSPI,
            }),
            value => ArcMsg::Raw {
                msg_code: value,
                arg0,
                arg1,
            },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArcMsgProtocolError {
    #[error("Message {0:#x} not recognized")]
    MsgNotRecognized(u16),
    #[error("Timed out while waiting {0:?} for ARC to respond")]
    Timeout(std::time::Duration),
    #[error("ARC is asleep")]
    ArcAsleep,
    #[error("ARC watchdog has triggered")]
    WatchdogTriggered,
    #[error("ARC firmware has not finished booting")]
    NotBooted,
    #[error("Message {0:#x} is still queued for ARC")]
    MessageQueued(u32),
    #[error("Failed to trigger FW interrupt")]
    FwIntFailed,
}

#[derive(Error, Debug)]
pub enum ArcMsgError {
    #[error(transparent)]
    ProtocolError(#[from] ArcMsgProtocolError),

    #[error("{0} has no ARC core")]
    NoArcCore(Arch),

    #[error("{0} does not use the scratch mailbox protocol")]
    UnsupportedArch(Arch),

    #[error(transparent)]
    Harvesting(#[from] HarvestingError),

    #[error(transparent)]
    NocError(#[from] NocError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcMsgOk {
    Ok { rc: u32, arg: u32 },
    OkNoWait,
}

impl ArcMsgOk {
    pub fn arg(&self) -> u32 {
        match self {
            ArcMsgOk::Ok { arg, .. } => *arg,
            ArcMsgOk::OkNoWait => 0,
        }
    }

    pub fn rc(&self) -> u32 {
        match self {
            ArcMsgOk::Ok { rc, .. } => *rc,
            ArcMsgOk::OkNoWait => 0,
        }
    }
}

/// NOC addresses of the ARC reset unit registers the mailbox lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArcMsgAddr {
    pub scratch_base: u64,
    pub arc_misc_cntl: u64,
}

const MSG_REG: u64 = 5;
const RETURN_REG: u64 = 3;

const MSG_ERROR_REPLY: u32 = 0xffffffff;
const WATCHDOG_TRIGGERED: u32 = 0xDEADC0DE;
const BOOT_IN_PROGRESS: u32 = 0x60;

/// Sends messages to ARC firmware on Grayskull and Wormhole through the scratch-register
/// mailbox.
#[derive(Debug, Clone)]
pub struct ArcMessenger {
    arch: Arch,
    arc: CoreCoord,
    addrs: ArcMsgAddr,
    noc_id: NocId,
    timeout: std::time::Duration,
    worker_rows: Vec<u8>,
}

impl ArcMessenger {
    pub fn new(manager: &CoordinateManager) -> Result<Self, ArcMsgError> {
        let arch = manager.arch();
        let addrs = match arch {
            Arch::Grayskull => super::grayskull::ARC_MSG_ADDR,
            Arch::Wormhole => super::wormhole::ARC_MSG_ADDR,
            Arch::Blackhole => return Err(ArcMsgError::UnsupportedArch(arch)),
        };

        Ok(ArcMessenger {
            arch,
            arc: manager.arc_core().ok_or(ArcMsgError::NoArcCore(arch))?,
            addrs,
            noc_id: NocId::Noc0,
            timeout: std::time::Duration::from_secs(1),
            worker_rows: manager.layout().worker_rows(),
        })
    }

    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn noc_id(mut self, noc_id: NocId) -> Self {
        self.noc_id = noc_id;
        self
    }

    /// Translated coordinate of the ARC core messages are sent to.
    pub fn arc_core(&self) -> CoreCoord {
        self.arc
    }

    fn scratch(&self, reg: u64) -> u64 {
        self.addrs.scratch_base + reg * 4
    }

    fn read32<N: NocInterface + ?Sized>(&self, noc: &mut N, addr: u64) -> Result<u32, NocError> {
        noc.noc_read32(self.noc_id, ensure_translated(self.arc)?, addr)
    }

    fn write32<N: NocInterface + ?Sized>(
        &self,
        noc: &mut N,
        addr: u64,
        value: u32,
    ) -> Result<(), NocError> {
        noc.noc_write32(self.noc_id, ensure_translated(self.arc)?, addr, value)
    }

    fn check_msg_safe<N: NocInterface + ?Sized>(&self, noc: &mut N) -> Result<(), ArcMsgError> {
        let s5 = self.read32(noc, self.scratch(MSG_REG))?;

        if s5 == WATCHDOG_TRIGGERED {
            return Err(ArcMsgProtocolError::WatchdogTriggered.into());
        }

        // SCRATCH[5] is wiped once boot completes.
        if s5 == BOOT_IN_PROGRESS {
            return Err(ArcMsgProtocolError::NotBooted.into());
        }

        if s5 == 0xaa00 || (s5 & 0xFFFF) as u16 == ArcMsg::ArcGoToSleep.msg_code() {
            return Err(ArcMsgProtocolError::ArcAsleep.into());
        }

        if s5 & 0xFFFFFF00 == 0xaa00 {
            return Err(ArcMsgProtocolError::MessageQueued(s5).into());
        }

        Ok(())
    }

    /// Returns true if a new interrupt was raised, false if the previous one is still
    /// pending. The firmware handler only takes a few dozen cycles, so a pending interrupt
    /// means ARC is not servicing messages.
    fn trigger_fw_int<N: NocInterface + ?Sized>(&self, noc: &mut N) -> Result<bool, ArcMsgError> {
        let misc = self.read32(noc, self.addrs.arc_misc_cntl)?;

        if misc & (1 << 16) != 0 {
            return Ok(false);
        }

        let misc_bit16_set = misc | (1 << 16);
        self.write32(noc, self.addrs.arc_misc_cntl, misc_bit16_set)?;

        Ok(true)
    }

    pub fn send<N: NocInterface + ?Sized>(
        &self,
        noc: &mut N,
        msg: &ArcMsg,
        wait_for_done: bool,
    ) -> Result<ArcMsgOk, ArcMsgError> {
        let (arg0, arg1) = msg.args();
        let code = msg.msg_code();

        tracing::trace!("{}: sending {msg:?} ({code:#x}) to ARC at {}", self.arch, self.arc);

        self.check_msg_safe(noc)?;

        self.write32(
            noc,
            self.scratch(RETURN_REG),
            arg0 as u32 | ((arg1 as u32) << 16),
        )?;
        self.write32(noc, self.scratch(MSG_REG), code as u32)?;

        if !self.trigger_fw_int(noc)? {
            return Err(ArcMsgProtocolError::FwIntFailed.into());
        }

        if !wait_for_done {
            return Ok(ArcMsgOk::OkNoWait);
        }

        let start = std::time::Instant::now();
        loop {
            let status = self.read32(noc, self.scratch(MSG_REG))?;
            if (status & 0xFFFF) as u16 == code & 0xFF {
                let exit_code = (status >> 16) & 0xFFFF;
                let arg = self.read32(noc, self.scratch(RETURN_REG))?;

                return Ok(ArcMsgOk::Ok { rc: exit_code, arg });
            } else if status == MSG_ERROR_REPLY {
                return Err(ArcMsgProtocolError::MsgNotRecognized(code).into());
            }

            std::thread::sleep(std::time::Duration::from_millis(1));
            if start.elapsed() > self.timeout {
                return Err(ArcMsgProtocolError::Timeout(self.timeout).into());
            }
        }
    }

    /// Asks ARC which worker rows are harvested and converts the answer into a
    /// [`HarvestingMask`] over the manager's layout.
    pub fn read_harvesting_mask<N: NocInterface + ?Sized>(
        &self,
        noc: &mut N,
    ) -> Result<HarvestingMask, ArcMsgError> {
        let raw = self.send(noc, &ArcMsg::GetHarvesting, true)?.arg();
        tracing::debug!("{}: ARC reports harvesting {raw:#x}", self.arch);

        Ok(HarvestingMask::from_firmware(
            self.arch,
            raw,
            &self.worker_rows,
        )?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_round_trip_through_short_form() {
        for msg in [
            ArcMsg::Nop,
            ArcMsg::GetHarvesting,
            ArcMsg::SetPowerState(PowerState::LongIdle),
            ArcMsg::Test { arg: 0x1234_5678 },
            ArcMsg::FwVersion(FwType::FwBundle),
        ] {
            let (arg0, arg1) = msg.args();
            assert_eq!(ArcMsg::from_values(msg.msg_code() & 0xff, arg0, arg1), msg);
        }
    }

    #[test]
    fn unknown_fw_type_is_raw() {
        assert_eq!(
            ArcMsg::from_values(0xb9, 7, 0),
            ArcMsg::Raw {
                msg_code: 0xb9,
                arg0: 7,
                arg1: 0
            }
        );
    }
}
