use crate::chip::{
    coordinate_manager::CoordinateManager,
    coords::CoreCoord,
    field::Field,
    noc::{ensure_translated, NocError, NocId, NocInterface},
    Arch,
};

/// Base of the ARC reset unit as seen from the NOC.
pub const RESET_UNIT_BASE: u64 = 0x80030000;
pub const SCRATCH_RAM_BASE: u64 = RESET_UNIT_BASE + 0x400;

pub(crate) const fn scratch_ram(index: u64) -> u64 {
    SCRATCH_RAM_BASE + 4 * index
}

const BOOT_STATUS: u64 = scratch_ram(2);
const MSG_QUEUE_INFO: u64 = scratch_ram(11);

const MSG_QUEUE_INDEX: u8 = 2;
const MSG_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(500);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorType {
    #[error("Message code not recognized {0:x}")]
    MsgNotRecognized(u32),
    #[error("While processing message hit error {0}")]
    UnknownErrorCode(u8),
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Timed out in {phase} after {}s", .timeout.as_secs_f32())]
    Timeout {
        phase: String,
        timeout: std::time::Duration,
    },
    #[error("Selected out of range queue ({index} >= {queue_count})")]
    QueueIndexOutOfRange { index: u32, queue_count: u32 },

    #[error("ARC firmware is not ready to accept messages")]
    NotReady,

    #[error("ARC reports {queue_count} message queues of {queue_size} entries")]
    InvalidQueueSizing { queue_size: u32, queue_count: u32 },

    #[error("{0} has no ARC core")]
    NoArcCore(Arch),

    #[error("{0} does not use the message queue protocol")]
    UnsupportedArch(Arch),

    #[error("ProtocolError: {0}")]
    ProtocolError(ProtocolErrorType),

    #[error(transparent)]
    NocError(#[from] NocError),
}

/// One ARC message queue set. Each queue holds `queue_size` request entries followed by
/// `queue_size` response entries of `N` words, behind a header of read/write pointers.
#[derive(Clone, Debug)]
pub struct MessageQueue<const N: usize> {
    pub header_size: u32,
    pub entry_size: u32,

    pub queue_base: u64,
    pub queue_count: u32,

    pub queue_size: u32,

    pub fw_int: Field,

    pub arc: CoreCoord,
    pub noc_id: NocId,
}

impl<const N: usize> MessageQueue<N> {
    fn check_index(&self, index: u8) -> Result<(), MessageError> {
        if self.queue_size == 0 || self.queue_count == 0 {
            return Err(MessageError::InvalidQueueSizing {
                queue_size: self.queue_size,
                queue_count: self.queue_count,
            });
        }

        if index as u32 >= self.queue_count {
            return Err(MessageError::QueueIndexOutOfRange {
                index: index as u32,
                queue_count: self.queue_count,
            });
        }

        Ok(())
    }

    fn get_base(&self, index: u8) -> u64 {
        let msg_queue_size = 2 * self.queue_size * (self.entry_size * 4) + (self.header_size * 4);
        self.queue_base + (index as u64 * msg_queue_size as u64)
    }

    fn qread32<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
        index: u8,
        offset: u32,
    ) -> Result<u32, MessageError> {
        Ok(noc.noc_read32(
            self.noc_id,
            self.arc,
            self.get_base(index) + (4 * offset as u64),
        )?)
    }

    fn qwrite32<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
        index: u8,
        offset: u32,
        value: u32,
    ) -> Result<(), MessageError> {
        Ok(noc.noc_write32(
            self.noc_id,
            self.arc,
            self.get_base(index) + (4 * offset as u64),
            value,
        )?)
    }

    fn trigger_int<I: NocInterface + ?Sized>(&self, noc: &mut I) -> Result<bool, MessageError> {
        let value = self.fw_int.read(noc, self.noc_id, self.arc)?;

        if value & 1 != 0 {
            return Ok(false);
        }

        self.fw_int.write(noc, self.noc_id, self.arc, value | 1)?;

        Ok(true)
    }

    fn push_request<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
        index: u8,
        request: &[u32; N],
        timeout: std::time::Duration,
    ) -> Result<(), MessageError> {
        let request_queue_wptr = self.qread32(noc, index, 0)?;

        let start_time = std::time::Instant::now();
        loop {
            let request_queue_rptr = self.qread32(noc, index, 4)?;

            // Check if the queue is full
            if request_queue_rptr.abs_diff(request_queue_wptr) % (2 * self.queue_size)
                != self.queue_size
            {
                break;
            }

            let elapsed = start_time.elapsed();
            if elapsed > timeout {
                return Err(MessageError::Timeout {
                    phase: "push".to_string(),
                    timeout: elapsed,
                });
            }
        }

        let request_entry_offset =
            self.header_size + (request_queue_wptr % self.queue_size) * N as u32;
        for (i, word) in request.iter().copied().enumerate() {
            self.qwrite32(noc, index, request_entry_offset + i as u32, word)?;
        }

        let request_queue_wptr = (request_queue_wptr + 1) % (2 * self.queue_size);
        self.qwrite32(noc, index, 0, request_queue_wptr)?;

        if !self.trigger_int(noc)? {
            tracing::debug!("ARC firmware interrupt already pending");
        }

        Ok(())
    }

    fn pop_response<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
        index: u8,
        result: &mut [u32; N],
        timeout: std::time::Duration,
    ) -> Result<(), MessageError> {
        let response_queue_rptr = self.qread32(noc, index, 1)?;

        let start_time = std::time::Instant::now();
        loop {
            let response_queue_wptr = self.qread32(noc, index, 5)?;

            // Break if there is some data in the queue
            if response_queue_wptr != response_queue_rptr {
                break;
            }

            let elapsed = start_time.elapsed();
            if elapsed > timeout {
                return Err(MessageError::Timeout {
                    phase: "pop".to_string(),
                    timeout: elapsed,
                });
            }
        }

        let response_entry_offset = self.header_size
            + (self.queue_size + (response_queue_rptr % self.queue_size)) * N as u32;
        for (i, word) in result.iter_mut().enumerate() {
            *word = self.qread32(noc, index, response_entry_offset + i as u32)?;
        }

        let response_queue_rptr = (response_queue_rptr + 1) % (2 * self.queue_size);
        self.qwrite32(noc, index, 1, response_queue_rptr)?;

        Ok(())
    }

    pub fn send_message<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
        index: u8,
        mut request: [u32; N],
        timeout: std::time::Duration,
    ) -> Result<[u32; N], MessageError> {
        self.check_index(index)?;

        self.push_request(noc, index, &request, timeout)?;
        self.pop_response(noc, index, &mut request, timeout)?;

        Ok(request)
    }

    pub fn get_queue_info<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
        index: u8,
    ) -> Result<QueueInfo, MessageError> {
        self.check_index(index)?;

        Ok(QueueInfo {
            req_rptr: self.qread32(noc, index, 4)?,
            req_wptr: self.qread32(noc, index, 0)?,
            resp_rptr: self.qread32(noc, index, 1)?,
            resp_wptr: self.qread32(noc, index, 5)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueInfo {
    pub req_rptr: u32,
    pub req_wptr: u32,
    pub resp_rptr: u32,
    pub resp_wptr: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArcFwInitStatus {
    NotStarted = 0,
    Started = 1,
    Done = 2,
    Error = 3,
    Unknown(u8),
}

impl From<u8> for ArcFwInitStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => ArcFwInitStatus::NotStarted,
            1 => ArcFwInitStatus::Started,
            2 => ArcFwInitStatus::Done,
            3 => ArcFwInitStatus::Error,
            other => ArcFwInitStatus::Unknown(other),
        }
    }
}

impl ArcFwInitStatus {
    pub fn ready(&self) -> bool {
        match self {
            ArcFwInitStatus::NotStarted
            | ArcFwInitStatus::Started
            | ArcFwInitStatus::Unknown(_) => false,
            ArcFwInitStatus::Done | ArcFwInitStatus::Error => true,
        }
    }
}

pub fn arc_fw_init_status<I: NocInterface + ?Sized>(
    noc: &mut I,
    noc_id: NocId,
    arc: CoreCoord,
) -> Result<ArcFwInitStatus, NocError> {
    let boot_status_0 = noc.noc_read32(noc_id, ensure_translated(arc)?, BOOT_STATUS)?;
    Ok(ArcFwInitStatus::from(((boot_status_0 >> 1) & 0x3) as u8))
}

/// Sends messages to Blackhole ARC firmware through its message queues.
#[derive(Debug, Clone)]
pub struct BlackholeMessenger {
    arc: CoreCoord,
    noc_id: NocId,
    timeout: std::time::Duration,
}

impl BlackholeMessenger {
    pub fn new(manager: &CoordinateManager) -> Result<Self, MessageError> {
        let arch = manager.arch();
        if arch != Arch::Blackhole {
            return Err(MessageError::UnsupportedArch(arch));
        }

        Ok(BlackholeMessenger {
            arc: manager.arc_core().ok_or(MessageError::NoArcCore(arch))?,
            noc_id: NocId::Noc0,
            timeout: MSG_TIMEOUT,
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

    pub fn arc_core(&self) -> CoreCoord {
        self.arc
    }

    pub fn fw_init_status<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
    ) -> Result<ArcFwInitStatus, NocError> {
        arc_fw_init_status(noc, self.noc_id, self.arc)
    }

    /// Bit 0 of the boot status is raised once the message handler is running, which can
    /// be before the rest of the firmware reports ready.
    pub fn check_arc_msg_safe<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
    ) -> Result<bool, NocError> {
        let boot_status_0 = noc.noc_read32(self.noc_id, ensure_translated(self.arc)?, BOOT_STATUS)?;
        Ok(boot_status_0 & 0x1 == 1)
    }

    pub fn message_queue<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
    ) -> Result<MessageQueue<8>, MessageError> {
        let arc = ensure_translated(self.arc)?;

        let message_queue_info_address = noc.noc_read32(self.noc_id, arc, MSG_QUEUE_INFO)?;
        let queue_base = noc.noc_read32(self.noc_id, arc, message_queue_info_address as u64)?;
        let queue_sizing =
            noc.noc_read32(self.noc_id, arc, message_queue_info_address as u64 + 4)?;
        let queue_size = queue_sizing & 0xFF;
        let queue_count = (queue_sizing >> 8) & 0xFF;
        if queue_size == 0 || queue_count == 0 {
            return Err(MessageError::InvalidQueueSizing {
                queue_size,
                queue_count,
            });
        }

        Ok(MessageQueue {
            header_size: 8,
            entry_size: 8,
            queue_base: queue_base as u64,
            queue_size,
            queue_count,
            fw_int: Field::bits(RESET_UNIT_BASE + 0x100, 16, 19),
            arc,
            noc_id: self.noc_id,
        })
    }

    /// Returns the status byte, return code and the seven response data words.
    pub fn send<I: NocInterface + ?Sized>(
        &self,
        noc: &mut I,
        msg_id: u32,
        request: Option<[u32; 7]>,
    ) -> Result<(u8, u16, [u32; 7]), MessageError> {
        if !self.check_arc_msg_safe(noc)? {
            return Err(MessageError::NotReady);
        }

        let queue = self.message_queue(noc)?;

        let mut actual_request = [0; 8];
        actual_request[0] = msg_id;
        if let Some(request) = request {
            for (a, b) in request.iter().copied().zip(actual_request[1..].iter_mut()) {
                *b = a;
            }
        }

        tracing::trace!("Blackhole: sending message {msg_id:#x} to ARC at {}", self.arc);

        let response = queue.send_message(noc, MSG_QUEUE_INDEX, actual_request, self.timeout)?;
        let status = (response[0] & 0xFF) as u8;
        let rc = (response[0] >> 16) as u16;

        if status < 240 {
            let mut data = [0; 7];
            data.copy_from_slice(&response[1..]);
            Ok((status, rc, data))
        } else if status == 0xFF {
            Err(MessageError::ProtocolError(
                ProtocolErrorType::MsgNotRecognized(msg_id),
            ))
        } else {
            Err(MessageError::ProtocolError(
                ProtocolErrorType::UnknownErrorCode(status),
            ))
        }
    }
}
