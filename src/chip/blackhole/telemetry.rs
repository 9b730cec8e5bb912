use std::collections::BTreeMap;

use num_derive::FromPrimitive;

use crate::chip::{
    blackhole::arc::{arc_fw_init_status, scratch_ram, ArcFwInitStatus},
    coordinate_manager::{CoordinateManager, ManagerOptions},
    coords::CoreCoord,
    harvesting::{HarvestingError, HarvestingMask},
    noc::{ensure_translated, NocError, NocId, NocInterface},
    soc::SocLayout,
    Arch,
};

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error(transparent)]
    NocError(#[from] NocError),

    #[error(transparent)]
    Harvesting(#[from] HarvestingError),

    #[error("{0} has no ARC core")]
    NoArcCore(Arch),

    #[error("Telemetry is not ready yet")]
    TelemetryNotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum TelemetryTag {
    BoardIdHigh = 1,
    BoardIdLow = 2,
    AsicId = 3,
    HarvestingState = 4,
    UpdateTelemSpeed = 5,
    VCORE = 6,
    TDP = 7,
    TDC = 8,
    VddLimits = 9,
    ThmLimits = 10,
    AsicTemperature = 11,
    VregTemperature = 12,
    BoardTemperature = 13,
    AICLK = 14,
    AXICLK = 15,
    ARCCLK = 16,
    L2CPUCLK0 = 17,
    L2CPUCLK1 = 18,
    L2CPUCLK2 = 19,
    L2CPUCLK3 = 20,
    EthLiveStatus = 21,
    DdrStatus = 22,
    DdrSpeed = 23,
    EthFwVersion = 24,
    DdrFwVersion = 25,
    BmAppFwVersion = 26,
    BmBlFwVersion = 27,
    FlashBundleVersion = 28,
    CmFwVersion = 29,
    L2cpuFwVersion = 30,
    FanSpeed = 31,
    TimerHeartbeat = 32,
    TelemEnumCount = 33,
    EnabledTensixCol = 34,
    EnabledEth = 35,
    EnabledGddr = 36,
    EnabledL2Cpu = 37,
    PcieUsage = 38,
    InputCurrent = 39,
    NocTranslation = 40,
    FanRPM = 41,
    Gddr0_1Temp = 42,
    Gddr2_3Temp = 43,
    Gddr4_5Temp = 44,
    Gddr6_7Temp = 45,
    Gddr0_1TempCorrErrs = 46,
    Gddr2_3TempCorrErrs = 47,
    Gddr4_5TempCorrErrs = 48,
    Gddr6_7TempCorrErrs = 49,
    GddrUncorrErrs = 50,
    MaxGddrTemp = 51,
    AsicLocation = 52,
}

const TELEMETRY_TABLE_DATA: u64 = scratch_ram(12);
const TELEMETRY_TABLE_ADDR: u64 = scratch_ram(13);

const CSM_RANGE: std::ops::RangeInclusive<u64> = 0x10000000..=0x1007FFFF;

/// Location of every telemetry value ARC publishes, read once after boot.
#[derive(Debug, Clone)]
pub struct Telemetry {
    // Key is tag, value is word offset into the data table
    entries: BTreeMap<u16, u16>,

    table_data: u64,
    arc: CoreCoord,
    noc_id: NocId,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TelemetryData(BTreeMap<u16, u32>);

impl TelemetryData {
    pub fn get(&self, tag: TelemetryTag) -> Option<u32> {
        self.0.get(&(tag as u16)).copied()
    }

    pub fn tags(&self) -> impl Iterator<Item = (TelemetryTag, u32)> + '_ {
        self.0.iter().filter_map(|(tag, value)| {
            num_traits::FromPrimitive::from_u16(*tag).map(|tag| (tag, *value))
        })
    }

    pub fn translation_enabled(&self) -> bool {
        self.get(TelemetryTag::NocTranslation)
            .map(|v| v != 0)
            .unwrap_or(false)
    }

    pub fn enabled_tensix_columns(&self) -> u32 {
        self.get(TelemetryTag::EnabledTensixCol).unwrap_or(0x3fff)
    }

    pub fn enabled_gddr(&self) -> u32 {
        self.get(TelemetryTag::EnabledGddr).unwrap_or(0xff)
    }

    pub fn enabled_ethernet(&self) -> u32 {
        self.get(TelemetryTag::EnabledEth).unwrap_or(0x3fff)
    }

    /// Harvesting and translation state of the chip, ready to build a manager over `layout`.
    pub fn manager_options(&self, layout: &SocLayout) -> Result<ManagerOptions, HarvestingError> {
        let tensix = HarvestingMask::from_firmware(
            Arch::Blackhole,
            self.enabled_tensix_columns(),
            &layout.worker_columns(),
        )?;
        let gddr = HarvestingMask::from_enabled(self.enabled_gddr(), layout.dram.len());

        Ok(ManagerOptions::new()
            .harvesting_mask(tensix)
            .dram_harvesting_mask(gddr)
            .noc_translation(self.translation_enabled()))
    }
}

impl Telemetry {
    /// Locates the telemetry table through the ARC core of `manager`. Harvesting never moves
    /// ARC, so an unharvested manager works.
    pub fn new<I: NocInterface + ?Sized>(
        noc: &mut I,
        manager: &CoordinateManager,
    ) -> Result<Self, TelemetryError> {
        let arc = manager
            .arc_core()
            .ok_or(TelemetryError::NoArcCore(manager.arch()))?;
        let arc = ensure_translated(arc)?;
        let noc_id = NocId::Noc0;

        if arc_fw_init_status(noc, noc_id, arc)? != ArcFwInitStatus::Done {
            return Err(TelemetryError::TelemetryNotReady);
        }

        let telemetry_table_data = noc.noc_read32(noc_id, arc, TELEMETRY_TABLE_DATA)? as u64;
        let telemetry_table_addr = noc.noc_read32(noc_id, arc, TELEMETRY_TABLE_ADDR)? as u64;

        // Both tables live in CSM; anything else means firmware has not published them
        if !CSM_RANGE.contains(&telemetry_table_addr) || !CSM_RANGE.contains(&telemetry_table_data)
        {
            return Err(TelemetryError::TelemetryNotReady);
        }

        let entry_count = noc.noc_read32(noc_id, arc, telemetry_table_addr + 4)?;

        let mut map = BTreeMap::new();
        for index in 0..entry_count as u64 {
            let entry = noc.noc_read32(noc_id, arc, telemetry_table_addr + 8 + 4 * index)?;

            let tag = (entry & 0xFFFF) as u16;
            let offset = ((entry >> 16) & 0xFFFF) as u16;
            map.insert(tag, offset);
        }

        tracing::debug!("Blackhole: found {} telemetry entries", map.len());

        Ok(Telemetry {
            entries: map,
            table_data: telemetry_table_data,
            arc,
            noc_id,
        })
    }

    pub fn read<I: NocInterface + ?Sized>(&self, noc: &mut I) -> Result<TelemetryData, TelemetryError> {
        let mut map = BTreeMap::new();
        for (tag, offset) in &self.entries {
            let value = noc.noc_read32(self.noc_id, self.arc, self.table_data + 4 * *offset as u64)?;
            map.insert(*tag, value);
        }

        Ok(TelemetryData(map))
    }
}
