use std::collections::{BTreeSet, HashMap};

use super::coords::{CoreType, XyPair};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Grid size {0} has a zero dimension")]
    ZeroGrid(XyPair),

    #[error("Layout has no worker cores")]
    EmptyWorkers,

    #[error("{core_type} core {coord} lies outside the {grid} grid")]
    OutsideGrid {
        core_type: CoreType,
        coord: XyPair,
        grid: XyPair,
    },

    #[error("Core {coord} is listed as both {first} and {second}")]
    Duplicate {
        coord: XyPair,
        first: CoreType,
        second: CoreType,
    },

    #[error("{workers} workers do not fill the {columns}x{rows} grid spanned by their columns and rows")]
    IncompleteWorkerGrid {
        columns: usize,
        rows: usize,
        workers: usize,
    },

    #[error("DRAM channel {channel} has {ports} ports, expected {expected}")]
    RaggedDramChannels {
        channel: usize,
        ports: usize,
        expected: usize,
    },
}

/// The complete, unharvested NOC0 layout of one chip.
///
/// Every list holds physical coordinates. Logical order for DRAM, Ethernet, PCIe, ARC and
/// router-only cores is the order they appear in here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocLayout {
    pub grid_size: XyPair,
    pub workers: Vec<XyPair>,
    /// One entry per channel, one coordinate per port.
    pub dram: Vec<Vec<XyPair>>,
    pub ethernet: Vec<XyPair>,
    pub pcie: Vec<XyPair>,
    pub arc: Vec<XyPair>,
    pub router_only: Vec<XyPair>,

    pub worker_l1_size: u64,
    pub eth_l1_size: u64,
    pub dram_bank_size: u64,
}

impl SocLayout {
    pub fn new(grid_size: XyPair, workers: Vec<XyPair>) -> Self {
        Self {
            grid_size,
            workers,
            dram: Vec::new(),
            ethernet: Vec::new(),
            pcie: Vec::new(),
            arc: Vec::new(),
            router_only: Vec::new(),
            worker_l1_size: 0,
            eth_l1_size: 0,
            dram_bank_size: 0,
        }
    }

    /// Every worker in the cartesian product of `columns` and `rows`.
    pub fn worker_grid(grid_size: XyPair, columns: &[u8], rows: &[u8]) -> Self {
        let workers = rows
            .iter()
            .flat_map(|y| columns.iter().map(move |x| XyPair::new(*x, *y)))
            .collect();
        Self::new(grid_size, workers)
    }

    pub fn dram(mut self, dram: Vec<Vec<XyPair>>) -> Self {
        self.dram = dram;
        self
    }

    pub fn ethernet(mut self, ethernet: Vec<XyPair>) -> Self {
        self.ethernet = ethernet;
        self
    }

    pub fn pcie(mut self, pcie: Vec<XyPair>) -> Self {
        self.pcie = pcie;
        self
    }

    pub fn arc(mut self, arc: Vec<XyPair>) -> Self {
        self.arc = arc;
        self
    }

    pub fn router_only(mut self, router_only: Vec<XyPair>) -> Self {
        self.router_only = router_only;
        self
    }

    pub fn worker_l1_size(mut self, size: u64) -> Self {
        self.worker_l1_size = size;
        self
    }

    pub fn eth_l1_size(mut self, size: u64) -> Self {
        self.eth_l1_size = size;
        self
    }

    pub fn dram_bank_size(mut self, size: u64) -> Self {
        self.dram_bank_size = size;
        self
    }

    /// Distinct worker x values, ascending.
    pub fn worker_columns(&self) -> Vec<u8> {
        self.workers
            .iter()
            .map(|core| core.x)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct worker y values, ascending.
    pub fn worker_rows(&self) -> Vec<u8> {
        self.workers
            .iter()
            .map(|core| core.y)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn dram_ports(&self) -> usize {
        self.dram.first().map(|channel| channel.len()).unwrap_or(0)
    }

    /// Cores of one type in layout order; DRAM is flattened channel by channel.
    pub fn cores(&self, core_type: CoreType) -> Vec<XyPair> {
        match core_type {
            CoreType::Worker => self.workers.clone(),
            CoreType::Dram => self.dram.iter().flatten().copied().collect(),
            CoreType::Ethernet => self.ethernet.clone(),
            CoreType::Pcie => self.pcie.clone(),
            CoreType::Arc => self.arc.clone(),
            CoreType::RouterOnly => self.router_only.clone(),
            CoreType::Harvested => Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.grid_size.x == 0 || self.grid_size.y == 0 {
            return Err(LayoutError::ZeroGrid(self.grid_size));
        }

        if self.workers.is_empty() {
            return Err(LayoutError::EmptyWorkers);
        }

        let mut seen: HashMap<XyPair, CoreType> = HashMap::new();
        for core_type in CoreType::ADDRESSABLE {
            for coord in self.cores(core_type) {
                if coord.x >= self.grid_size.x || coord.y >= self.grid_size.y {
                    return Err(LayoutError::OutsideGrid {
                        core_type,
                        coord,
                        grid: self.grid_size,
                    });
                }

                if let Some(first) = seen.insert(coord, core_type) {
                    return Err(LayoutError::Duplicate {
                        coord,
                        first,
                        second: core_type,
                    });
                }
            }
        }

        let columns = self.worker_columns().len();
        let rows = self.worker_rows().len();
        if columns * rows != self.workers.len() {
            return Err(LayoutError::IncompleteWorkerGrid {
                columns,
                rows,
                workers: self.workers.len(),
            });
        }

        let expected = self.dram_ports();
        for (channel, ports) in self.dram.iter().enumerate() {
            if ports.is_empty() || ports.len() != expected {
                return Err(LayoutError::RaggedDramChannels {
                    channel,
                    ports: ports.len(),
                    expected,
                });
            }
        }

        Ok(())
    }
}
