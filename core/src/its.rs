//! ITS/LPI management.
//!
//! [`ItsManager`] turns a built topology table into an [`ItsIndex`] once,
//! hands it to the ITS service for configuration, and then creates and clears
//! device/LPI mappings on request. Configuration failure is sticky: every later
//! `configure()` reports the same error, and mapping calls fail with
//! `NotConfigured`.

use gicmap_abi::{GicEntryType, GicError, GicInfoTable, GicResult, PhysAddr};
use gicmap_lib::{klog_debug, klog_error, klog_info, klog_warn};

use crate::platform::{GicHardware, ItsService};
use crate::redistributor;

/// ITS blocks tracked per system. Further blocks are ignored.
pub const MAX_ITS_BLOCKS: usize = 8;

/// Priority programmed for LPIs created through [`ItsManager::create_mapping`].
pub const LPI_PRIORITY1: u8 = 0xA0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItsBlock {
    pub id: u32,
    pub base: PhysAddr,
}

/// Everything the ITS service needs to bring up LPIs on this processor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItsIndex {
    gicd_base: PhysAddr,
    /// Redistributor frame of the configuring processor, not a region base.
    gicr_base: PhysAddr,
    blocks: [ItsBlock; MAX_ITS_BLOCKS],
    count: usize,
}

impl ItsIndex {
    /// Scan `table` once, resolving the current processor's redistributor.
    pub fn from_table<H: GicHardware + ?Sized>(table: &GicInfoTable<'_>, hw: &H) -> Self {
        let mut index = Self::default();
        for entry in table.entries() {
            match entry.kind {
                GicEntryType::Distributor => index.gicd_base = entry.base,
                kind if kind.is_redistributor() => {
                    if index.gicr_base.is_null() {
                        index.gicr_base = redistributor::current_frame(hw, entry.base, entry.length)
                            .unwrap_or(PhysAddr::NULL);
                    }
                }
                GicEntryType::Its => {
                    let block = ItsBlock {
                        id: entry.entry_id,
                        base: entry.base,
                    };
                    if !index.push(block) {
                        klog_warn!(
                            "GIC: ITS {} ignored, only {} blocks supported",
                            block.id,
                            MAX_ITS_BLOCKS
                        );
                    }
                }
                _ => {}
            }
        }
        index
    }

    fn push(&mut self, block: ItsBlock) -> bool {
        if self.count == MAX_ITS_BLOCKS {
            return false;
        }
        self.blocks[self.count] = block;
        self.count += 1;
        true
    }

    #[inline]
    pub fn gicd_base(&self) -> PhysAddr {
        self.gicd_base
    }

    #[inline]
    pub fn gicr_base(&self) -> PhysAddr {
        self.gicr_base
    }

    #[inline]
    pub fn blocks(&self) -> &[ItsBlock] {
        &self.blocks[..self.count]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Position of the block with firmware identifier `id`.
    pub fn position(&self, id: u32) -> Option<usize> {
        self.blocks().iter().position(|block| block.id == id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ItsState {
    #[default]
    Unconfigured,
    Configured,
    Failed(GicError),
}

/// A (translator, device, interrupt) triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MsiMapping {
    pub its_id: u32,
    pub device_id: u32,
    pub int_id: u32,
}

impl MsiMapping {
    pub const fn new(its_id: u32, device_id: u32, int_id: u32) -> Self {
        Self {
            its_id,
            device_id,
            int_id,
        }
    }
}

/// Where a device writes to raise a mapped LPI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsiTarget {
    pub address: PhysAddr,
    pub data: u32,
}

#[derive(Debug, Default)]
pub struct ItsManager {
    state: ItsState,
    index: ItsIndex,
}

impl ItsManager {
    pub const fn new() -> Self {
        Self {
            state: ItsState::Unconfigured,
            index: ItsIndex {
                gicd_base: PhysAddr::NULL,
                gicr_base: PhysAddr::NULL,
                blocks: [ItsBlock {
                    id: 0,
                    base: PhysAddr::NULL,
                }; MAX_ITS_BLOCKS],
                count: 0,
            },
        }
    }

    #[inline]
    pub fn state(&self) -> ItsState {
        self.state
    }

    #[inline]
    pub fn is_configured(&self) -> bool {
        self.state == ItsState::Configured
    }

    #[inline]
    pub fn index(&self) -> &ItsIndex {
        &self.index
    }

    /// Bring up LPI support from `table`. Runs at most once.
    pub fn configure<H, S>(&mut self, table: &GicInfoTable<'_>, hw: &H, its: &mut S) -> GicResult
    where
        H: GicHardware + ?Sized,
        S: ItsService + ?Sized,
    {
        match self.state {
            ItsState::Configured => return Ok(()),
            ItsState::Failed(err) => return Err(err),
            ItsState::Unconfigured => {}
        }

        match self.try_configure(table, hw, its) {
            Ok(()) => {
                klog_info!("GIC: ITS configured, {} block(s)", self.index.len());
                self.state = ItsState::Configured;
                Ok(())
            }
            Err(err) => {
                klog_debug!("GIC: {}", err);
                klog_debug!("GIC: ITS initialization failed");
                klog_debug!("GIC: LPI interrupt related tests may not pass");
                self.state = ItsState::Failed(err);
                Err(err)
            }
        }
    }

    fn try_configure<H, S>(&mut self, table: &GicInfoTable<'_>, hw: &H, its: &mut S) -> GicResult
    where
        H: GicHardware + ?Sized,
        S: ItsService + ?Sized,
    {
        self.index = ItsIndex::from_table(table, hw);

        if self.index.is_empty() {
            return Err(GicError::NoTranslator);
        }
        if self.index.gicd_base.is_null() || self.index.gicr_base.is_null() {
            return Err(GicError::BaseAddressMissing);
        }
        if !hw.gicd_supports_lpis(self.index.gicd_base)
            || !hw.gicr_supports_lpis(self.index.gicr_base)
        {
            return Err(GicError::LpiUnsupported);
        }
        its.configure(&self.index).map_err(|err| {
            klog_debug!("GIC: could not configure ITS: {}", err);
            GicError::ConfigurationFailed
        })
    }

    fn resolve(&self, its_id: u32) -> GicResult<usize> {
        if !self.is_configured() {
            return Err(GicError::NotConfigured);
        }
        self.index.position(its_id).ok_or_else(|| {
            klog_error!("GIC: could not find ITS block {}", its_id);
            GicError::UnknownTranslator { id: its_id }
        })
    }

    /// Map `mapping.device_id`/`mapping.int_id` on the named ITS and return
    /// the doorbell write that raises it.
    pub fn create_mapping<S>(&self, its: &mut S, mapping: MsiMapping) -> GicResult<MsiTarget>
    where
        S: ItsService + ?Sized,
    {
        let index = self.resolve(mapping.its_id)?;
        its.create_lpi_map(index, mapping.device_id, mapping.int_id, LPI_PRIORITY1)?;
        let target = MsiTarget {
            address: its.translator_address(index),
            data: mapping.int_id,
        };
        klog_debug!(
            "GIC: ITS {} dev {:#x} LPI {:#x} -> {:#x}",
            mapping.its_id,
            mapping.device_id,
            mapping.int_id,
            target.address
        );
        Ok(target)
    }

    /// Tear down a mapping. The request is forwarded even when the triple was
    /// never mapped; the ITS service treats that as a no-op.
    pub fn free_mapping<S>(&self, its: &mut S, mapping: MsiMapping) -> GicResult
    where
        S: ItsService + ?Sized,
    {
        let index = self.resolve(mapping.its_id)?;
        its.clear_lpi_map(index, mapping.device_id, mapping.int_id);
        Ok(())
    }

    pub fn max_lpi_id<S>(&self, its: &S) -> GicResult<u32>
    where
        S: ItsService + ?Sized,
    {
        if !self.is_configured() {
            return Err(GicError::NotConfigured);
        }
        Ok(its.max_lpi_id())
    }
}
