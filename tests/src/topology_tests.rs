//! Topology discovery from synthetic MADT and devicetree images.

use gicmap_abi::{GicEntry, GicEntryType, GicError, GicInfoTable, GicVersion, PhysAddr};
use gicmap_core::{ItsManager, PlatformTables, SourcePreference, TopologySource, build_topology};
use gicmap_lib::testing::{DtbImage, MadtImage, TestResult};
use gicmap_lib::{assert_eq_test, assert_err, assert_ok, assert_test, define_test_suite, pass};

use crate::sim::{SimGic, SimIts};

pub const GICD_BASE: u64 = 0x2f00_0000;
pub const GICR_BASE: u64 = 0x2f10_0000;
pub const GICR_LENGTH: u32 = 0x20_0000;
pub const GICC_BASE: u64 = 0x2c00_0000;
pub const ITS0_BASE: u64 = 0x2f02_0000;
pub const GICR_FRAME: u64 = 0x2_0000;

pub const MADT_LEN: usize = 1024;
const DTB_LEN: usize = 4096;

/// GICv3 MADT: one GICC per PE with its own redistributor, a GICD, an ITS.
pub fn gicv3_madt(image: &mut MadtImage<MADT_LEN>, pes: u32) {
    for pe in 0..pes {
        image.gicc(pe, 0, GICR_BASE + u64::from(pe) * GICR_FRAME, u64::from(pe));
    }
    image.gicd(GICD_BASE, 3).its(0, ITS0_BASE);
}

/// GICv3 devicetree with `pes` processors and a single redistributor region.
fn gicv3_dtb(image: &mut DtbImage<DTB_LEN>, pes: u32, with_cpuif: bool) {
    image
        .begin_node("")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 2)
        .begin_node("cpus")
        .prop_u32("#address-cells", 1)
        .prop_u32("#size-cells", 0);
    for pe in 0..pes {
        image
            .begin_node("cpu")
            .prop_str("device_type", "cpu")
            .prop_u32("reg", pe)
            .end_node();
    }
    image.end_node();

    let gicd = [0, GICD_BASE as u32, 0, 0x1_0000];
    let gicr = [0, GICR_BASE as u32, 0, GICR_LENGTH];
    let gicc = [0, GICC_BASE as u32, 0, 0x2000];
    image
        .begin_node("interrupt-controller@2f000000")
        .prop_str("compatible", "arm,gic-v3")
        .prop_u32("#interrupt-cells", 3)
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 2)
        .prop_cells("interrupts", &[1, 9, 4]);
    if with_cpuif {
        let mut reg = [0u32; 12];
        reg[..4].copy_from_slice(&gicd);
        reg[4..8].copy_from_slice(&gicr);
        reg[8..].copy_from_slice(&gicc);
        image.prop_cells("reg", &reg);
    } else {
        let mut reg = [0u32; 8];
        reg[..4].copy_from_slice(&gicd);
        reg[4..].copy_from_slice(&gicr);
        image.prop_cells("reg", &reg);
    }
    image
        .begin_node("its@2f020000")
        .prop_str("compatible", "arm,gic-v3-its")
        .prop_cells("reg", &[0, ITS0_BASE as u32, 0, 0x2_0000])
        .end_node()
        .end_node()
        .end_node();
}

pub fn test_acpi_single_distributor() -> TestResult {
    let mut madt = MadtImage::<MADT_LEN>::new();
    gicv3_madt(&mut madt, 4);
    let Some(madt) = madt.finish() else {
        return TestResult::Fail;
    };

    let mut storage = [GicEntry::EMPTY; 16];
    let mut table = GicInfoTable::new(&mut storage);
    assert_ok!(gicmap_acpi::create_gic_info_table(Some(madt), &mut table));

    let header = *table.header();
    assert_eq_test!(header.num_gicd, 1, "exactly one distributor");
    assert_eq_test!(header.num_gicrd, 4);
    assert_eq_test!(header.num_its, 1);
    assert_eq_test!(header.gic_version, GicVersion::V3);
    assert_test!(
        table.entries().iter().all(|e| e.kind != GicEntryType::End),
        "terminator inside populated entries"
    );
    assert_eq_test!(
        table.terminated().last().map(|e| e.kind),
        Some(GicEntryType::End)
    );
    assert_eq_test!(table.terminated().count(), table.len() + 1);
    pass!()
}

/// A DT redistributor region is recorded once per `reg` pair, spanning
/// every PE frame in it; the calling PE's frame is resolved later by the
/// ITS manager walking the frames.
pub fn test_dt_one_entry_per_reg_region() -> TestResult {
    let mut dtb = DtbImage::<DTB_LEN>::new();
    gicv3_dtb(&mut dtb, 4, true);
    let Some(dtb) = dtb.finish() else {
        return TestResult::Fail;
    };

    let mut storage = [GicEntry::EMPTY; 16];
    let mut table = GicInfoTable::new(&mut storage);
    assert_ok!(gicmap_fdt::create_gic_info_table(Some(dtb), &mut table));

    assert_eq_test!(table.header().num_gicrd, 1, "one entry for the single reg pair");
    let Some(region) = table.of_kind(GicEntryType::Redistributor).next() else {
        return TestResult::Fail;
    };
    assert_eq_test!(region.base, PhysAddr::new(GICR_BASE));
    assert_eq_test!(region.length, u64::from(GICR_LENGTH));
    assert_eq_test!(
        table.of_kind(GicEntryType::CpuInterface).count(),
        4,
        "one CPU interface entry per PE"
    );
    assert_eq_test!(table.header().num_its, 1);

    let mut gic = SimGic::new(2);
    for pe in 0..4u32 {
        gic.frame(GICR_BASE + u64::from(pe) * GICR_FRAME, pe, pe == 3);
    }
    let mut its = SimIts::new();
    let mut mgr = ItsManager::new();
    assert_ok!(mgr.configure(&table, &gic, &mut its));
    assert_eq_test!(
        mgr.index().gicr_base(),
        PhysAddr::new(GICR_BASE + 2 * GICR_FRAME),
        "frame of PE 2 inside the region"
    );
    pass!()
}

pub fn test_dt_without_cpu_interface() -> TestResult {
    let mut dtb = DtbImage::<DTB_LEN>::new();
    gicv3_dtb(&mut dtb, 2, false);
    let Some(dtb) = dtb.finish() else {
        return TestResult::Fail;
    };

    let mut storage = [GicEntry::EMPTY; 16];
    let mut table = GicInfoTable::new(&mut storage);
    assert_ok!(gicmap_fdt::create_gic_info_table(Some(dtb), &mut table));
    assert_eq_test!(table.of_kind(GicEntryType::CpuInterface).count(), 0);
    assert_eq_test!(table.header().num_gicd, 1);
    pass!()
}

pub fn test_builder_falls_back_to_dt() -> TestResult {
    let mut dtb = DtbImage::<DTB_LEN>::new();
    gicv3_dtb(&mut dtb, 4, true);
    let Some(dtb) = dtb.finish() else {
        return TestResult::Fail;
    };

    let mut direct_storage = [GicEntry::EMPTY; 16];
    let mut direct = GicInfoTable::new(&mut direct_storage);
    assert_ok!(gicmap_fdt::create_gic_info_table(Some(dtb), &mut direct));

    let tables = PlatformTables::new(None, Some(dtb));
    let mut storage = [GicEntry::EMPTY; 16];
    let mut built = GicInfoTable::new(&mut storage);
    assert_ok!(build_topology(
        &tables,
        SourcePreference::Acpi,
        Some(&mut built)
    ));

    assert_eq_test!(*built.header(), *direct.header());
    assert_eq_test!(built.len(), direct.len());
    assert_test!(built.entries() == direct.entries(), "entries differ");
    pass!()
}

pub fn test_builder_prefers_acpi() -> TestResult {
    let mut madt = MadtImage::<MADT_LEN>::new();
    gicv3_madt(&mut madt, 2);
    let mut dtb = DtbImage::<DTB_LEN>::new();
    gicv3_dtb(&mut dtb, 4, true);
    let (Some(madt), Some(dtb)) = (madt.finish(), dtb.finish()) else {
        return TestResult::Fail;
    };
    let tables = PlatformTables::new(Some(madt), Some(dtb));

    let mut storage = [GicEntry::EMPTY; 16];
    let mut table = GicInfoTable::new(&mut storage);
    assert_ok!(build_topology(
        &tables,
        SourcePreference::Acpi,
        Some(&mut table)
    ));
    // Per-PE redistributors only come from GICC records.
    assert_eq_test!(
        table.of_kind(GicEntryType::RedistributorFromGicc).count(),
        2
    );
    assert_eq_test!(table.of_kind(GicEntryType::CpuInterface).count(), 0);

    assert_ok!(build_topology(
        &tables,
        SourcePreference::DeviceTree,
        Some(&mut table)
    ));
    assert_eq_test!(
        table.of_kind(GicEntryType::RedistributorFromGicc).count(),
        0,
        "tables must not be merged"
    );
    assert_eq_test!(table.of_kind(GicEntryType::CpuInterface).count(), 4);
    pass!()
}

pub fn test_no_platform_description() -> TestResult {
    let mut storage = [GicEntry::EMPTY; 4];
    let mut table = GicInfoTable::new(&mut storage);
    let result = build_topology(
        &PlatformTables::default(),
        SourcePreference::Acpi,
        Some(&mut table),
    );
    assert_err!(
        result,
        GicError::NotFound {
            what: "platform description"
        }
    );
    assert_test!(table.is_empty());
    assert_eq_test!(table.terminated().count(), 1);
    pass!()
}

pub fn test_madt_declared_length_bounds_records() -> TestResult {
    let mut madt = MadtImage::<MADT_LEN>::new();
    madt.gicd(GICD_BASE, 3).gicr(GICR_BASE, GICR_LENGTH);
    // Declared length ends halfway through the ITS record.
    let cut = madt.len() as u32 + 10;
    madt.its(0, ITS0_BASE);
    let Some(madt) = madt.finish_with_length(cut) else {
        return TestResult::Fail;
    };

    let mut storage = [GicEntry::EMPTY; 8];
    let mut table = GicInfoTable::new(&mut storage);
    assert_ok!(gicmap_acpi::create_gic_info_table(Some(madt), &mut table));
    assert_eq_test!(table.header().num_gicd, 1);
    assert_eq_test!(table.header().num_gicrd, 1);
    assert_eq_test!(table.header().num_its, 0, "record past declared length");
    pass!()
}

pub fn test_storage_exhaustion_keeps_prefix() -> TestResult {
    let mut madt = MadtImage::<MADT_LEN>::new();
    gicv3_madt(&mut madt, 4);
    let Some(madt) = madt.finish() else {
        return TestResult::Fail;
    };

    let mut storage = [GicEntry::EMPTY; 3];
    let mut table = GicInfoTable::new(&mut storage);
    assert_err!(
        gicmap_acpi::create_gic_info_table(Some(madt), &mut table),
        GicError::TableFull { capacity: 3 }
    );
    assert_eq_test!(table.len(), 3);
    assert_eq_test!(
        table.terminated().last().map(|e| e.kind),
        Some(GicEntryType::End)
    );
    pass!()
}

pub fn test_gicv2_with_msi_frame() -> TestResult {
    let mut dtb = DtbImage::<DTB_LEN>::new();
    dtb.begin_node("")
        .prop_u32("#address-cells", 1)
        .prop_u32("#size-cells", 1)
        .begin_node("cpus")
        .prop_u32("#address-cells", 1)
        .prop_u32("#size-cells", 0)
        .begin_node("cpu")
        .prop_str("device_type", "cpu")
        .prop_u32("reg", 0)
        .end_node()
        .end_node()
        .begin_node("interrupt-controller@2c001000")
        .prop_str("compatible", "arm,cortex-a15-gic")
        .prop_u32("#interrupt-cells", 3)
        .prop_u32("#address-cells", 1)
        .prop_u32("#size-cells", 1)
        .prop_cells(
            "reg",
            &[
                0x2c00_1000, 0x1000, // GICD
                0x2c00_2000, 0x2000, // GICC
                0x2c00_4000, 0x2000, // GICH
                0x2c00_6000, 0x2000, // GICV
            ],
        )
        .begin_node("v2m@2c1c0000")
        .prop_str("compatible", "arm,gic-v2m-frame")
        .prop_cells("reg", &[0x2c1c_0000, 0x1000])
        .prop_u32("arm,msi-base-spi", 64)
        .prop_u32("arm,msi-num-spis", 32)
        .end_node()
        .end_node()
        .end_node();
    let Some(dtb) = dtb.finish() else {
        return TestResult::Fail;
    };

    let mut storage = [GicEntry::EMPTY; 8];
    let mut table = GicInfoTable::new(&mut storage);
    assert_ok!(gicmap_fdt::create_gic_info_table(Some(dtb), &mut table));
    assert_eq_test!(table.header().gic_version, GicVersion::V2);
    assert_eq_test!(table.of_kind(GicEntryType::Hypervisor).count(), 1);
    assert_eq_test!(table.header().num_msi_frame, 1);
    let Some(frame) = table.of_kind(GicEntryType::MsiFrame).next() else {
        return TestResult::Fail;
    };
    assert_eq_test!((frame.spi_base, frame.spi_count), (64, 32));
    assert_eq_test!(frame.entry_id, 0);
    pass!()
}

pub fn test_maintenance_interrupt_sources_agree() -> TestResult {
    let mut madt = MadtImage::<MADT_LEN>::new();
    gicv3_madt(&mut madt, 1);
    let mut dtb = DtbImage::<DTB_LEN>::new();
    gicv3_dtb(&mut dtb, 1, true);
    let (Some(madt), Some(dtb)) = (madt.finish(), dtb.finish()) else {
        return TestResult::Fail;
    };
    let acpi = assert_ok!(TopologySource::Acpi(madt).maintenance_interrupt());
    let dt = assert_ok!(TopologySource::DeviceTree(dtb).maintenance_interrupt());
    assert_eq_test!(acpi, 25);
    assert_eq_test!(dt, acpi);
    pass!()
}

define_test_suite!(
    topology,
    [
        test_acpi_single_distributor,
        test_dt_one_entry_per_reg_region,
        test_dt_without_cpu_interface,
        test_builder_falls_back_to_dt,
        test_builder_prefers_acpi,
        test_no_platform_description,
        test_madt_declared_length_bounds_records,
        test_storage_exhaustion_keeps_prefix,
        test_gicv2_with_msi_frame,
        test_maintenance_interrupt_sources_agree,
    ]
);
