use crate::common::Operation::{Erase, Read, Write};
use brainre1_board::board::{self, FLASH_CHIP_EXTERNAL, FLASH_CHIP_INTERNAL};
use brainre1_board::{PartitionFlash, PartitionLabel, WindowError};
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use pretty_assertions::assert_eq;

mod common;

#[test]
fn offsets_are_relative_to_partition() {
    let mut flash = common::Flash::for_chip(&FLASH_CHIP_EXTERNAL);
    let waypoints = board::partition_table(0)
        .find(PartitionLabel::Waypoints)
        .unwrap();

    let mut window = PartitionFlash::new(&mut flash, waypoints);
    assert_eq!(window.capacity(), 65_536);

    window.write(16, &[1, 2, 3, 4]).unwrap();
    let mut buf = [0u8; 8];
    window.read(12, &mut buf).unwrap();
    assert_eq!(buf, [0xff, 0xff, 0xff, 0xff, 1, 2, 3, 4]);

    assert_eq!(&flash.buf[65_536 + 16..65_536 + 20], &[1, 2, 3, 4]);
    assert_eq!(
        flash.operations,
        vec![
            Write {
                offset: 65_552,
                len: 4
            },
            Read {
                offset: 65_548,
                len: 8
            },
        ]
    );
}

#[test]
fn access_past_the_end_is_rejected() {
    let mut flash = common::Flash::for_chip(&FLASH_CHIP_EXTERNAL);
    let settings = board::partition_table(0)
        .find(PartitionLabel::Settings)
        .unwrap();

    let mut window = PartitionFlash::new(&mut flash, settings);
    let mut buf = [0u8; 8];
    assert_eq!(window.read(65_532, &mut buf), Err(WindowError::OutOfBounds));
    assert_eq!(window.write(65_536, &[0; 4]), Err(WindowError::OutOfBounds));
    assert_eq!(window.erase(0, 65_536 + 4096), Err(WindowError::OutOfBounds));
    assert_eq!(window.erase(8192, 4096), Err(WindowError::OutOfBounds));

    // the last word is still reachable
    window.write(65_532, &[0; 4]).unwrap();

    // nothing outside the partition was touched
    assert!(flash.buf[65_536..].iter().all(|&b| b == 0xff));
    assert_eq!(flash.writes(), 1);
}

#[test]
fn erase_must_hit_sector_boundaries() {
    let mut flash = common::Flash::for_chip(&FLASH_CHIP_INTERNAL);
    let bootloader = board::partition_table(0)
        .find(PartitionLabel::Bootloader)
        .unwrap();

    let mut window = PartitionFlash::new(&mut flash, bootloader);
    // 4 KiB is aligned for the mock but inside a 16 KiB sector of the chip
    assert_eq!(window.erase(0, 4096), Err(WindowError::NotAligned));
    window.erase(16_384, 32_768).unwrap();

    assert_eq!(
        flash.operations,
        vec![Erase {
            offset: 16_384,
            len: 16_384
        }]
    );
}

#[test]
fn erase_all() {
    let mut flash = common::Flash::for_chip(&FLASH_CHIP_INTERNAL);
    flash.buf.fill(0);
    let firmware = board::partition_table(0)
        .find(PartitionLabel::Firmware)
        .unwrap();

    PartitionFlash::new(&mut flash, firmware).erase_all().unwrap();

    assert_eq!(
        flash.operations,
        vec![Erase {
            offset: 131_072,
            len: 393_216
        }]
    );
    assert!(flash.buf[..131_072].iter().all(|&b| b == 0));
    assert!(flash.buf[131_072..].iter().all(|&b| b == 0xff));
}

#[test]
fn driver_errors_pass_through() {
    let mut flash = common::Flash::new_with_fault(16, 0);
    let settings = board::partition_table(0)
        .find(PartitionLabel::Settings)
        .unwrap();

    let mut window = PartitionFlash::new(&mut flash, settings);
    let mut buf = [0u8; 4];
    assert_eq!(
        window.read(0, &mut buf),
        Err(WindowError::Flash(common::FlashError))
    );
}
