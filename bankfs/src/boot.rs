//! Boot-time mount and boot counter.
//!
//! Firmware calls [`run`] once per reset:
//!
//! ```ignore
//! use bankfs::boot::{self, MountPolicy};
//!
//! let device = InternalFlash::new(controller, RegionConfig::stm32l4r5_bank2());
//! match boot::run(device, Config::stm32l4r5_bank2(), MountPolicy::default()) {
//!     Ok(report) => defmt::info!("boot #{}", report.count),
//!     Err(err) => boot::halt(err),
//! }
//! ```

use crate::{Config, Error, Filesystem, OpenFlags};
use bankfs_block_device::BlockDevice;

/// Name of the boot counter file.
pub const BOOT_COUNT_PATH: &str = "boot_count";

/// Which mount failures are answered with a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MountPolicy {
    /// Format only when no valid filesystem exists ([`Error::Corrupt`]).
    /// I/O errors and version or geometry mismatches are returned, so
    /// recoverable data is never erased.
    #[default]
    FormatOnCorrupt,
    /// Format on any mount error.
    FormatOnAnyError,
}

impl MountPolicy {
    /// Whether `err` from a mount attempt should trigger a format.
    pub fn formats_on(self, err: Error) -> bool {
        match self {
            Self::FormatOnCorrupt => err == Error::Corrupt,
            Self::FormatOnAnyError => true,
        }
    }
}

/// How the filesystem came to be mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MountOutcome {
    /// An existing filesystem was mounted.
    Mounted,
    /// The device was formatted first.
    Formatted,
}

/// Result of one boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootReport {
    /// Boot counter after this boot.
    pub count: u32,
    /// Whether the device had to be formatted.
    pub outcome: MountOutcome,
}

/// Mount, formatting and mounting again if `policy` allows.
///
/// # Errors
///
/// Returns the mount error when `policy` does not format on it, and any
/// error from the format or the second mount.
pub fn mount_or_format<D: BlockDevice>(
    fs: &mut Filesystem<D>,
    policy: MountPolicy,
) -> Result<MountOutcome, Error> {
    match fs.mount() {
        Ok(()) => Ok(MountOutcome::Mounted),
        Err(err) if policy.formats_on(err) => {
            warn!("mount failed: {}, formatting", err);
            fs.format()?;
            fs.mount()?;
            Ok(MountOutcome::Formatted)
        }
        Err(err) => {
            error!("mount failed: {}", err);
            Err(err)
        }
    }
}

/// Increment the boot counter and return the new value.
///
/// A missing or short counter file counts as the first boot. The new value
/// is durable once this returns `Ok`.
pub fn record_boot<D: BlockDevice>(fs: &mut Filesystem<D>) -> Result<u32, Error> {
    let mut file = fs.open(BOOT_COUNT_PATH, OpenFlags::RDWR | OpenFlags::CREATE)?;

    let mut bytes = [0u8; 4];
    let previous = match file.read(&mut bytes)? {
        4 => u32::from_le_bytes(bytes),
        0 => 0,
        n => {
            warn!("boot counter holds {} bytes, starting from zero", n);
            0
        }
    };

    let count = previous.wrapping_add(1);
    file.rewind();
    file.write(&count.to_le_bytes())?;
    file.close()?;

    info!("boot count: {}", count);
    Ok(count)
}

/// Mount (formatting if needed), record this boot, and unmount.
pub fn run<D: BlockDevice>(
    device: D,
    config: Config,
    policy: MountPolicy,
) -> Result<BootReport, Error> {
    let mut fs = Filesystem::new(device, config)?;
    let outcome = mount_or_format(&mut fs, policy)?;
    let count = record_boot(&mut fs)?;
    fs.unmount()?;
    Ok(BootReport { count, outcome })
}

/// Stop on a fatal error: log it, mask interrupts and spin forever.
pub fn halt(err: Error) -> ! {
    error!("fatal: {}", err);
    #[cfg(feature = "cortex-m")]
    cortex_m::interrupt::disable();
    loop {
        core::hint::spin_loop();
    }
}
