//! Hardware topology detection
//!
//! The registry sizes its instance table to the number of hardware
//! topology groups (memory locality domains). Detection is best effort:
//! on Linux the populated NUMA nodes are counted through sysfs, everywhere
//! else — and whenever sysfs is unavailable — the machine is treated as a
//! single group, which degrades to the unscaled single-instance layout.

/// Returns the number of active topology groups, at least 1.
#[cfg(target_os = "linux")]
pub fn group_count() -> usize {
    let Ok(entries) = std::fs::read_dir("/sys/devices/system/node") else {
        return 1;
    };

    let nodes = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();

            name.len() > 4
                && name.starts_with("node")
                && name[4..].bytes().all(|b| b.is_ascii_digit())
        })
        .count();

    nodes.max(1)
}

/// Returns the number of active topology groups, at least 1.
#[cfg(not(target_os = "linux"))]
pub fn group_count() -> usize {
    1
}
