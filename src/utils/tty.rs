use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;

const SERIAL_BY_ID_DIR: &str = "/dev/serial/by-id";

/// Find the device node (normally `/dev/ttyUSB*`) whose `/dev/serial/by-id`
/// entry contains `id_to_match`.
///
/// A missing by-id directory is an error: without it no USB serial device can
/// be located at all. `Ok(None)` means the directory exists but nothing matched.
pub fn find_serial_device(id_to_match: &str) -> io::Result<Option<PathBuf>> {
    find_serial_device_in(Path::new(SERIAL_BY_ID_DIR), id_to_match)
}

pub(crate) fn find_serial_device_in(dir: &Path, id_to_match: &str) -> io::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("need {} directory to work", dir.display()),
        ));
    }

    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name();
        if name.to_string_lossy().contains(id_to_match) {
            debug!("found a match for {id_to_match}: {}", name.to_string_lossy());
            return fs::canonicalize(entry.path()).map(Some);
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = find_serial_device_in(&tmp.path().join("by-id"), "1a86").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn no_match_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("usb-Other_Device-if00-port0"), b"").unwrap();

        assert!(find_serial_device_in(tmp.path(), "1a86").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn resolves_symlink_to_device_node() {
        let tmp = tempfile::tempdir().unwrap();
        let by_id = tmp.path().join("by-id");
        fs::create_dir(&by_id).unwrap();
        let node = tmp.path().join("ttyUSB0");
        fs::write(&node, b"").unwrap();
        std::os::unix::fs::symlink(
            "../ttyUSB0",
            by_id.join("usb-1a86_USB_Serial-if00-port0"),
        )
        .unwrap();

        let found = find_serial_device_in(&by_id, "1a86").unwrap().unwrap();
        assert_eq!(found, fs::canonicalize(&node).unwrap());
    }
}
