pub struct FileSizeUtils;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

impl FileSizeUtils {
    /// Formats a byte count for display next to a staged file.
    pub fn format_size(size: u64) -> String {
        if size < KIB {
            format!("{} B", size)
        } else if size < MIB {
            format!("{:.1} KB", size as f64 / KIB as f64)
        } else {
            format!("{:.1} MB", size as f64 / MIB as f64)
        }
    }

    /// Megabytes with one decimal place, without the unit.
    pub fn megabytes(size: u64) -> String {
        format!("{:.1}", size as f64 / MIB as f64)
    }

    pub fn mb_to_bytes(mb: u64) -> u64 {
        mb * MIB
    }
}
