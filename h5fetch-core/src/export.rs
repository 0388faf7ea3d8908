use crate::error::Result;
use crate::pipeline::RootDiscovery;
use crate::task::relative_export_path;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// One export line: the bare URL in flat mode, otherwise `<url> -> <path>`.
pub fn format_export_line(target_domain: &str, url: &str, flat: bool) -> String {
    if flat {
        url.to_string()
    } else {
        format!("{} -> {}", url, relative_export_path(target_domain, url))
    }
}

/// Write every discovered URL, roots in input order. Returns the line count.
pub fn write_export<W: Write>(writer: &mut W, discoveries: &[RootDiscovery], flat: bool) -> Result<usize> {
    let mut lines = 0;
    for discovery in discoveries {
        for url in &discovery.urls {
            writeln!(
                writer,
                "{}",
                format_export_line(&discovery.target_domain, url, flat)
            )?;
            lines += 1;
        }
    }
    Ok(lines)
}

/// Export to a file at `path`, replacing it.
pub fn export_urls(path: &Path, discoveries: &[RootDiscovery], flat: bool) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    let lines = write_export(&mut writer, discoveries, flat)?;
    writer.flush()?;
    info!("Exported {} URLs to {}", lines, path.display());
    Ok(lines)
}
