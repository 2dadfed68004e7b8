use anyhow::{anyhow, Result};
use std::path::PathBuf;

use QuiverSST::file::{open_table_file, write_table_file};
use QuiverSST::table::peek_header;
use QuiverSST::{FormatVersion, SstConfig};

use super::util::{read_file, value_from_arg};

pub fn exec(
    cfg: &SstConfig,
    path: PathBuf,
    key: String,
    value: Option<String>,
    value_file: Option<PathBuf>,
    overwrite: bool,
    pad: bool,
) -> Result<()> {
    let mut val = match (value, value_file) {
        (_, Some(p)) => read_file(&p)?,
        (Some(s), None) => value_from_arg(&s)?,
        (None, None) => return Err(anyhow!("either --value or --value-file must be provided")),
    };

    let mut table = open_table_file(&path, cfg)?;

    if pad {
        if table.format() != FormatVersion::Fixed {
            return Err(anyhow!("--pad applies to fixed tables only"));
        }
        let want = peek_header(table.as_bytes())?.size as usize;
        if val.len() > want {
            return Err(anyhow!(
                "value is {} B, longer than payload_size {}",
                val.len(),
                want
            ));
        }
        val.resize(want, 0);
    }

    table.put(key.as_bytes(), &val, overwrite)?;
    write_table_file(&path, table.as_bytes())?;

    println!(
        "OK put: key='{}' ({} B), value={} B, records={}",
        key,
        key.len(),
        val.len(),
        table.len()
    );
    Ok(())
}
