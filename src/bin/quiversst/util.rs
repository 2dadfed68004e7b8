use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::Path;

/// Разобрать аргумент значения:
/// - "-"       : stdin
/// - "@path"   : содержимое файла
/// - "hex:..." : hex-строка
/// - иначе     : литерал UTF-8
pub fn value_from_arg(arg: &str) -> Result<Vec<u8>> {
    if arg == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("read value from stdin")?;
        return Ok(buf);
    }
    if let Some(p) = arg.strip_prefix('@') {
        return read_file(Path::new(p));
    }
    if let Some(hx) = arg.strip_prefix("hex:") {
        return parse_hex(hx);
    }
    Ok(arg.as_bytes().to_vec())
}

pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim().as_bytes();
    if s.len() % 2 != 0 {
        return Err(anyhow!("hex string must have even length"));
    }
    s.chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let hi = (pair[0] as char).to_digit(16);
            let lo = (pair[1] as char).to_digit(16);
            match (hi, lo) {
                (Some(h), Some(l)) => Ok(((h << 4) | l) as u8),
                _ => Err(anyhow!("invalid hex at pos {}", i * 2)),
            }
        })
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// UTF-8 как есть, иначе пометка о бинарных данных.
pub fn display_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("(binary {} B)", bytes.len()),
    }
}

/// Hex-дамп по 16 байт в строке (не более 64 байт).
pub fn hex_preview(bytes: &[u8]) -> String {
    bytes[..bytes.len().min(64)]
        .chunks(16)
        .map(|line| {
            line.iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n      ")
}

pub fn read_file(p: &Path) -> Result<Vec<u8>> {
    std::fs::read(p).with_context(|| format!("read {}", p.display()))
}
