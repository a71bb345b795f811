//! 解析 gphoto2 輸出的純函式。 / Pure parsers for the text gphoto2 prints.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::tool::{DeviceDescriptor, StorageInfo};
use crate::DeviceCommandError;

static FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid integer pattern"));

const MODEL_PREFIX: &str = "Model: ";

/// 解析 `--auto-detect`：前兩行為表頭。 / Parses `--auto-detect`; the first two lines are the table header.
pub fn parse_auto_detect(output: &str) -> Result<Vec<DeviceDescriptor>, DeviceCommandError> {
    let mut lines = output.lines();
    let header = lines.next();
    let rule = lines.next();
    if header.is_none() || rule.is_none() {
        return Err(DeviceCommandError::unparsable(
            "--auto-detect",
            "missing table header",
        ));
    }
    Ok(lines
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.rsplit_once(char::is_whitespace) {
            Some((model, port)) if !model.trim().is_empty() => DeviceDescriptor {
                model: model.trim().to_string(),
                port: port.to_string(),
            },
            _ => DeviceDescriptor {
                model: line.trim().to_string(),
                port: String::new(),
            },
        })
        .collect())
}

/// 取出 `--summary` 中 `Model: ` 之後的文字。 / Extracts the text after `Model: ` in `--summary`.
pub fn parse_summary_model(output: &str) -> Result<String, DeviceCommandError> {
    output
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(MODEL_PREFIX))
        .map(|model| model.trim().to_string())
        .ok_or_else(|| DeviceCommandError::unparsable("--summary", "no `Model: ` line"))
}

/// 解析 `--storage-info`（多張記憶卡時加總）。 / Parses `--storage-info`, summing over every storage section.
pub fn parse_storage_info(output: &str) -> Result<StorageInfo, DeviceCommandError> {
    let mut total = None;
    let mut free = None;
    for line in output.lines() {
        let slot = if line.starts_with("totalcapacity=") {
            &mut total
        } else if line.starts_with("free=") {
            &mut free
        } else {
            continue;
        };
        let value = first_int(line).ok_or_else(|| {
            DeviceCommandError::unparsable("--storage-info", format!("no number in `{line}`"))
        })?;
        *slot = Some(slot.unwrap_or(0) + value);
    }
    match (total, free) {
        (Some(total_kb), Some(free_kb)) => Ok(StorageInfo { total_kb, free_kb }),
        _ => Err(DeviceCommandError::unparsable(
            "--storage-info",
            "missing `totalcapacity=` or `free=`",
        )),
    }
}

/// 解析 `--list-files`：以 `#` 開頭的行，第二個欄位為檔名。 / Parses `--list-files`: `#` lines carry the filename as their second token.
pub fn parse_file_list(output: &str) -> Result<Vec<String>, DeviceCommandError> {
    output
        .lines()
        .filter(|line| line.starts_with('#'))
        .map(|line| {
            line.split_whitespace()
                .nth(1)
                .map(str::to_string)
                .ok_or_else(|| {
                    DeviceCommandError::unparsable("--list-files", format!("no filename in `{line}`"))
                })
        })
        .collect()
}

/// 解析 `--show-info`：第四個欄位去除單引號。 / Parses `--show-info`: the 4th token without its single quotes.
pub fn parse_show_info(output: &str) -> Result<String, DeviceCommandError> {
    output
        .split_whitespace()
        .nth(3)
        .map(|token| token.trim_matches('\'').to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DeviceCommandError::unparsable("--show-info", "fewer than four tokens"))
}

fn first_int(line: &str) -> Option<u64> {
    FIRST_INT
        .find(line)
        .and_then(|found| found.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTO_DETECT: &str = "\
Model                          Port
----------------------------------------------------------
Nikon DSC D5100 (PTP mode)     usb:002,005
";

    #[test]
    fn auto_detect_lists_devices_after_header() {
        let devices = parse_auto_detect(AUTO_DETECT).unwrap();
        assert_eq!(
            devices,
            vec![DeviceDescriptor {
                model: "Nikon DSC D5100 (PTP mode)".into(),
                port: "usb:002,005".into(),
            }]
        );
    }

    #[test]
    fn auto_detect_without_devices_is_empty() {
        let header_only = "Model                          Port\n-------------------\n";
        assert!(parse_auto_detect(header_only).unwrap().is_empty());
        assert!(parse_auto_detect("").is_err());
    }

    #[test]
    fn summary_model_line() {
        let summary = "Camera summary:\nManufacturer: Nikon Corporation\nModel: D5100\n  Version: V1.01\n";
        assert_eq!(parse_summary_model(summary).unwrap(), "D5100");
        assert!(parse_summary_model("Camera summary:\n").is_err());
    }

    #[test]
    fn storage_info_uses_first_integer() {
        let info = "[Storage 0]\nlabel=SD\ntotalcapacity=15549952 KB\nfree=15525216 KB\nfreeimages=2860\n";
        let parsed = parse_storage_info(info).unwrap();
        assert_eq!(parsed.total_kb, 15_549_952);
        assert_eq!(parsed.free_kb, 15_525_216);
        assert_eq!(parsed.occupied_kb(), 24_736);
    }

    #[test]
    fn storage_info_sums_multiple_cards() {
        let info = "[Storage 0]\ntotalcapacity=100 KB\nfree=40 KB\n[Storage 1]\ntotalcapacity=50 KB\nfree=50 KB\n";
        let parsed = parse_storage_info(info).unwrap();
        assert_eq!((parsed.total_kb, parsed.free_kb), (150, 90));
        assert!(parse_storage_info("label=SD\n").is_err());
    }

    #[test]
    fn file_list_reads_hash_lines() {
        let listing = "\
There is no file in folder '/'.
There are 2 files in folder '/store_00010001/DCIM/100NIKON':
#1     DSC_0001.JPG               rd  5640 KB image/jpeg 1462891218
#2     DSC_0002.JPG               rd  5712 KB image/jpeg 1462891220
";
        assert_eq!(
            parse_file_list(listing).unwrap(),
            vec!["DSC_0001.JPG", "DSC_0002.JPG"]
        );
        assert!(parse_file_list("#1\n").is_err());
    }

    #[test]
    fn show_info_strips_quotes() {
        let info = "Information on file 'DSC_0002.JPG' (folder '/store_00010001/DCIM/100NIKON'):\nFile:\n";
        assert_eq!(parse_show_info(info).unwrap(), "DSC_0002.JPG");
        assert!(parse_show_info("Information on").is_err());
    }
}
