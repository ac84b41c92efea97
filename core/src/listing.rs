//! Parsers for remote directory-listing output.
//!
//! The session layer asks the remote shell for a long-format listing
//! (`ls -lA` on POSIX, `dir /a` on Windows) and feeds the raw text here.
//! Individual lines that do not match the grammar are skipped with a
//! warning, since remote shells emit all sorts of locale noise, but output in
//! which *nothing* matches is rejected wholesale: that is how an auth
//! challenge or error page served in place of a listing is caught.

use chrono::DateTime;
use chrono::Datelike;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Utc;
use husk_protocol::DirEntry;
use tracing::warn;

use crate::error::Result;
use crate::error::SessionError;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn looks_like_html(output: &str) -> bool {
    let lower = output.trim_start().to_ascii_lowercase();
    lower.starts_with("<!doctype") || lower.starts_with("<html") || lower.contains("<html")
}

pub(crate) fn parse_posix(output: &str) -> Result<Vec<DirEntry>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if looks_like_html(trimmed) {
        return Err(SessionError::unexpected(
            "listing output looks like an HTML page, not a directory listing",
        ));
    }

    let mut entries = Vec::new();
    let mut recognized = 0usize;
    for line in trimmed.lines().filter(|line| !line.trim().is_empty()) {
        if is_posix_header(line) {
            recognized += 1;
            continue;
        }
        match parse_posix_line(line) {
            Some(entry) => {
                recognized += 1;
                entries.push(entry);
            }
            None => warn!(line, "skipping unparseable listing line"),
        }
    }

    if recognized == 0 {
        return Err(SessionError::unexpected(
            "output did not match the directory listing grammar",
        ));
    }
    Ok(entries)
}

fn is_posix_header(line: &str) -> bool {
    let mut fields = line.split_whitespace();
    fields.next() == Some("total") && fields.next().is_some_and(|n| n.parse::<u64>().is_ok())
}

fn parse_posix_line(line: &str) -> Option<DirEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 9 {
        return None;
    }
    let mode = fields[0];
    if mode.len() < 10 || !matches!(mode.as_bytes()[0], b'd' | b'l' | b'b' | b'c' | b'p' | b's' | b'-') {
        return None;
    }
    let is_dir = mode.starts_with('d');
    let size = fields[4].parse::<u64>().ok()?;
    let modified = parse_posix_mtime(fields[5], fields[6], fields[7]);

    let mut name = fields[8..].join(" ");
    if mode.starts_with('l')
        && let Some(pos) = name.find(" -> ")
    {
        name.truncate(pos);
    }
    Some(DirEntry {
        name,
        is_dir,
        // Directory sizes report the inode block count, not contents.
        size: (!is_dir).then_some(size),
        modified,
    })
}

fn parse_posix_mtime(month: &str, day: &str, time_or_year: &str) -> Option<DateTime<Utc>> {
    let month = MONTHS.iter().position(|m| m.eq_ignore_ascii_case(month))? as u32 + 1;
    let day: u32 = day.parse().ok()?;
    let (year, time) = if let Some((hour, minute)) = time_or_year.split_once(':') {
        // ls omits the year for entries modified within the last six
        // months; assume the current one.
        let time = NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)?;
        (Utc::now().year(), time)
    } else {
        (time_or_year.parse().ok()?, NaiveTime::MIN)
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_time(time).and_utc())
}

pub(crate) fn parse_windows(output: &str) -> Result<Vec<DirEntry>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if looks_like_html(trimmed) {
        return Err(SessionError::unexpected(
            "listing output looks like an HTML page, not a directory listing",
        ));
    }

    let mut entries = Vec::new();
    let mut recognized = 0usize;
    for line in trimmed.lines().filter(|line| !line.trim().is_empty()) {
        if is_windows_banner(line) {
            recognized += 1;
            continue;
        }
        match parse_windows_line(line) {
            Some(entry) => {
                recognized += 1;
                if entry.name != "." && entry.name != ".." {
                    entries.push(entry);
                }
            }
            None => warn!(line, "skipping unparseable listing line"),
        }
    }

    if recognized == 0 {
        return Err(SessionError::unexpected(
            "output did not match the directory listing grammar",
        ));
    }
    Ok(entries)
}

fn is_windows_banner(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("Volume ")
        || line.starts_with("Directory of ")
        || line.contains("File(s)")
        || line.contains("Dir(s)")
        || line.ends_with("bytes free")
}

fn parse_windows_line(line: &str) -> Option<DirEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }
    if !fields[0].contains(['/', '-']) || !fields[1].contains(':') {
        return None;
    }
    let (meridiem, rest) = if fields
        .get(2)
        .is_some_and(|f| f.eq_ignore_ascii_case("AM") || f.eq_ignore_ascii_case("PM"))
    {
        (Some(fields[2]), &fields[3..])
    } else {
        (None, &fields[2..])
    };
    let (size_field, name_fields) = rest.split_first()?;

    let (is_dir, size) = if *size_field == "<DIR>" {
        (true, None)
    } else {
        let digits: String = size_field
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        (false, Some(digits.parse::<u64>().ok()?))
    };
    let name = name_fields.join(" ");
    if name.is_empty() {
        return None;
    }
    Some(DirEntry {
        name,
        is_dir,
        size,
        modified: parse_windows_mtime(fields[0], fields[1], meridiem),
    })
}

fn parse_windows_mtime(
    date: &str,
    time: &str,
    meridiem: Option<&str>,
) -> Option<DateTime<Utc>> {
    const DATE_FORMATS: [&str; 5] = ["%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())?;
    let time = match meridiem {
        Some(meridiem) => {
            NaiveTime::parse_from_str(&format!("{time} {}", meridiem.to_ascii_uppercase()), "%I:%M %p")
                .ok()?
        }
        None => NaiveTime::parse_from_str(time, "%H:%M").ok()?,
    };
    Some(date.and_time(time).and_utc())
}
