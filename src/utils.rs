use chrono::NaiveDate;
use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Parse a `YYYY-MM-DD` command-line date
pub fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidConfig(format!("'{}' is not a valid date (expected YYYY-MM-DD)", value))
    })
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.top == 0 {
        anyhow::bail!("--top must be greater than 0");
    }

    if args.ner_sample == 0 {
        anyhow::bail!("--ner-sample must be greater than 0");
    }

    let start = args.start.as_deref().map(parse_day).transpose()?;
    let end = args.end.as_deref().map(parse_day).transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            anyhow::bail!("--start ({}) must not be after --end ({})", start, end);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use clap::Parser;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(
            parse_day("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(matches!(parse_day("01/03/2024"), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_args() {
        assert!(validate_args(&Args::parse_from(["inboxlens"])).is_ok());
        assert!(validate_args(&Args::parse_from(["inboxlens", "--top", "0"])).is_err());
        assert!(validate_args(&Args::parse_from(["inboxlens", "--ner-sample", "0"])).is_err());
        assert!(validate_args(&Args::parse_from([
            "inboxlens",
            "--start",
            "2024-03-05",
            "--end",
            "2024-03-01"
        ]))
        .is_err());
        assert!(validate_args(&Args::parse_from(["inboxlens", "--end", "March"])).is_err());
    }
}
