use std::fmt;
use std::str::FromStr;

use super::Error;

/// `Range` header value. Only the `npt` unit is understood.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub start: Option<NptTime>,
    pub end: Option<NptTime>,
}

impl Range {
    #[must_use]
    pub const fn new(start: NptTime, end: NptTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// `npt=now-`
    #[must_use]
    pub const fn new_for_live() -> Self {
        Self {
            start: Some(NptTime::Now),
            end: None,
        }
    }

    /// Open ended range starting at `now` or at zero. The only kind a live
    /// source can honor.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.end.is_none()
            && match self.start {
                None | Some(NptTime::Now) => true,
                Some(NptTime::Time(seconds)) => seconds == 0.0,
            }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "npt=")?;
        if let Some(start) = &self.start {
            write!(f, "{start}")?;
        }
        write!(f, "-")?;
        if let Some(end) = &self.end {
            write!(f, "{end}")?;
        }
        Ok(())
    }
}

impl FromStr for Range {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::RangeMalformed {
            value: s.to_string(),
        };

        let (range, time) = match s.split_once(';') {
            Some((range, time)) => (range, Some(time.trim())),
            None => (s, None),
        };
        if let Some(time) = time {
            return Err(if time.starts_with("time=") {
                Error::RangeTimeNotSupported {
                    value: s.to_string(),
                }
            } else {
                malformed()
            });
        }

        let (unit, value) = range.trim().split_once('=').ok_or_else(malformed)?;
        if unit != "npt" {
            return Err(Error::RangeUnitNotSupported {
                value: s.to_string(),
            });
        }

        let (start, end) = value.split_once('-').ok_or_else(malformed)?;
        let parse_bound = |bound: &str| -> Result<Option<NptTime>, Error> {
            let bound = bound.trim();
            if bound.is_empty() {
                Ok(None)
            } else {
                bound.parse().map(Some)
            }
        };

        Ok(Self {
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NptTime {
    Now,
    Time(f64),
}

impl fmt::Display for NptTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Now => write!(f, "now"),
            Self::Time(seconds) => write!(f, "{seconds:.3}"),
        }
    }
}

impl FromStr for NptTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::RangeNptTimeMalformed {
            value: s.to_string(),
        };

        if s == "now" {
            return Ok(Self::Now);
        }

        match *s.split(':').collect::<Vec<_>>().as_slice() {
            [seconds] => seconds
                .parse::<f64>()
                .map(Self::Time)
                .map_err(|_| malformed()),
            [hh, mm, ss] => match (hh.parse::<u32>(), mm.parse::<u32>(), ss.parse::<f64>()) {
                (Ok(hh), Ok(mm), Ok(ss)) if mm < 60 && ss < 60.0 => {
                    Ok(Self::Time(f64::from(hh) * 3600.0 + f64::from(mm) * 60.0 + ss))
                }
                _ => Err(malformed()),
            },
            _ => Err(malformed()),
        }
    }
}
