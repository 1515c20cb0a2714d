use std::{fmt, time::Duration};

/// Acquisition time of a buffer, split into whole seconds and nanoseconds as on the wire
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

impl Stamp {
    pub fn new(sec: i32, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    /// Time since the epoch, or `None` for stamps before the epoch
    /// ```
    /// # use rangegrid_core::meta::Stamp;
    /// # use std::time::Duration;
    /// let stamp = Stamp::new(3, 500_000_000);
    /// assert_eq!(Some(Duration::from_millis(3500)), stamp.as_duration());
    /// ```
    pub fn as_duration(&self) -> Option<Duration> {
        if self.sec < 0 {
            return None;
        }
        Some(Duration::new(self.sec as u64, self.nanosec))
    }
}

/// Durations past the range of `sec` saturate to the latest representable stamp
impl From<Duration> for Stamp {
    fn from(duration: Duration) -> Self {
        match i32::try_from(duration.as_secs()) {
            Ok(sec) => Self {
                sec,
                nanosec: duration.subsec_nanos(),
            },
            Err(_) => Self {
                sec: i32::MAX,
                nanosec: 999_999_999,
            },
        }
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nanosec)
    }
}

/// Header tag of a buffer: when it was acquired and in which coordinate frame its positions are given
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub stamp: Stamp,
    pub frame_id: String,
}

impl Header {
    pub fn new<S: Into<String>>(stamp: Stamp, frame_id: S) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_from_duration() {
        assert_eq!(Stamp::new(12, 250), Stamp::from(Duration::new(12, 250)));
        assert_eq!(
            Stamp::new(i32::MAX, 7),
            Stamp::from(Duration::new(i32::MAX as u64, 7))
        );
    }

    #[test]
    fn test_stamp_from_long_duration_saturates() {
        let stamp = Stamp::from(Duration::new(i32::MAX as u64 + 1, 0));
        assert_eq!(Stamp::new(i32::MAX, 999_999_999), stamp);
        assert_eq!(Stamp::new(i32::MAX, 999_999_999), Stamp::from(Duration::MAX));
    }
}
