//! Index-value samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MalformedEvent;

/// A single observation of a pre-computed index (official or sector index).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSample {
    /// Index code as reported by the source, whitespace-trimmed.
    pub code: String,
    /// Observation time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Index value.
    pub value: f64,
}

impl IndexSample {
    /// Creates a new sample.
    #[must_use]
    pub fn new(code: impl Into<String>, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            code: code.into(),
            timestamp,
            value,
        }
    }
}

/// Index sample as delivered by the event source, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Observation time.
    pub time: DateTime<Utc>,
    /// Index code or sector description.
    pub code: String,
    /// Index value, if reported.
    pub value: Option<f64>,
}

impl RawSample {
    /// Creates a new raw sample.
    #[must_use]
    pub fn new(time: DateTime<Utc>, code: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            time,
            code: code.into(),
            value,
        }
    }

    /// Validates the sample.
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedEvent`] if the code is blank or the value is
    /// missing or not a positive finite number.
    pub fn validate(self) -> Result<IndexSample, MalformedEvent> {
        let timestamp = self.time;
        let code = self.code.trim().to_string();
        if code.is_empty() {
            return Err(MalformedEvent::EmptySymbol { timestamp });
        }

        match self.value {
            None => Err(MalformedEvent::MissingPrice {
                symbol: code,
                timestamp,
            }),
            Some(v) if !v.is_finite() || v <= 0.0 => Err(MalformedEvent::InvalidPrice {
                symbol: code,
                timestamp,
                price: v,
            }),
            Some(value) => Ok(IndexSample {
                code,
                timestamp,
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sample_validate() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap();
        let sample = RawSample::new(time, " EGX30 EWI ", Some(27_850.4))
            .validate()
            .unwrap();
        assert_eq!(sample.code, "EGX30 EWI");
        assert!((sample.value - 27_850.4).abs() < 1e-10);

        assert!(RawSample::new(time, "EGX30", None).validate().is_err());
        assert!(RawSample::new(time, "   ", Some(1.0)).validate().is_err());
        assert!(RawSample::new(time, "EGX30", Some(f64::NAN)).validate().is_err());
    }
}
