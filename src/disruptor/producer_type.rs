//! Producer Type Implementation
//!
//! Selects which sequencer a ring buffer is built on.

use serde::{Deserialize, Serialize};

/// Specifies how many threads will publish into a ring buffer
///
/// # Examples
/// ```
/// use batchring::disruptor::ProducerType;
///
/// assert!(ProducerType::Single.is_single());
/// assert!(ProducerType::default().is_multi());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerType {
    /// Exactly one thread claims and publishes
    ///
    /// Backed by [`SingleProducerSequencer`](crate::disruptor::SingleProducerSequencer),
    /// which needs no atomic read-modify-write on the claim path. Publishing
    /// from a second thread is a logic error the sequencer cannot detect.
    Single,

    /// Any number of threads claim and publish concurrently
    ///
    /// Backed by [`MultiProducerSequencer`](crate::disruptor::MultiProducerSequencer).
    /// This is the default since it stays correct whatever the caller does.
    #[default]
    Multi,
}

impl ProducerType {
    /// Returns true for [`ProducerType::Single`]
    pub fn is_single(&self) -> bool {
        matches!(self, ProducerType::Single)
    }

    /// Returns true for [`ProducerType::Multi`]
    pub fn is_multi(&self) -> bool {
        matches!(self, ProducerType::Multi)
    }
}

impl std::fmt::Display for ProducerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProducerType::Single => write!(f, "single"),
            ProducerType::Multi => write!(f, "multi"),
        }
    }
}

impl std::str::FromStr for ProducerType {
    type Err = String;

    /// Parse a producer type, ignoring case
    ///
    /// # Examples
    /// ```
    /// use batchring::disruptor::ProducerType;
    ///
    /// assert_eq!("Single".parse::<ProducerType>().unwrap(), ProducerType::Single);
    /// assert!("many".parse::<ProducerType>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(ProducerType::Single),
            "multi" => Ok(ProducerType::Multi),
            _ => Err(format!(
                "Invalid producer type: '{s}'. Valid values are 'single' or 'multi'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_producer_type_predicates() {
        assert!(ProducerType::Single.is_single());
        assert!(!ProducerType::Single.is_multi());
        assert!(ProducerType::Multi.is_multi());
        assert!(!ProducerType::Multi.is_single());
    }

    #[test]
    fn test_producer_type_default_is_multi() {
        assert_eq!(ProducerType::default(), ProducerType::Multi);
    }

    #[test]
    fn test_producer_type_display_round_trips_through_from_str() {
        for producer_type in [ProducerType::Single, ProducerType::Multi] {
            let text = producer_type.to_string();
            assert_eq!(ProducerType::from_str(&text).unwrap(), producer_type);
        }
    }

    #[test]
    fn test_producer_type_from_str() {
        assert_eq!(ProducerType::from_str("SINGLE").unwrap(), ProducerType::Single);
        assert_eq!(ProducerType::from_str(" multi ").unwrap(), ProducerType::Multi);

        let error = ProducerType::from_str("both").unwrap_err();
        assert!(error.contains("both"));
        assert!(ProducerType::from_str("").is_err());
    }

    #[test]
    fn test_producer_type_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProducerType::Single).unwrap(),
            "\"single\""
        );
        let parsed: ProducerType = serde_json::from_str("\"multi\"").unwrap();
        assert_eq!(parsed, ProducerType::Multi);
        assert!(serde_json::from_str::<ProducerType>("\"Multi\"").is_err());
    }
}
