use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Training class of an uploaded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleClass {
    Ham,
    Spam,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown class: {0}")]
pub struct UnknownClass(pub String);

impl SampleClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SampleClass::Ham => "ham",
            SampleClass::Spam => "spam",
        }
    }

    /// Trainer sub-command for this class (`learn_ham` / `learn_spam`).
    pub fn learn_command(self) -> &'static str {
        match self {
            SampleClass::Ham => "learn_ham",
            SampleClass::Spam => "learn_spam",
        }
    }
}

impl FromStr for SampleClass {
    type Err = UnknownClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ham" => Ok(SampleClass::Ham),
            "spam" => Ok(SampleClass::Spam),
            other => Err(UnknownClass(other.to_string())),
        }
    }
}

impl fmt::Display for SampleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted upload awaiting dispatch to the trainer.
///
/// Fields are private: a `Job` is only built by the ingestion endpoint once the
/// upload has been read completely, and nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Job {
    class: SampleClass,
    identity: String,
    payload: Bytes,
}

impl Job {
    pub fn new(class: SampleClass, identity: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            class,
            identity: identity.into(),
            payload: payload.into(),
        }
    }

    pub fn class(&self) -> SampleClass {
        self.class
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the job, handing its parts to the dispatch step.
    pub fn into_parts(self) -> (SampleClass, String, Bytes) {
        (self.class, self.identity, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_classes() {
        assert_eq!("ham".parse::<SampleClass>(), Ok(SampleClass::Ham));
        assert_eq!("spam".parse::<SampleClass>(), Ok(SampleClass::Spam));
    }

    #[test]
    fn rejects_unknown_class() {
        let err = "Spam".parse::<SampleClass>().unwrap_err();
        assert_eq!(err, UnknownClass("Spam".to_string()));
        assert!("".parse::<SampleClass>().is_err());
        assert!("virus".parse::<SampleClass>().is_err());
    }

    #[test]
    fn learn_command_matches_class() {
        assert_eq!(SampleClass::Ham.learn_command(), "learn_ham");
        assert_eq!(SampleClass::Spam.learn_command(), "learn_spam");
        assert_eq!(SampleClass::Spam.to_string(), "spam");
    }

    #[test]
    fn job_exposes_its_parts() {
        let job = Job::new(SampleClass::Spam, "alice", b"Subject: hi\r\n\r\nbody".to_vec());
        assert_eq!(job.class(), SampleClass::Spam);
        assert_eq!(job.identity(), "alice");
        assert_eq!(job.payload().len(), 19);

        let (class, identity, payload) = job.into_parts();
        assert_eq!(class, SampleClass::Spam);
        assert_eq!(identity, "alice");
        assert!(payload.starts_with(b"Subject"));
    }
}
