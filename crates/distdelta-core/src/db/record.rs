// crates/distdelta-core/src/db/record.rs

use std::fmt;

use crate::identity::FileIdentity;

/// "`destination` can be rebuilt from `source` by applying `delta`."
///
/// Records are immutable; the database keys them by the delta's basename.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeltaRecord {
    source: FileIdentity,
    destination: FileIdentity,
    delta: FileIdentity,
}

impl DeltaRecord {
    pub fn new(source: FileIdentity, destination: FileIdentity, delta: FileIdentity) -> Self {
        Self {
            source,
            destination,
            delta,
        }
    }

    pub fn source(&self) -> &FileIdentity {
        &self.source
    }

    pub fn destination(&self) -> &FileIdentity {
        &self.destination
    }

    pub fn delta(&self) -> &FileIdentity {
        &self.delta
    }

    /// Storage key.
    pub fn delta_name(&self) -> &str {
        self.delta.name()
    }
}

/// The five-line block written to the database file.
impl fmt::Display for DeltaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.delta.name())?;
        writeln!(f, "{}\t{}", self.source.name(), self.destination.name())?;
        writeln!(f, "{}", self.source.checksum_line())?;
        writeln!(f, "{}", self.destination.checksum_line())?;
        write!(f, "{}", self.delta.checksum_line())
    }
}
