// src/checks/process.rs
use super::numeric::max_value_result;
use crate::health::{FnCheck, HealthCheckBuilder, HealthCheckError};
use std::io;
use std::num::ParseIntError;

const STATUS_PATH: &str = "/proc/self/status";

/// Memory figures of the current process, read from `/proc/self/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    /// Anonymous resident memory (`RssAnon`).
    Private,
    /// Virtual address space size (`VmSize`).
    Virtual,
    /// Resident set size (`VmRSS`).
    WorkingSet,
}

impl MemoryKind {
    fn field(self) -> &'static str {
        match self {
            MemoryKind::Private => "RssAnon",
            MemoryKind::Virtual => "VmSize",
            MemoryKind::WorkingSet => "VmRSS",
        }
    }

    fn check_name(self) -> &'static str {
        match self {
            MemoryKind::Private => "PrivateMemorySize",
            MemoryKind::Virtual => "VirtualMemorySize",
            MemoryKind::WorkingSet => "WorkingSet",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryReadError {
    #[error("failed to read /proc/self/status: {0}")]
    Io(#[from] io::Error),

    #[error("field '{0}' not found in /proc/self/status")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {source}")]
    Parse {
        field: &'static str,
        source: ParseIntError,
    },
}

/// Current size in bytes of the given memory figure.
pub fn read_memory(kind: MemoryKind) -> Result<u64, MemoryReadError> {
    let status = std::fs::read_to_string(STATUS_PATH)?;
    parse_status(&status, kind)
}

fn parse_status(status: &str, kind: MemoryKind) -> Result<u64, MemoryReadError> {
    let field = kind.field();
    let value = status
        .lines()
        .find_map(|line| line.strip_prefix(field)?.strip_prefix(':'))
        .ok_or(MemoryReadError::MissingField(field))?;

    // values are reported as "<n> kB"
    let kb = value
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse::<u64>()
        .map_err(|source| MemoryReadError::Parse { field, source })?;
    Ok(kb * 1024)
}

impl HealthCheckBuilder {
    /// Registers `{Kind}({max_bytes})`, healthy while the figure stays at or
    /// below `max_bytes`.
    pub fn add_memory_check(
        &mut self,
        kind: MemoryKind,
        max_bytes: u64,
    ) -> Result<&mut Self, HealthCheckError> {
        let name = format!("{}({})", kind.check_name(), max_bytes);
        self.add_check(
            &name,
            FnCheck::from_result_fn(move || {
                let current = read_memory(kind)?;
                Ok(max_value_result(max_bytes, current).into())
            }),
        )
    }

    pub fn add_private_memory_size_check(
        &mut self,
        max_bytes: u64,
    ) -> Result<&mut Self, HealthCheckError> {
        self.add_memory_check(MemoryKind::Private, max_bytes)
    }

    pub fn add_virtual_memory_size_check(
        &mut self,
        max_bytes: u64,
    ) -> Result<&mut Self, HealthCheckError> {
        self.add_memory_check(MemoryKind::Virtual, max_bytes)
    }

    pub fn add_working_set_check(&mut self, max_bytes: u64) -> Result<&mut Self, HealthCheckError> {
        self.add_memory_check(MemoryKind::WorkingSet, max_bytes)
    }
}
