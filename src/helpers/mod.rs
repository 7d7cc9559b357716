//! Low-level helpers for reading and rewriting workbook packages.

pub(crate) mod xml;
pub(crate) mod zip;
