//! Metadata catalog lookups.
//!
//! The scanner only needs to know whether a session name is recorded in the
//! catalog. [`DocDbCatalog`] asks the remote document database over HTTP;
//! [`InMemoryCatalog`] answers from a fixed set of names.

pub mod docdb;

use crate::error::Error;
use std::collections::HashSet;

pub use docdb::DocDbCatalog;

pub trait Catalog {
    /// True when exactly one record named `name` exists.
    fn exists(&self, name: &str) -> Result<bool, Error>;
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn exists(&self, name: &str) -> Result<bool, Error> {
        (**self).exists(name)
    }
}

impl<C: Catalog + ?Sized> Catalog for Box<C> {
    fn exists(&self, name: &str) -> Result<bool, Error> {
        (**self).exists(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    names: HashSet<String>,
}

impl InMemoryCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Catalog for InMemoryCatalog {
    fn exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.names.contains(name))
    }
}
