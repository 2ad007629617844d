//! Record declarations.
//!
//! A record is the shape of the data a cursor owns: a list of fields, each
//! with a declared type, a default value and an access scope. Most records
//! are written with the [`record!`](crate::record) macro, which implements
//! [`Record`] for a marker type.

use super::access::Access;
use serde::Serialize;
use serde_json::Value;

/// Declaration of one record field.
///
/// A declaration is only usable once it has both a default and an access
/// scope; building a [`DataStore`](super::DataStore) from an incomplete one
/// is a configuration error.
#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub(crate) name: &'static str,
    pub(crate) type_name: &'static str,
    pub(crate) default: Option<Result<Value, String>>,
    pub(crate) access: Option<Access>,
}

impl FieldDecl {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            type_name: "any",
            default: None,
            access: None,
        }
    }

    /// Set the default, recording `T` as the declared type. A default that
    /// does not serialize is reported as `InvalidDefault` when the store is
    /// built.
    pub fn default_value<T: Serialize>(mut self, default: T) -> Self {
        self.type_name = std::any::type_name::<T>();
        self.default = Some(serde_json::to_value(default).map_err(|err| err.to_string()));
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A type describing the fields of a data store.
pub trait Record {
    fn fields() -> Vec<FieldDecl>;
}
