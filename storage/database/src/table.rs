//! Database table metadata; `trait Table`.

//---------------------------------------------------------------------------------------------------- Import
use crate::{key::Key, storable::Storable};

//---------------------------------------------------------------------------------------------------- Table
/// Compile-time metadata describing one named table.
///
/// Implemented on zero-sized marker structs; the name doubles as the
/// backend's table identifier, so it must be unique within a database.
pub trait Table: 'static {
    /// The table's unique name.
    const NAME: &'static str;

    /// The key type.
    type Key: Key + 'static;

    /// The value type.
    type Value: Storable + 'static;
}
