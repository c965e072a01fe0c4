//! Type-safe identifier wrappers around `u64`.
//!
//! Identifiers are handed out by the component that owns the entity (the
//! spawn controller for actors, the resource loader for instances) from a
//! monotonic counter, so runs are reproducible and ids are traceable in
//! logs. Nothing here generates random tokens.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw counter value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the inner counter value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a pooled actor (enemy) instance.
    ///
    /// Assigned once when the pool factory constructs the instance; the id
    /// survives recycling through the pool.
    ActorId
}

define_id! {
    /// Identifier of a prefab instance created by the resource loader.
    InstanceId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_type_and_value() {
        assert_eq!(ActorId::new(7).to_string(), "ActorId#7");
        assert_eq!(InstanceId::from(3).to_string(), "InstanceId#3");
    }

    #[test]
    fn ids_order_by_counter() {
        assert!(ActorId::new(1) < ActorId::new(2));
        assert_eq!(u64::from(ActorId::new(9)), 9);
    }
}
