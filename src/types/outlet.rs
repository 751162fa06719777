// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outlet addressing.
//!
//! An SP8H installation is up to four chained machines with eight outlets
//! each; an AW2401 has four ports. Every id is range-checked when it is
//! built, so the session layer never sees an out-of-range value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MisuseError;
use crate::types::DeviceFamily;

macro_rules! bounded_id {
    ($(#[$meta:meta])* $name:ident, $what:literal, $max:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub struct $name(u8);

        impl $name {
            /// Smallest valid id.
            pub const MIN: u8 = 1;
            /// Largest valid id.
            pub const MAX: u8 = $max;

            /// Creates a validated id.
            ///
            /// # Errors
            ///
            /// Returns `MisuseError::OutOfRange` if `id` is outside
            /// `MIN..=MAX`.
            pub fn new(id: u8) -> Result<Self, MisuseError> {
                if !(Self::MIN..=Self::MAX).contains(&id) {
                    return Err(MisuseError::OutOfRange {
                        what: $what,
                        min: Self::MIN,
                        max: Self::MAX,
                        actual: id,
                    });
                }
                Ok(Self(id))
            }

            /// Returns the one-based id.
            #[must_use]
            pub const fn value(&self) -> u8 {
                self.0
            }

            /// Zero-based position in the device's status list.
            #[must_use]
            pub const fn slot(&self) -> usize {
                (self.0 - 1) as usize
            }
        }

        impl TryFrom<u8> for $name {
            type Error = MisuseError;

            fn try_from(id: u8) -> Result<Self, Self::Error> {
                Self::new(id)
            }
        }

        impl From<$name> for u8 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

bounded_id!(
    /// SP8H machine id in a chain (1-4), sent as `srm_no`.
    MachineId,
    "machine id",
    4
);

bounded_id!(
    /// SP8H outlet id on one machine (1-8), sent as `power_id`.
    OutletId,
    "outlet id",
    8
);

bounded_id!(
    /// AW2401 port id (1-4).
    PortId,
    "port id",
    4
);

/// Address of one switchable outlet.
///
/// # Examples
///
/// ```
/// use powerstrip_lib::types::OutletAddress;
///
/// let addr = OutletAddress::sp8h(2, 7).unwrap();
/// assert_eq!(addr.to_string(), "machine 2 outlet 7");
///
/// assert!(OutletAddress::sp8h(5, 1).is_err());
/// assert!(OutletAddress::aw2401(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum OutletAddress {
    /// An outlet on one machine of an SP8H chain.
    Sp8h {
        /// Machine in the chain.
        machine: MachineId,
        /// Outlet on that machine.
        outlet: OutletId,
    },
    /// A port on an AW2401.
    Aw2401 {
        /// Port number.
        port: PortId,
    },
}

impl OutletAddress {
    /// Creates a validated SP8H address.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::OutOfRange` if either id is out of range.
    pub fn sp8h(machine: u8, outlet: u8) -> Result<Self, MisuseError> {
        Ok(Self::Sp8h {
            machine: MachineId::new(machine)?,
            outlet: OutletId::new(outlet)?,
        })
    }

    /// Creates a validated AW2401 address.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::OutOfRange` if `port` is out of range.
    pub fn aw2401(port: u8) -> Result<Self, MisuseError> {
        Ok(Self::Aw2401 {
            port: PortId::new(port)?,
        })
    }

    /// Device family this address belongs to.
    #[must_use]
    pub const fn family(&self) -> DeviceFamily {
        match self {
            Self::Sp8h { .. } => DeviceFamily::Sp8h,
            Self::Aw2401 { .. } => DeviceFamily::Aw2401,
        }
    }

    /// Machine that answers status queries for this outlet.
    ///
    /// AW2401 devices have a single status page, so they have no machine.
    #[must_use]
    pub const fn machine(&self) -> Option<MachineId> {
        match self {
            Self::Sp8h { machine, .. } => Some(*machine),
            Self::Aw2401 { .. } => None,
        }
    }

    /// Zero-based position of this outlet in its status list.
    #[must_use]
    pub const fn slot(&self) -> usize {
        match self {
            Self::Sp8h { outlet, .. } => outlet.slot(),
            Self::Aw2401 { port } => port.slot(),
        }
    }
}

impl fmt::Display for OutletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sp8h { machine, outlet } => write!(f, "machine {machine} outlet {outlet}"),
            Self::Aw2401 { port } => write!(f, "port {port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sp8h_addresses_inside_bounds() {
        for machine in 1..=4 {
            for outlet in 1..=8 {
                let addr = OutletAddress::sp8h(machine, outlet).unwrap();
                assert_eq!(addr.machine().map(|m| m.value()), Some(machine));
                assert_eq!(addr.slot(), usize::from(outlet - 1));
            }
        }
    }

    #[test]
    fn sp8h_addresses_outside_bounds() {
        for (machine, outlet) in [(0, 1), (5, 1), (1, 0), (1, 9), (0, 0), (255, 255)] {
            let err = OutletAddress::sp8h(machine, outlet).unwrap_err();
            assert!(matches!(err, MisuseError::OutOfRange { .. }));
        }
    }

    #[test]
    fn out_of_range_names_the_field() {
        let err = OutletAddress::sp8h(1, 9).unwrap_err();
        assert_eq!(
            err,
            MisuseError::OutOfRange {
                what: "outlet id",
                min: 1,
                max: 8,
                actual: 9,
            }
        );
    }

    #[test]
    fn aw2401_port_bounds() {
        assert!(OutletAddress::aw2401(1).is_ok());
        assert!(OutletAddress::aw2401(4).is_ok());
        assert!(OutletAddress::aw2401(5).is_err());
        assert_eq!(OutletAddress::aw2401(3).unwrap().machine(), None);
    }

    #[test]
    fn address_display() {
        assert_eq!(OutletAddress::aw2401(3).unwrap().to_string(), "port 3");
    }

    #[test]
    fn id_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<MachineId>("3").is_ok());
        assert!(serde_json::from_str::<MachineId>("9").is_err());
    }
}
