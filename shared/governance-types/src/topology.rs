use alloy_primitives::Address;

/// Kinds of controller that can hold administrative authority over the protocol.
///
/// Declaration order is the classification precedence used when an owner address is matched
/// against the known controllers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControllerKind {
    OwnerAdapterV1,
    OwnerAdapterV2,
    DelayedMultiSig,
    GnosisSafe,
    DirectOwner,
}

impl ControllerKind {
    pub const PRECEDENCE: [ControllerKind; 5] = [
        ControllerKind::OwnerAdapterV1,
        ControllerKind::OwnerAdapterV2,
        ControllerKind::DelayedMultiSig,
        ControllerKind::GnosisSafe,
        ControllerKind::DirectOwner,
    ];

    /// Canonical deployment name of the controller contract, if it is a contract at all.
    pub fn deployment_name(self) -> Option<&'static str> {
        match self {
            ControllerKind::OwnerAdapterV1 => Some("DolomiteOwnerV1"),
            ControllerKind::OwnerAdapterV2 => Some("DolomiteOwnerV2"),
            ControllerKind::DelayedMultiSig => Some("DelayedMultiSig"),
            ControllerKind::GnosisSafe => Some("GnosisSafe"),
            ControllerKind::DirectOwner => None,
        }
    }
}

/// The entity currently authorised to call the protocol's owner-only methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OwnershipTopology {
    /// A plain signer owns the protocol; calls are sent as-is.
    DirectOwner(Address),
    /// A time-delayed multisig; calls go through `submitTransaction(to, value, data)`.
    DelayedMultiSig(Address),
    /// First owner-adapter proxy; calls go through `submitTransaction(to, data)`.
    OwnerAdapterV1(Address),
    /// Second owner-adapter proxy; same call shape as V1, distinct deployment.
    OwnerAdapterV2(Address),
    /// A Safe consumes raw calls imported through its signing UI.
    GnosisSafe(Address),
}

impl OwnershipTopology {
    pub fn new(kind: ControllerKind, controller: Address) -> Self {
        match kind {
            ControllerKind::OwnerAdapterV1 => OwnershipTopology::OwnerAdapterV1(controller),
            ControllerKind::OwnerAdapterV2 => OwnershipTopology::OwnerAdapterV2(controller),
            ControllerKind::DelayedMultiSig => OwnershipTopology::DelayedMultiSig(controller),
            ControllerKind::GnosisSafe => OwnershipTopology::GnosisSafe(controller),
            ControllerKind::DirectOwner => OwnershipTopology::DirectOwner(controller),
        }
    }

    /// Address returned by the protocol's `owner()`.
    pub fn controller(&self) -> Address {
        match *self {
            OwnershipTopology::DirectOwner(a)
            | OwnershipTopology::DelayedMultiSig(a)
            | OwnershipTopology::OwnerAdapterV1(a)
            | OwnershipTopology::OwnerAdapterV2(a)
            | OwnershipTopology::GnosisSafe(a) => a,
        }
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            OwnershipTopology::DirectOwner(_) => ControllerKind::DirectOwner,
            OwnershipTopology::DelayedMultiSig(_) => ControllerKind::DelayedMultiSig,
            OwnershipTopology::OwnerAdapterV1(_) => ControllerKind::OwnerAdapterV1,
            OwnershipTopology::OwnerAdapterV2(_) => ControllerKind::OwnerAdapterV2,
            OwnershipTopology::GnosisSafe(_) => ControllerKind::GnosisSafe,
        }
    }

    /// Whether transactions are wrapped into an on-chain submission call.
    pub fn wraps_calls(&self) -> bool {
        matches!(
            self,
            OwnershipTopology::DelayedMultiSig(_)
                | OwnershipTopology::OwnerAdapterV1(_)
                | OwnershipTopology::OwnerAdapterV2(_)
        )
    }
}

impl core::fmt::Display for OwnershipTopology {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?} @ {}", self.kind(), self.controller())
    }
}
