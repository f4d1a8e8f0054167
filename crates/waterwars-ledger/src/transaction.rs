//! Transaction builder and validation for the water ledger.
//!
//! [`TransactionBuilder`] enforces that every entry names both sides of the
//! movement with the entity types its [`LedgerEntryType`] requires. The
//! world and the void have no identity, so they are set with
//! [`TransactionBuilder::from_world`] and [`TransactionBuilder::to_void`].

use chrono::Utc;
use uuid::Uuid;

use waterwars_types::{
    AssetId, EntityType, LedgerEntry, LedgerEntryId, LedgerEntryType, ParcelId, PlayerId,
};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Transaction builder
// ---------------------------------------------------------------------------

/// Builder for constructing validated [`LedgerEntry`] values.
///
/// # Examples
///
/// ```
/// use waterwars_ledger::TransactionBuilder;
/// use waterwars_types::{EntityType, LedgerEntryType};
/// use uuid::Uuid;
///
/// let entry = TransactionBuilder::new(1, LedgerEntryType::Allocate)
///     .from(Uuid::now_v7(), EntityType::Parcel)
///     .to(Uuid::now_v7(), EntityType::Asset)
///     .quantity(25)
///     .reason("ALLOCATE".to_owned())
///     .build();
///
/// assert!(entry.is_ok());
/// ```
#[derive(Debug)]
pub struct TransactionBuilder {
    round: u64,
    entry_type: LedgerEntryType,
    from_entity: Option<Uuid>,
    from_entity_type: Option<EntityType>,
    to_entity: Option<Uuid>,
    to_entity_type: Option<EntityType>,
    quantity: Option<u64>,
    reason: Option<String>,
    reference_id: Option<Uuid>,
}

impl TransactionBuilder {
    /// Start building a ledger entry for the given round and entry type.
    pub const fn new(round: u64, entry_type: LedgerEntryType) -> Self {
        Self {
            round,
            entry_type,
            from_entity: None,
            from_entity_type: None,
            to_entity: None,
            to_entity_type: None,
            quantity: None,
            reason: None,
            reference_id: None,
        }
    }

    /// Rainfall landing on `parcel`.
    pub fn rainfall(round: u64, quantity: u64, parcel: ParcelId) -> Self {
        Self::new(round, LedgerEntryType::Rainfall)
            .from_world()
            .to(parcel.into_inner(), EntityType::Parcel)
            .quantity(quantity)
            .reason("RAINFALL".to_owned())
    }

    /// Parcel water committed to `asset` on behalf of `player`.
    pub fn allocation(
        round: u64,
        quantity: u64,
        parcel: ParcelId,
        asset: AssetId,
        player: PlayerId,
    ) -> Self {
        Self::new(round, LedgerEntryType::Allocate)
            .from(parcel.into_inner(), EntityType::Parcel)
            .to(asset.into_inner(), EntityType::Asset)
            .quantity(quantity)
            .reason("ALLOCATE".to_owned())
            .reference_id(player.into_inner())
    }

    /// Asset water returned to `parcel` on behalf of `player`.
    pub fn give_back(
        round: u64,
        quantity: u64,
        asset: AssetId,
        parcel: ParcelId,
        player: PlayerId,
    ) -> Self {
        Self::new(round, LedgerEntryType::GiveBack)
            .from(asset.into_inner(), EntityType::Asset)
            .to(parcel.into_inner(), EntityType::Parcel)
            .quantity(quantity)
            .reason("GIVE_BACK".to_owned())
            .reference_id(player.into_inner())
    }

    /// Returned asset water with no parcel to go back to.
    pub fn forfeit(round: u64, quantity: u64, asset: AssetId, player: PlayerId) -> Self {
        Self::new(round, LedgerEntryType::Forfeit)
            .from(asset.into_inner(), EntityType::Asset)
            .to_void()
            .quantity(quantity)
            .reason("FORFEIT".to_owned())
            .reference_id(player.into_inner())
    }

    /// Unused parcel water lost at the end of a round.
    pub fn evaporation(round: u64, quantity: u64, parcel: ParcelId) -> Self {
        Self::new(round, LedgerEntryType::Evaporate)
            .from(parcel.into_inner(), EntityType::Parcel)
            .to_void()
            .quantity(quantity)
            .reason("EVAPORATE".to_owned())
    }

    /// Water used up by an asset at the end of a round.
    pub fn consumption(round: u64, quantity: u64, asset: AssetId) -> Self {
        Self::new(round, LedgerEntryType::Consume)
            .from(asset.into_inner(), EntityType::Asset)
            .to_void()
            .quantity(quantity)
            .reason("CONSUME".to_owned())
    }

    /// Set the source entity.
    #[must_use]
    pub const fn from(mut self, entity: Uuid, entity_type: EntityType) -> Self {
        self.from_entity = Some(entity);
        self.from_entity_type = Some(entity_type);
        self
    }

    /// Mark the world as the source.
    #[must_use]
    pub const fn from_world(mut self) -> Self {
        self.from_entity = None;
        self.from_entity_type = Some(EntityType::World);
        self
    }

    /// Set the destination entity.
    #[must_use]
    pub const fn to(mut self, entity: Uuid, entity_type: EntityType) -> Self {
        self.to_entity = Some(entity);
        self.to_entity_type = Some(entity_type);
        self
    }

    /// Mark the void as the destination.
    #[must_use]
    pub const fn to_void(mut self) -> Self {
        self.to_entity = None;
        self.to_entity_type = Some(EntityType::Void);
        self
    }

    /// Set the number of water units moved.
    #[must_use]
    pub const fn quantity(mut self, qty: u64) -> Self {
        self.quantity = Some(qty);
        self
    }

    /// Set the short reason code.
    #[must_use]
    pub fn reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Link the entry to a related entity, usually the acting player.
    #[must_use]
    pub const fn reference_id(mut self, id: Uuid) -> Self {
        self.reference_id = Some(id);
        self
    }

    /// Validate inputs and produce a [`LedgerEntry`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroQuantity`] if the quantity is zero,
    /// [`LedgerError::MissingField`] if a required field is not set, and
    /// [`LedgerError::InvalidEntityType`] if either side does not match the
    /// entry type.
    pub fn build(self) -> Result<LedgerEntry, LedgerError> {
        let quantity = self.quantity.ok_or(LedgerError::MissingField("quantity"))?;
        let reason = self.reason.ok_or(LedgerError::MissingField("reason"))?;

        if quantity == 0 {
            return Err(LedgerError::ZeroQuantity);
        }

        validate_side(self.entry_type, "from", self.from_entity, self.from_entity_type)?;
        validate_side(self.entry_type, "to", self.to_entity, self.to_entity_type)?;

        Ok(LedgerEntry {
            id: LedgerEntryId::new(),
            round: self.round,
            entry_type: self.entry_type,
            from_entity: self.from_entity,
            from_entity_type: self.from_entity_type,
            to_entity: self.to_entity,
            to_entity_type: self.to_entity_type,
            quantity,
            reason,
            reference_id: self.reference_id,
            created_at: Utc::now(),
        })
    }
}

/// Validate one side of an entry against the contract for `entry_type`.
///
/// World and void sides carry no entity ID; every other side must.
fn validate_side(
    entry_type: LedgerEntryType,
    side: &'static str,
    entity: Option<Uuid>,
    entity_type: Option<EntityType>,
) -> Result<(), LedgerError> {
    let (expected_from, expected_to) = expected_entity_types(entry_type);
    let expected = if side == "from" { expected_from } else { expected_to };

    if entity_type != Some(expected) {
        return Err(LedgerError::InvalidEntityType {
            entry_type,
            side,
            expected: format!("{expected:?}"),
            actual: format!("{entity_type:?}"),
        });
    }

    let anonymous = matches!(expected, EntityType::World | EntityType::Void);
    if anonymous == entity.is_some() {
        return Err(LedgerError::MissingField(if anonymous {
            "anonymous side must not carry an entity id"
        } else {
            "entity id"
        }));
    }

    Ok(())
}

/// Return the expected (from, to) entity types for each [`LedgerEntryType`].
pub const fn expected_entity_types(entry_type: LedgerEntryType) -> (EntityType, EntityType) {
    match entry_type {
        LedgerEntryType::Rainfall => (EntityType::World, EntityType::Parcel),
        LedgerEntryType::Allocate => (EntityType::Parcel, EntityType::Asset),
        LedgerEntryType::GiveBack => (EntityType::Asset, EntityType::Parcel),
        LedgerEntryType::Forfeit | LedgerEntryType::Consume => {
            (EntityType::Asset, EntityType::Void)
        }
        LedgerEntryType::Evaporate => (EntityType::Parcel, EntityType::Void),
    }
}
