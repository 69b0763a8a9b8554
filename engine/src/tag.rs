/// Packed per-body metadata stored in a rapier body's `user_data`.
///
/// # Why this exists
/// Every body carries an explicit [`BodyKind`] and [`CollisionGroup`] tag, plus the id of the
/// level element it was built from. Rapier only offers one `u128` of user data per body, so the
/// three are packed together. Matching on the unpacked tag (instead of asking rapier for its
/// body type) keeps gameplay dispatch independent of the physics library's own types.
///
/// # Bit layout
/// Least-significant bit = bit 0:
///
/// - bits 0..=31   : element id (`u32`, level block/pickup id, or 0 for the player)
/// - bits 32..=39  : [`BodyKind`] tag (`u8`)
/// - bits 40..=47  : [`CollisionGroup`] tag (`u8`)
/// - bits 48..=127 : reserved (must be zero)
pub type BodyTag = u128;

/// Id of the level element a body was built from.
pub type ElementId = u32;

const KIND_SHIFT: u32 = ElementId::BITS;
const GROUP_SHIFT: u32 = ElementId::BITS + u8::BITS;
const RESERVED_SHIFT: u32 = ElementId::BITS + 2 * u8::BITS;

/// How the simulation moves a body.
///
/// The numeric values are part of the packed tag. Do not reorder or reuse values.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// Never moves (level blocks).
    Static = 1,
    /// Moved by writing target positions (moving platforms, behavior-driven blocks).
    Kinematic = 2,
    /// Integrated by the solver (the player ball).
    Dynamic = 3,
}

/// Which collision layer a body's collider belongs to.
///
/// The numeric values are part of the packed tag. Do not reorder or reuse values.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollisionGroup {
    Player = 1,
    /// Solid level geometry: blocks and moving platforms.
    Level = 2,
    /// Sensors: pickups and the goal. Never produce contacts.
    Trigger = 3,
}

/// Packs an element id, kind and group into a [`BodyTag`].
pub fn pack_tag(id: ElementId, kind: BodyKind, group: CollisionGroup) -> BodyTag {
    (id as u128) | ((kind as u128) << KIND_SHIFT) | ((group as u128) << GROUP_SHIFT)
}

/// Extracts the element id. Does not validate the other fields.
pub fn unpack_element_id(tag: BodyTag) -> ElementId {
    (tag & ElementId::MAX as u128) as ElementId
}

/// Extracts the [`BodyKind`], or `None` if the tag byte is unknown.
pub fn try_unpack_kind(tag: BodyTag) -> Option<BodyKind> {
    match ((tag >> KIND_SHIFT) & u8::MAX as u128) as u8 {
        1 => Some(BodyKind::Static),
        2 => Some(BodyKind::Kinematic),
        3 => Some(BodyKind::Dynamic),
        _ => None,
    }
}

/// Extracts the [`CollisionGroup`], or `None` if the tag byte is unknown.
pub fn try_unpack_group(tag: BodyTag) -> Option<CollisionGroup> {
    match ((tag >> GROUP_SHIFT) & u8::MAX as u128) as u8 {
        1 => Some(CollisionGroup::Player),
        2 => Some(CollisionGroup::Level),
        3 => Some(CollisionGroup::Trigger),
        _ => None,
    }
}

/// Checks that a tag conforms to the current packing contract.
pub fn validate_tag(tag: BodyTag) -> Result<(), &'static str> {
    if tag >> RESERVED_SHIFT != 0 {
        return Err("body tag reserved bits are non-zero");
    }
    if try_unpack_kind(tag).is_none() {
        return Err("body tag has unknown kind");
    }
    if try_unpack_group(tag).is_none() {
        return Err("body tag has unknown group");
    }
    Ok(())
}
