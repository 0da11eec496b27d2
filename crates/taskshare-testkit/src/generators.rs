//! Proptest generators for property-based testing.

use proptest::prelude::*;

use taskshare_core::{PermissionTier, ShareToken, Timestamp, TOKEN_BYTES};
use taskshare_perms::{TaskField, TaskStatus};

/// Generate a permission tier.
pub fn tier() -> impl Strategy<Value = PermissionTier> {
    prop_oneof![
        Just(PermissionTier::View),
        Just(PermissionTier::Edit),
        Just(PermissionTier::Admin),
    ]
}

/// Generate an editable task field.
pub fn task_field() -> impl Strategy<Value = TaskField> {
    proptest::sample::select(TaskField::ALL.to_vec())
}

/// Generate a field name: usually a real one, sometimes anything.
pub fn field_name() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => task_field().prop_map(|f| f.name().to_string()),
        1 => Just("owner_id".to_string()),
        1 => Just("permission".to_string()),
        1 => "[a-z_]{1,16}",
    ]
}

/// Generate a non-empty list of requested field names.
pub fn field_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(field_name(), 1..6)
}

/// Generate a task status.
pub fn task_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

/// Generate a share token from random bytes.
pub fn share_token() -> impl Strategy<Value = ShareToken> {
    any::<[u8; TOKEN_BYTES]>().prop_map(|bytes| ShareToken::from_random_bytes(&bytes))
}

/// Generate a link lifetime in days, or `None` for no expiry.
pub fn ttl_days() -> impl Strategy<Value = Option<u32>> {
    prop::option::of(1u32..=365)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = Timestamp> {
    0i64..=4_102_444_800_000
}

/// Generate a recipient address.
pub fn address() -> impl Strategy<Value = String> {
    ("[a-z]{1,8}", "[a-z]{1,8}").prop_map(|(local, domain)| format!("{local}@{domain}.com"))
}

/// Generate a recipient list with case-variant duplicates mixed in.
pub fn recipients_with_duplicates() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec((address(), any::<bool>()), 0..12).prop_map(|pairs| {
        let mut out = Vec::new();
        for (address, duplicate) in pairs {
            if duplicate {
                out.push(address.to_uppercase());
            }
            out.push(address);
        }
        out
    })
}
