//! Schema-default filling for decrypted credential data.

use flowkit_schema::CredentialTypeSchema;
use flowkit_vault::DecryptedData;

/// Fill schema-declared defaults into `decrypted`.
///
/// Every field of the merged schema appears in the output, in schema order:
/// the stored value when present, the schema's `default_value` otherwise.
/// A present value is never replaced — `false`, `0`, and `""` are
/// intentional values, not gaps. Fields present in `decrypted` but not
/// declared in the schema are carried over unchanged after the schema
/// fields, in their stored order (this is how `oauthTokenData` and other
/// undeclared entries survive).
pub fn apply_defaults(decrypted: &DecryptedData, schema: &CredentialTypeSchema) -> DecryptedData {
    let mut out = DecryptedData::with_capacity(schema.properties.len());

    for field in &schema.properties {
        let value = decrypted
            .get(&field.key)
            .cloned()
            .unwrap_or_else(|| field.default_value.clone());
        out.insert(field.key.clone(), value);
    }

    for (key, value) in decrypted {
        if !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
