//! String decryption for files protected by the standard security handler.
//!
//! `lopdf::Document::decrypt` only rewrites top-level strings and streams,
//! while destination names, URIs and outline titles sit inside dictionaries
//! and arrays. Each nested string is decrypted with the key of the indirect
//! object that holds it. Stream contents are left alone: text comes from
//! MuPDF, which decrypts on its own.

use lopdf::encryption::{self, DecryptionError};
use lopdf::{Document, Object, ObjectId};

/// Decrypt every string in `doc` with the empty user password, then drop
/// `/Encrypt` from the trailer. Unencrypted documents are left untouched.
pub(crate) fn decrypt_strings(doc: &mut Document) -> Result<(), DecryptionError> {
    let Ok(encrypt_id) = doc.trailer.get(b"Encrypt").and_then(Object::as_reference) else {
        return Ok(());
    };
    let key = encryption::get_encryption_key(doc, "", true)?;
    for (&id, obj) in doc.objects.iter_mut() {
        if id != encrypt_id {
            decrypt_in_place(&key, id, obj);
        }
    }
    doc.trailer.remove(b"Encrypt");
    Ok(())
}

fn decrypt_in_place(key: &[u8], id: ObjectId, obj: &mut Object) {
    match obj {
        Object::String(..) => {
            if let Ok(plain) = encryption::decrypt_object(key, id, obj)
                && let Object::String(bytes, _) = obj
            {
                *bytes = plain;
            }
        }
        Object::Array(items) => {
            for item in items {
                decrypt_in_place(key, id, item);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                decrypt_in_place(key, id, value);
            }
        }
        // Cross-reference stream dictionaries are never encrypted
        Object::Stream(stream) if stream.dict.type_is(b"XRef") => {}
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                decrypt_in_place(key, id, value);
            }
        }
        _ => {}
    }
}
