//! Encoders for the two stdin payload formats pdftk understands.
//!
//! Both encoders are pure: the same entries in the same order always produce
//! byte-identical output. Entries are taken as ordered pairs rather than a
//! hash map so the caller controls record order and the output stays
//! reproducible.

/// FDF header: format version line plus a comment carrying the four
/// high-bit signature bytes consumers use to detect binary content.
const FDF_HEADER: &[u8] = b"%FDF-1.2\n%\xe2\xe3\xcf\xd3\n";
const FDF_OPEN: &[u8] = b"1 0 obj<</FDF<</Fields[\n";
const FDF_CLOSE: &[u8] = b"]>>>>endobj\ntrailer<</Root 1 0 R>>\n%%EOF\n";

/// Encode form fields as an FDF buffer for the `fill_form` operation.
///
/// Keys and values are written as raw 8-bit-clean bytes so non-ASCII text
/// round-trips unmangled.
///
/// Known limitation: the FDF grammar delimits strings with literal
/// parentheses and this encoder does not escape them, matching what pdftk
/// expects from its usual producers. A key or value containing `(` or `)`
/// will corrupt the record.
pub fn encode_form_data<I, K, V>(fields: I) -> Vec<u8>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut buf = Vec::new();
    buf.extend_from_slice(FDF_HEADER);
    buf.extend_from_slice(FDF_OPEN);

    for (key, value) in fields {
        buf.extend_from_slice(b"<</T (");
        buf.extend_from_slice(key.as_ref().as_bytes());
        buf.extend_from_slice(b")/V (");
        buf.extend_from_slice(value.as_ref().as_bytes());
        buf.extend_from_slice(b")>>\n");
    }

    buf.extend_from_slice(FDF_CLOSE);
    buf
}

/// Encode metadata entries as an info-text buffer for the `update_info`
/// operations.
///
/// Each entry becomes an `InfoBegin` / `InfoKey` / `InfoValue` block, every
/// line newline-terminated.
pub fn encode_info_text<I, K, V>(entries: I) -> Vec<u8>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut buf = Vec::new();
    for (key, value) in entries {
        buf.extend_from_slice(b"InfoBegin\n");
        buf.extend_from_slice(b"InfoKey: ");
        buf.extend_from_slice(key.as_ref().as_bytes());
        buf.extend_from_slice(b"\nInfoValue: ");
        buf.extend_from_slice(value.as_ref().as_bytes());
        buf.extend_from_slice(b"\n");
    }
    buf
}
